use crate::utils::error::{Result, SimError};
use std::collections::HashSet;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SimError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Checks an optional input file: path is well formed and has an allowed extension.
pub fn validate_input_file(
    field_name: &str,
    path: Option<&str>,
    allowed_extensions: &[&str],
) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    validate_path(field_name, path)?;

    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();
    match std::path::Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(extension) if allowed_set.contains(extension.to_ascii_lowercase().as_str()) => Ok(()),
        Some(extension) => Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_output_formats(field_name: &str, formats: &[String]) -> Result<()> {
    let valid_formats = ["csv", "json"];
    if formats.is_empty() {
        return Err(SimError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: String::new(),
            reason: "At least one output format is required".to_string(),
        });
    }
    for format in formats {
        if !valid_formats.contains(&format.as_str()) {
            return Err(SimError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!(
                    "Unsupported format. Valid formats: {}",
                    valid_formats.join(", ")
                ),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("provider.base_url", "https://api.openai.com/v1").is_ok());
        assert!(validate_url("provider.base_url", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("provider.base_url", "").is_err());
        assert!(validate_url("provider.base_url", "invalid-url").is_err());
        assert!(validate_url("provider.base_url", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_number() {
        assert!(validate_positive_number("concurrency", 5, 1).is_ok());
        assert!(validate_positive_number("concurrency", 0, 1).is_err());
    }

    #[test]
    fn test_validate_input_file() {
        assert!(validate_input_file("input", None, &["csv"]).is_ok());
        assert!(validate_input_file("input", Some("voters.csv"), &["csv"]).is_ok());
        assert!(validate_input_file("input", Some("voters.CSV"), &["csv"]).is_ok());
        assert!(validate_input_file("input", Some("voters.xlsx"), &["csv"]).is_err());
        assert!(validate_input_file("input", Some("voters"), &["csv"]).is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("coverage_threshold", 0.2, 0.0, 1.0).is_ok());
        assert!(validate_range("coverage_threshold", 1.5, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_validate_output_formats() {
        assert!(validate_output_formats("formats", &["csv".to_string()]).is_ok());
        assert!(validate_output_formats("formats", &["tsv".to_string()]).is_err());
        assert!(validate_output_formats("formats", &[]).is_err());
    }
}
