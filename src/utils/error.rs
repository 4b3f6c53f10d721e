use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Malformed input: {message}")]
    MalformedInput { message: String },

    #[error("Prediction provider unavailable after {attempted} profile(s): {reason}")]
    ProviderUnavailable { attempted: usize, reason: String },

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Provider,
    Configuration,
    Storage,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl SimError {
    pub fn malformed_input(message: impl Into<String>) -> Self {
        Self::MalformedInput {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            SimError::MalformedInput { .. } | SimError::CsvError(_) => ErrorCategory::Input,
            SimError::ProviderUnavailable { .. } | SimError::HttpError(_) => {
                ErrorCategory::Provider
            }
            SimError::ConfigValidationError { .. }
            | SimError::InvalidConfigValueError { .. }
            | SimError::MissingConfigError { .. } => ErrorCategory::Configuration,
            SimError::ZipError(_) | SimError::IoError(_) => ErrorCategory::Storage,
            SimError::SerializationError(_) | SimError::ProcessingError { .. } => {
                ErrorCategory::Processing
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Processing => ErrorSeverity::Medium,
            ErrorCategory::Provider | ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    /// Process exit code the binaries use for this error: 1 for input and
    /// configuration, 3 for provider, storage and processing failures. Exit 2
    /// is reserved for a finished run with no resolved predictions.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::High => 1,
            ErrorSeverity::Medium | ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            SimError::MalformedInput { .. } => {
                "Check that the CSV has a header row with AGE, GENDER, STATE, EDUCATION_LEVEL, MARITAL_STATUS, OCCUPATION and INCOME_LEVEL, and at least one valid row"
            }
            SimError::ProviderUnavailable { .. } => {
                "Check network connectivity, the provider base URL and that the API key environment variable holds a valid key"
            }
            SimError::HttpError(_) => "Retry later or lower --concurrency",
            SimError::CsvError(_) => "Make sure the file is valid comma-separated text",
            SimError::IoError(_) | SimError::ZipError(_) => {
                "Check that the paths exist and the output directory is writable"
            }
            SimError::SerializationError(_) | SimError::ProcessingError { .. } => {
                "Re-run with --verbose and inspect the logs"
            }
            SimError::ConfigValidationError { .. }
            | SimError::InvalidConfigValueError { .. }
            | SimError::MissingConfigError { .. } => "Fix the configuration value and try again",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            SimError::MalformedInput { message } => {
                format!("The voter profile input could not be used: {}", message)
            }
            SimError::ProviderUnavailable { reason, .. } => {
                format!("The prediction service could not be reached: {}", reason)
            }
            SimError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            other => other.to_string(),
        }
    }
}

/// Why a provider reply could not be read as a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseFailure {
    Empty,
    NoPartyLabel,
    Ambiguous,
}

/// Per-call parse failure. Never propagated; callers record `Party::Unknown`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not read a vote from response {response:?}: {reason:?}")]
pub struct PredictionParseError {
    pub response: String,
    pub reason: ParseFailure,
}

/// Non-fatal signal that too many predictions came back Unknown.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PartialCoverageWarning {
    pub unknown: usize,
    pub total: usize,
    pub threshold: f64,
}

impl PartialCoverageWarning {
    pub fn unknown_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unknown as f64 / self.total as f64
        }
    }
}

impl fmt::Display for PartialCoverageWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "low coverage: {} of {} predictions are Unknown ({:.1}%, threshold {:.1}%)",
            self.unknown,
            self.total,
            self.unknown_fraction() * 100.0,
            self.threshold * 100.0
        )
    }
}

pub type Result<T> = std::result::Result<T, SimError>;
