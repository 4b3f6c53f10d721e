use crate::domain::model::{BatchStats, SimulationReport, SkippedRow};
use crate::domain::outcome::{Coverage, ElectionOutcome};
use crate::domain::ports::Storage;
use crate::utils::error::{PartialCoverageWarning, Result, SimError};
use serde::Serialize;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const ZIP_FILE_NAME: &str = "simulation_output.zip";
pub const PREDICTIONS_FILE: &str = "predictions.csv";
pub const TALLIES_FILE: &str = "state_tallies.csv";
pub const OUTCOME_FILE: &str = "outcome.json";
pub const COMPARISON_FILE: &str = "comparison.csv";
pub const ADJUSTED_FILE: &str = "adjusted.csv";

/// One rendered output artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFile {
    pub name: &'static str,
    pub contents: Vec<u8>,
}

#[derive(Serialize)]
struct PredictionRow<'a> {
    #[serde(rename = "ROW")]
    row: usize,
    #[serde(rename = "AGE")]
    age: u32,
    #[serde(rename = "GENDER")]
    gender: &'static str,
    #[serde(rename = "STATE")]
    state: &'static str,
    #[serde(rename = "EDUCATION_LEVEL")]
    education: &'static str,
    #[serde(rename = "MARITAL_STATUS")]
    marital_status: &'static str,
    #[serde(rename = "OCCUPATION_DESCRIPTION")]
    occupation: &'a str,
    #[serde(rename = "INCOME_LEVEL")]
    income_level: u8,
    #[serde(rename = "PREDICTED_PARTY")]
    predicted_party: &'static str,
    #[serde(rename = "PROVIDER_CALLS")]
    provider_calls: u32,
    #[serde(rename = "FAILURE")]
    failure: &'a str,
}

#[derive(Serialize)]
struct TallyRow {
    #[serde(rename = "STATE")]
    state: &'static str,
    #[serde(rename = "DEMOCRAT")]
    democrat: usize,
    #[serde(rename = "REPUBLICAN")]
    republican: usize,
    #[serde(rename = "UNKNOWN")]
    unknown: usize,
    #[serde(rename = "WINNER")]
    winner: &'static str,
}

#[derive(Serialize)]
struct OutcomeDocument<'a> {
    generated_at: String,
    model: &'a str,
    outcome: &'a ElectionOutcome,
    coverage: &'a Coverage,
    stats: &'a BatchStats,
    skipped_rows: &'a [SkippedRow],
    warnings: &'a [PartialCoverageWarning],
    historical_accuracy: Option<f64>,
}

fn to_csv<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| SimError::IoError(e.into_error()))
}

pub fn predictions_csv(report: &SimulationReport) -> Result<Vec<u8>> {
    to_csv(report.predictions.iter().map(|p| PredictionRow {
        row: p.index + 1,
        age: p.profile.age,
        gender: p.profile.gender.as_token(),
        state: p.profile.state.name(),
        education: p.profile.education.as_token(),
        marital_status: p.profile.marital_status.as_token(),
        occupation: &p.profile.occupation,
        income_level: p.profile.income_level.value(),
        predicted_party: p.predicted_party.as_str(),
        provider_calls: p.provider_calls,
        failure: p.failure.as_deref().unwrap_or(""),
    }))
}

pub fn tallies_csv(report: &SimulationReport) -> Result<Vec<u8>> {
    to_csv(report.aggregation.tallies.values().map(|t| TallyRow {
        state: t.state.name(),
        democrat: t.democrat_count,
        republican: t.republican_count,
        unknown: t.unknown_count,
        winner: t.winner().as_str(),
    }))
}

pub fn outcome_json(report: &SimulationReport) -> Result<Vec<u8>> {
    let document = OutcomeDocument {
        generated_at: report.generated_at.to_rfc3339(),
        model: &report.model,
        outcome: &report.aggregation.outcome,
        coverage: &report.aggregation.coverage,
        stats: &report.stats,
        skipped_rows: &report.skipped_rows,
        warnings: &report.warnings,
        historical_accuracy: report.comparison.as_ref().and_then(|c| c.accuracy()),
    };
    Ok(serde_json::to_vec_pretty(&document)?)
}

/// Renders the artifacts for the requested formats (`csv`, `json`).
pub fn render_files(report: &SimulationReport, formats: &[String]) -> Result<Vec<ExportFile>> {
    let wants = |format: &str| formats.iter().any(|f| f.eq_ignore_ascii_case(format));
    let mut files = Vec::new();

    if wants("csv") {
        files.push(ExportFile {
            name: PREDICTIONS_FILE,
            contents: predictions_csv(report)?,
        });
        files.push(ExportFile {
            name: TALLIES_FILE,
            contents: tallies_csv(report)?,
        });
        if let Some(comparison) = &report.comparison {
            files.push(ExportFile {
                name: COMPARISON_FILE,
                contents: to_csv(&comparison.rows)?,
            });
            files.push(ExportFile {
                name: ADJUSTED_FILE,
                contents: to_csv(&comparison.adjusted)?,
            });
        }
    }

    if wants("json") {
        files.push(ExportFile {
            name: OUTCOME_FILE,
            contents: outcome_json(report)?,
        });
    }

    if files.is_empty() {
        return Err(SimError::ConfigValidationError {
            field: "output.formats".to_string(),
            message: format!("No supported output format in {:?}", formats),
        });
    }
    Ok(files)
}

pub fn zip_files(files: &[ExportFile]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for file in files {
        zip.start_file::<_, ()>(file.name, FileOptions::default())?;
        zip.write_all(&file.contents)?;
    }
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

/// Writes the report through `storage` and returns the names written.
pub async fn write_report<S: Storage>(
    storage: &S,
    report: &SimulationReport,
    formats: &[String],
    compress: bool,
) -> Result<Vec<String>> {
    let files = render_files(report, formats)?;

    if compress {
        let zip_data = zip_files(&files)?;
        tracing::debug!(
            "Writing {} ({} files, {} bytes)",
            ZIP_FILE_NAME,
            files.len(),
            zip_data.len()
        );
        storage.write_file(ZIP_FILE_NAME, &zip_data).await?;
        return Ok(vec![ZIP_FILE_NAME.to_string()]);
    }

    let mut written = Vec::with_capacity(files.len());
    for file in &files {
        tracing::debug!("Writing {} ({} bytes)", file.name, file.contents.len());
        storage.write_file(file.name, &file.contents).await?;
        written.push(file.name.to_string());
    }
    Ok(written)
}
