//! Reads voter profile CSVs into validated [`VoterProfile`]s.
//!
//! Missing required columns fail the whole load before anything else runs.
//! Individual bad rows are skipped and reported; an input with no usable
//! row at all is rejected as malformed.

use crate::domain::model::{ProfileBatch, SkippedRow};
use crate::domain::profile::{
    parse_age, parse_occupation, AttributeError, EducationLevel, Gender, IncomeLevel,
    MaritalStatus, VoterProfile,
};
use crate::domain::state::UsState;
use crate::utils::error::{Result, SimError};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Age,
    Gender,
    State,
    Education,
    MaritalStatus,
    Occupation,
    Income,
}

impl Column {
    const ALL: [Column; 7] = [
        Column::Age,
        Column::Gender,
        Column::State,
        Column::Education,
        Column::MaritalStatus,
        Column::Occupation,
        Column::Income,
    ];

    fn canonical(self) -> &'static str {
        match self {
            Column::Age => "AGE",
            Column::Gender => "GENDER",
            Column::State => "STATE",
            Column::Education => "EDUCATION_LEVEL",
            Column::MaritalStatus => "MARITAL_STATUS",
            Column::Occupation => "OCCUPATION_DESCRIPTION",
            Column::Income => "INCOME_LEVEL",
        }
    }

    fn accepts(self, normalized_header: &str) -> bool {
        let aliases: &[&str] = match self {
            Column::Age => &["AGE"],
            Column::Gender => &["GENDER", "SEX"],
            Column::State => &["STATE"],
            Column::Education => &["EDUCATION_LEVEL", "EDUCATION"],
            Column::MaritalStatus => &["MARITAL_STATUS"],
            Column::Occupation => &["OCCUPATION", "OCCUPATION_DESCRIPTION"],
            Column::Income => &["INCOME_LEVEL", "INCOME"],
        };
        aliases.contains(&normalized_header)
    }
}

fn normalize_header(header: &str) -> String {
    header
        .trim()
        .trim_start_matches('\u{feff}')
        .to_ascii_uppercase()
        .replace([' ', '-'], "_")
}

/// Column positions resolved from the header row.
struct ColumnMap {
    positions: [usize; 7],
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();
        let mut positions = [0usize; 7];
        let mut missing = Vec::new();

        for (slot, column) in Column::ALL.iter().enumerate() {
            match normalized.iter().position(|h| column.accepts(h)) {
                Some(position) => positions[slot] = position,
                None => missing.push(column.canonical()),
            }
        }

        if !missing.is_empty() {
            return Err(SimError::malformed_input(format!(
                "missing required column(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { positions })
    }

    fn field<'r>(&self, record: &'r StringRecord, column: Column) -> &'r str {
        // ALL lists columns in declaration order.
        record.get(self.positions[column as usize]).unwrap_or("")
    }

    fn parse_row(&self, record: &StringRecord) -> std::result::Result<VoterProfile, AttributeError> {
        let state_raw = self.field(record, Column::State);
        let state: UsState = state_raw.parse().map_err(|_| AttributeError {
            attribute: "state",
            value: state_raw.to_string(),
            reason: "not one of the 50 states or DC".to_string(),
        })?;

        Ok(VoterProfile {
            age: parse_age(self.field(record, Column::Age))?,
            gender: self.field(record, Column::Gender).parse::<Gender>()?,
            state,
            education: self
                .field(record, Column::Education)
                .parse::<EducationLevel>()?,
            marital_status: self
                .field(record, Column::MaritalStatus)
                .parse::<MaritalStatus>()?,
            occupation: parse_occupation(self.field(record, Column::Occupation))?,
            income_level: self.field(record, Column::Income).parse::<IncomeLevel>()?,
        })
    }
}

pub fn load_profiles_from_path<P: AsRef<Path>>(path: P) -> Result<ProfileBatch> {
    let path = path.as_ref();
    tracing::debug!("Reading voter profiles from {}", path.display());
    let file = std::fs::File::open(path)?;
    load_profiles_from_reader(file)
}

pub fn load_profiles_from_reader<R: Read>(reader: R) -> Result<ProfileBatch> {
    let mut csv_reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .map_err(|e| SimError::malformed_input(format!("unreadable header row: {}", e)))?
        .clone();
    let columns = ColumnMap::resolve(&headers)?;

    let mut batch = ProfileBatch::default();
    for (offset, record) in csv_reader.records().enumerate() {
        // Header is line 1.
        let fallback_line = offset as u64 + 2;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                skip_row(&mut batch, fallback_line, format!("unreadable row: {}", e));
                continue;
            }
        };
        let line = record
            .position()
            .map(|p| p.line())
            .unwrap_or(fallback_line);

        if record.iter().all(|field| field.is_empty()) {
            continue;
        }

        match columns.parse_row(&record) {
            Ok(profile) => batch.profiles.push(profile),
            Err(e) => skip_row(&mut batch, line, e.to_string()),
        }
    }

    if !batch.skipped.is_empty() {
        tracing::warn!(
            "⚠️ Skipped {} invalid profile row(s), kept {}",
            batch.skipped.len(),
            batch.profiles.len()
        );
    }

    if batch.is_empty() {
        return Err(SimError::malformed_input(format!(
            "no valid profile rows ({} skipped)",
            batch.skipped.len()
        )));
    }

    tracing::info!("📥 Loaded {} voter profiles", batch.len());
    Ok(batch)
}

fn skip_row(batch: &mut ProfileBatch, line: u64, reason: String) {
    tracing::warn!("Skipping profile row at line {}: {}", line, reason);
    batch.skipped.push(SkippedRow { line, reason });
}

/// Serializes profiles with the canonical column headers.
pub fn write_profiles_csv(profiles: &[VoterProfile]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for profile in profiles {
        writer.serialize(profile)?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| SimError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| SimError::ProcessingError {
        message: format!("profile CSV is not UTF-8: {}", e),
    })
}

/// Built-in sample used when no profile file is configured.
pub fn default_profiles() -> ProfileBatch {
    use EducationLevel::*;
    use Gender::*;
    use MaritalStatus::*;

    let rows: [(u32, Gender, UsState, EducationLevel, MaritalStatus, &str, u8); 10] = [
        (25, Male, UsState::California, Bachelor, Single, "engineer", 6),
        (40, Female, UsState::Texas, Master, Married, "teacher", 4),
        (60, Female, UsState::NewYork, HighSchool, Widowed, "retired", 3),
        (35, Male, UsState::Florida, Bachelor, Single, "manager", 7),
        (50, Male, UsState::Ohio, Doctorate, Married, "scientist", 9),
        (45, Female, UsState::Pennsylvania, HighSchool, Single, "nurse", 5),
        (29, Male, UsState::Illinois, Master, Married, "lawyer", 4),
        (38, Female, UsState::Michigan, Bachelor, Single, "technician", 6),
        (67, Male, UsState::Georgia, HighSchool, Widowed, "consultant", 3),
        (53, Female, UsState::Arizona, Master, Divorced, "artist", 7),
    ];

    let profiles = rows
        .into_iter()
        .filter_map(
            |(age, gender, state, education, marital_status, occupation, income)| {
                Some(VoterProfile {
                    age,
                    gender,
                    state,
                    education,
                    marital_status,
                    occupation: occupation.to_string(),
                    income_level: IncomeLevel::new(income).ok()?,
                })
            },
        )
        .collect();

    ProfileBatch {
        profiles,
        skipped: Vec::new(),
    }
}
