use crate::domain::historical::ComparisonReport;
use crate::domain::outcome::{Aggregation, ElectionOutcome};
use crate::domain::profile::VoterProfile;
use crate::utils::error::PartialCoverageWarning;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    Democrat,
    Republican,
    Unknown,
}

impl Party {
    pub fn is_decisive(self) -> bool {
        !matches!(self, Party::Unknown)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Party::Democrat => "Democrat",
            Party::Republican => "Republican",
            Party::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Party {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row the loader refused, with its 1-based line number in the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub line: u64,
    pub reason: String,
}

/// Profiles accepted by the loader, in input order.
#[derive(Debug, Clone, Default)]
pub struct ProfileBatch {
    pub profiles: Vec<VoterProfile>,
    pub skipped: Vec<SkippedRow>,
}

impl ProfileBatch {
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Position of the profile in the loaded batch.
    pub index: usize,
    pub profile: VoterProfile,
    pub predicted_party: Party,
    /// Text of the last provider reply, if any arrived.
    pub raw_response: Option<String>,
    pub provider_calls: u32,
    pub failure: Option<String>,
}

impl PredictionResult {
    pub fn unknown(index: usize, profile: VoterProfile, reason: impl Into<String>) -> Self {
        Self {
            index,
            profile,
            predicted_party: Party::Unknown,
            raw_response: None,
            provider_calls: 0,
            failure: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub profiles: usize,
    pub resolved: usize,
    pub unknown: usize,
    pub parse_failures: usize,
    pub call_failures: usize,
    pub cancelled: usize,
    pub provider_calls: usize,
}

/// Everything produced by one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub model: String,
    pub skipped_rows: Vec<SkippedRow>,
    pub predictions: Vec<PredictionResult>,
    pub stats: BatchStats,
    pub aggregation: Aggregation,
    pub comparison: Option<ComparisonReport>,
    pub warnings: Vec<PartialCoverageWarning>,
}

impl SimulationReport {
    pub fn outcome(&self) -> &ElectionOutcome {
        &self.aggregation.outcome
    }

    pub fn has_resolved_predictions(&self) -> bool {
        self.stats.resolved > 0
    }
}
