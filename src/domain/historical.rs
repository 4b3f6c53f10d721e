use crate::domain::outcome::StateWinner;
use crate::domain::state::UsState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of a past election's results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    #[serde(rename = "STATE")]
    pub state: UsState,
    #[serde(rename = "DEMOCRAT_PERCENT")]
    pub democrat_percent: f64,
    #[serde(rename = "REPUBLICAN_PERCENT")]
    pub republican_percent: f64,
    #[serde(rename = "WINNER")]
    pub winner: StateWinner,
    /// Political leaning label, e.g. "swing state".
    #[serde(rename = "BLOCK", default)]
    pub block: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoricalResults {
    records: BTreeMap<UsState, HistoricalRecord>,
}

impl HistoricalResults {
    pub fn new(records: impl IntoIterator<Item = HistoricalRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|record| (record.state, record))
                .collect(),
        }
    }

    pub fn get(&self, state: UsState) -> Option<&HistoricalRecord> {
        self.records.get(&state)
    }

    pub fn block(&self, state: UsState) -> Option<&str> {
        self.get(state)
            .and_then(|record| record.block.as_deref())
            .filter(|block| !block.trim().is_empty())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub state: UsState,
    pub democrat_simulated: usize,
    pub republican_simulated: usize,
    pub unknown_simulated: usize,
    pub democrat_simulated_percent: f64,
    pub republican_simulated_percent: f64,
    pub winner_simulated: StateWinner,
    pub democrat_real_percent: Option<f64>,
    pub republican_real_percent: Option<f64>,
    pub winner_real: Option<StateWinner>,
    pub block: Option<String>,
    pub correct_prediction: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedResult {
    pub state: UsState,
    pub democrat_adjusted_percent: f64,
    pub republican_adjusted_percent: f64,
    pub winner_adjusted: StateWinner,
    pub used_historical: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonReport {
    pub rows: Vec<ComparisonRow>,
    pub adjusted: Vec<AdjustedResult>,
    pub simulation_weight: f64,
    pub states_with_history: usize,
    pub correct_predictions: usize,
}

impl ComparisonReport {
    /// Share of states with historical data whose simulated winner matched.
    pub fn accuracy(&self) -> Option<f64> {
        if self.states_with_history == 0 {
            None
        } else {
            Some(self.correct_predictions as f64 / self.states_with_history as f64)
        }
    }
}
