use crate::domain::model::Party;
use crate::domain::state::UsState;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StateWinner {
    Democrat,
    Republican,
    /// Equal Democrat and Republican counts, including 0 to 0.
    Contested,
}

impl StateWinner {
    pub fn party(self) -> Option<Party> {
        match self {
            StateWinner::Democrat => Some(Party::Democrat),
            StateWinner::Republican => Some(Party::Republican),
            StateWinner::Contested => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StateWinner::Democrat => "Democrat",
            StateWinner::Republican => "Republican",
            StateWinner::Contested => "Contested",
        }
    }
}

impl std::fmt::Display for StateWinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NationalWinner {
    Democrat,
    Republican,
    Tie,
}

impl std::fmt::Display for NationalWinner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NationalWinner::Democrat => "Democrat",
            NationalWinner::Republican => "Republican",
            NationalWinner::Tie => "Tie",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StateTally {
    pub state: UsState,
    pub democrat_count: usize,
    pub republican_count: usize,
    pub unknown_count: usize,
}

impl StateTally {
    pub fn new(state: UsState) -> Self {
        Self {
            state,
            democrat_count: 0,
            republican_count: 0,
            unknown_count: 0,
        }
    }

    pub fn record(&mut self, party: Party) {
        match party {
            Party::Democrat => self.democrat_count += 1,
            Party::Republican => self.republican_count += 1,
            Party::Unknown => self.unknown_count += 1,
        }
    }

    pub fn decisive_votes(&self) -> usize {
        self.democrat_count + self.republican_count
    }

    pub fn total(&self) -> usize {
        self.decisive_votes() + self.unknown_count
    }

    /// Strict majority of decisive votes; Unknown never counts.
    pub fn winner(&self) -> StateWinner {
        use std::cmp::Ordering;
        match self.democrat_count.cmp(&self.republican_count) {
            Ordering::Greater => StateWinner::Democrat,
            Ordering::Less => StateWinner::Republican,
            Ordering::Equal => StateWinner::Contested,
        }
    }

    /// Two-party shares in percent, zero when there are no decisive votes.
    pub fn two_party_percentages(&self) -> (f64, f64) {
        let decisive = self.decisive_votes();
        if decisive == 0 {
            return (0.0, 0.0);
        }
        (
            self.democrat_count as f64 * 100.0 / decisive as f64,
            self.republican_count as f64 * 100.0 / decisive as f64,
        )
    }
}

/// Elector weights per state, supplied from outside.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ElectoralVotes {
    weights: BTreeMap<UsState, u32>,
}

impl ElectoralVotes {
    pub fn new(weights: BTreeMap<UsState, u32>) -> Self {
        Self { weights }
    }

    pub fn get(&self, state: UsState) -> Option<u32> {
        self.weights.get(&state).copied()
    }

    pub fn total(&self) -> u64 {
        self.weights.values().copied().map(u64::from).sum()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Weighting {
    StateCount,
    ElectoralVotes,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectionOutcome {
    pub per_state_winner: BTreeMap<UsState, StateWinner>,
    pub national_winner: NationalWinner,
    pub weighting: Weighting,
    pub democrat_score: u64,
    pub republican_score: u64,
    pub decisive_states: usize,
    pub contested_states: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Coverage {
    pub total: usize,
    pub unknown: usize,
}

impl Coverage {
    pub fn resolved(&self) -> usize {
        self.total - self.unknown
    }

    pub fn unknown_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.unknown as f64 / self.total as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    pub tallies: BTreeMap<UsState, StateTally>,
    pub outcome: ElectionOutcome,
    pub coverage: Coverage,
}
