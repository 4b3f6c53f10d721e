use crate::domain::model::PredictionResult;
use crate::domain::outcome::{
    Aggregation, Coverage, ElectionOutcome, ElectoralVotes, NationalWinner, StateTally,
    StateWinner, Weighting,
};
use crate::domain::state::UsState;
use crate::utils::error::PartialCoverageWarning;
use std::collections::BTreeMap;

pub fn tally_by_state(results: &[PredictionResult]) -> BTreeMap<UsState, StateTally> {
    let mut tallies: BTreeMap<UsState, StateTally> = BTreeMap::new();
    for result in results {
        let state = result.profile.state;
        tallies
            .entry(state)
            .or_insert_with(|| StateTally::new(state))
            .record(result.predicted_party);
    }
    tallies
}

/// Groups predictions by state and decides state and national winners.
///
/// Pure: the same results and weights always give the same [`Aggregation`].
/// States without any profile do not appear. Equal Democrat/Republican
/// counts make a state `Contested`, which carries no weight. With
/// `electoral_votes` each won state scores its elector count, otherwise 1.
pub fn aggregate(
    results: &[PredictionResult],
    electoral_votes: Option<&ElectoralVotes>,
) -> Aggregation {
    let tallies = tally_by_state(results);

    let weighting = if electoral_votes.is_some() {
        Weighting::ElectoralVotes
    } else {
        Weighting::StateCount
    };

    let mut per_state_winner = BTreeMap::new();
    let mut democrat_score = 0u64;
    let mut republican_score = 0u64;
    let mut decisive_states = 0usize;
    let mut contested_states = 0usize;

    for (state, tally) in &tallies {
        let winner = tally.winner();
        per_state_winner.insert(*state, winner);

        let weight = match electoral_votes {
            Some(votes) => votes.get(*state).map(u64::from).unwrap_or_else(|| {
                if winner != StateWinner::Contested {
                    tracing::warn!("No electoral votes configured for {}; counting 0", state);
                }
                0
            }),
            None => 1,
        };

        match winner {
            StateWinner::Democrat => {
                democrat_score += weight;
                decisive_states += 1;
            }
            StateWinner::Republican => {
                republican_score += weight;
                decisive_states += 1;
            }
            StateWinner::Contested => contested_states += 1,
        }
    }

    let national_winner = match democrat_score.cmp(&republican_score) {
        std::cmp::Ordering::Greater => NationalWinner::Democrat,
        std::cmp::Ordering::Less => NationalWinner::Republican,
        std::cmp::Ordering::Equal => NationalWinner::Tie,
    };

    let coverage = Coverage {
        total: results.len(),
        unknown: results
            .iter()
            .filter(|r| !r.predicted_party.is_decisive())
            .count(),
    };

    Aggregation {
        tallies,
        outcome: ElectionOutcome {
            per_state_winner,
            national_winner,
            weighting,
            democrat_score,
            republican_score,
            decisive_states,
            contested_states,
        },
        coverage,
    }
}

/// Returns a warning when the Unknown share exceeds `threshold`.
pub fn coverage_warning(coverage: &Coverage, threshold: f64) -> Option<PartialCoverageWarning> {
    if coverage.total > 0 && coverage.unknown_fraction() > threshold {
        Some(PartialCoverageWarning {
            unknown: coverage.unknown,
            total: coverage.total,
            threshold,
        })
    } else {
        None
    }
}
