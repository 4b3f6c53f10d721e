//! Reference datasets keyed by state (past results, elector weights) and the
//! comparison of a simulated outcome against past results.

use crate::domain::historical::{
    AdjustedResult, ComparisonReport, ComparisonRow, HistoricalRecord, HistoricalResults,
};
use crate::domain::outcome::{ElectoralVotes, StateTally, StateWinner};
use crate::domain::state::UsState;
use crate::utils::error::{Result, SimError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

pub const DEFAULT_SIMULATION_WEIGHT: f64 = 0.8;

/// Electors in the whole college; no single state can hold more.
pub const TOTAL_ELECTORS: u32 = 538;

pub fn load_historical_from_reader<R: Read>(reader: R) -> Result<HistoricalResults> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for record in csv_reader.deserialize::<HistoricalRecord>() {
        records.push(record?);
    }
    if records.is_empty() {
        return Err(SimError::malformed_input("historical results file has no rows"));
    }
    tracing::debug!("Loaded historical results for {} states", records.len());
    Ok(HistoricalResults::new(records))
}

pub fn load_historical<P: AsRef<Path>>(path: P) -> Result<HistoricalResults> {
    load_historical_from_reader(std::fs::File::open(path)?)
}

#[derive(Debug, Deserialize)]
struct ElectoralVoteRow {
    #[serde(rename = "STATE")]
    state: UsState,
    #[serde(rename = "ELECTORAL_VOTES")]
    electoral_votes: u32,
}

pub fn load_electoral_votes_from_reader<R: Read>(reader: R) -> Result<ElectoralVotes> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut weights = BTreeMap::new();
    for row in csv_reader.deserialize::<ElectoralVoteRow>() {
        let row = row?;
        if row.electoral_votes > TOTAL_ELECTORS {
            return Err(SimError::malformed_input(format!(
                "{} electoral votes for {} exceeds the {} in the college",
                row.electoral_votes, row.state, TOTAL_ELECTORS
            )));
        }
        if weights.insert(row.state, row.electoral_votes).is_some() {
            return Err(SimError::malformed_input(format!(
                "electoral votes listed twice for {}",
                row.state
            )));
        }
    }
    if weights.is_empty() {
        return Err(SimError::malformed_input("electoral votes file has no rows"));
    }
    let votes = ElectoralVotes::new(weights);
    tracing::debug!(
        "Loaded {} electoral votes across {} states",
        votes.total(),
        votes.len()
    );
    Ok(votes)
}

pub fn load_electoral_votes<P: AsRef<Path>>(path: P) -> Result<ElectoralVotes> {
    load_electoral_votes_from_reader(std::fs::File::open(path)?)
}

fn blended_winner(democrat: f64, republican: f64) -> StateWinner {
    if democrat > republican {
        StateWinner::Democrat
    } else if republican > democrat {
        StateWinner::Republican
    } else {
        StateWinner::Contested
    }
}

pub fn compare_with_historical(
    tallies: &BTreeMap<UsState, StateTally>,
    historical: &HistoricalResults,
) -> Vec<ComparisonRow> {
    tallies
        .values()
        .map(|tally| {
            let (dem_pct, rep_pct) = tally.two_party_percentages();
            let winner_simulated = tally.winner();
            let real = historical.get(tally.state);
            ComparisonRow {
                state: tally.state,
                democrat_simulated: tally.democrat_count,
                republican_simulated: tally.republican_count,
                unknown_simulated: tally.unknown_count,
                democrat_simulated_percent: dem_pct,
                republican_simulated_percent: rep_pct,
                winner_simulated,
                democrat_real_percent: real.map(|r| r.democrat_percent),
                republican_real_percent: real.map(|r| r.republican_percent),
                winner_real: real.map(|r| r.winner),
                block: real.and_then(|r| r.block.clone()),
                correct_prediction: real.is_some_and(|r| r.winner == winner_simulated),
            }
        })
        .collect()
}

/// Blends simulated two-party shares with past shares:
/// `weight * simulated + (1 - weight) * historical`.
pub fn adjust_with_historical(
    tallies: &BTreeMap<UsState, StateTally>,
    historical: &HistoricalResults,
    simulation_weight: f64,
) -> Vec<AdjustedResult> {
    tallies
        .values()
        .map(|tally| {
            let (sim_dem, sim_rep) = tally.two_party_percentages();
            let (dem, rep, used_historical) = match historical.get(tally.state) {
                Some(real) => (
                    simulation_weight * sim_dem + (1.0 - simulation_weight) * real.democrat_percent,
                    simulation_weight * sim_rep
                        + (1.0 - simulation_weight) * real.republican_percent,
                    true,
                ),
                None => (sim_dem, sim_rep, false),
            };
            AdjustedResult {
                state: tally.state,
                democrat_adjusted_percent: dem,
                republican_adjusted_percent: rep,
                winner_adjusted: blended_winner(dem, rep),
                used_historical,
            }
        })
        .collect()
}

pub fn build_comparison_report(
    tallies: &BTreeMap<UsState, StateTally>,
    historical: &HistoricalResults,
    simulation_weight: f64,
) -> ComparisonReport {
    let rows = compare_with_historical(tallies, historical);
    let states_with_history = rows.iter().filter(|row| row.winner_real.is_some()).count();
    let correct_predictions = rows.iter().filter(|row| row.correct_prediction).count();
    ComparisonReport {
        adjusted: adjust_with_historical(tallies, historical, simulation_weight),
        rows,
        simulation_weight,
        states_with_history,
        correct_predictions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORICAL_CSV: &str = "\
STATE,DEMOCRAT_PERCENT,REPUBLICAN_PERCENT,WINNER,BLOCK
OHIO,45.2,53.3,Republican,swing state
California,63.5,34.3,Democrat,solidly Democratic
GA,49.5,49.3,Democrat,
";

    fn tally(state: UsState, dem: usize, rep: usize, unknown: usize) -> StateTally {
        StateTally {
            state,
            democrat_count: dem,
            republican_count: rep,
            unknown_count: unknown,
        }
    }

    fn tallies() -> BTreeMap<UsState, StateTally> {
        [
            tally(UsState::Ohio, 2, 1, 0),
            tally(UsState::California, 3, 0, 1),
            tally(UsState::Vermont, 1, 0, 0),
        ]
        .into_iter()
        .map(|t| (t.state, t))
        .collect()
    }

    #[test]
    fn test_load_historical() {
        let historical = load_historical_from_reader(HISTORICAL_CSV.as_bytes()).unwrap();
        assert_eq!(historical.len(), 3);
        assert_eq!(historical.block(UsState::Ohio), Some("swing state"));
        assert_eq!(historical.block(UsState::Georgia), None);
        assert_eq!(
            historical.get(UsState::California).unwrap().winner,
            StateWinner::Democrat
        );
    }

    #[test]
    fn test_load_historical_rejects_unknown_state() {
        let csv = "STATE,DEMOCRAT_PERCENT,REPUBLICAN_PERCENT,WINNER,BLOCK\nGuam,50,50,Democrat,\n";
        assert!(load_historical_from_reader(csv.as_bytes()).is_err());
    }

    #[test]
    fn test_compare_marks_correct_predictions() {
        let historical = load_historical_from_reader(HISTORICAL_CSV.as_bytes()).unwrap();
        let report = build_comparison_report(&tallies(), &historical, 0.8);

        let ohio = report.rows.iter().find(|r| r.state == UsState::Ohio).unwrap();
        assert_eq!(ohio.winner_simulated, StateWinner::Democrat);
        assert_eq!(ohio.winner_real, Some(StateWinner::Republican));
        assert!(!ohio.correct_prediction);

        let california = report
            .rows
            .iter()
            .find(|r| r.state == UsState::California)
            .unwrap();
        assert!(california.correct_prediction);
        assert_eq!(california.democrat_simulated_percent, 100.0);

        let vermont = report
            .rows
            .iter()
            .find(|r| r.state == UsState::Vermont)
            .unwrap();
        assert_eq!(vermont.winner_real, None);
        assert!(!vermont.correct_prediction);

        assert_eq!(report.states_with_history, 2);
        assert_eq!(report.correct_predictions, 1);
        assert_eq!(report.accuracy(), Some(0.5));
    }

    #[test]
    fn test_adjusted_blend() {
        let historical = load_historical_from_reader(HISTORICAL_CSV.as_bytes()).unwrap();
        let adjusted = adjust_with_historical(&tallies(), &historical, 0.5);

        let ohio = adjusted.iter().find(|a| a.state == UsState::Ohio).unwrap();
        let sim_dem = 200.0 / 3.0;
        let sim_rep = 100.0 / 3.0;
        assert!((ohio.democrat_adjusted_percent - (0.5 * sim_dem + 0.5 * 45.2)).abs() < 1e-9);
        assert!((ohio.republican_adjusted_percent - (0.5 * sim_rep + 0.5 * 53.3)).abs() < 1e-9);
        assert_eq!(ohio.winner_adjusted, StateWinner::Democrat);
        assert!(ohio.used_historical);

        let vermont = adjusted
            .iter()
            .find(|a| a.state == UsState::Vermont)
            .unwrap();
        assert!(!vermont.used_historical);
        assert_eq!(vermont.democrat_adjusted_percent, 100.0);
    }

    #[test]
    fn test_zero_weight_follows_history() {
        let historical = load_historical_from_reader(HISTORICAL_CSV.as_bytes()).unwrap();
        let adjusted = adjust_with_historical(&tallies(), &historical, 0.0);
        let ohio = adjusted.iter().find(|a| a.state == UsState::Ohio).unwrap();
        assert_eq!(ohio.winner_adjusted, StateWinner::Republican);
    }

    #[test]
    fn test_load_electoral_votes() {
        let csv = "STATE,ELECTORAL_VOTES\nOhio,17\nTX,40\n";
        let votes = load_electoral_votes_from_reader(csv.as_bytes()).unwrap();
        assert_eq!(votes.get(UsState::Texas), Some(40));
        assert_eq!(votes.total(), 57);

        let duplicate = "STATE,ELECTORAL_VOTES\nOhio,17\nOH,17\n";
        assert!(matches!(
            load_electoral_votes_from_reader(duplicate.as_bytes()),
            Err(SimError::MalformedInput { .. })
        ));
    }

    #[test]
    fn test_oversized_electoral_votes_are_rejected() {
        let csv = "STATE,ELECTORAL_VOTES\nOhio,4000000000\nTexas,4000000000\n";
        let err = load_electoral_votes_from_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, SimError::MalformedInput { .. }));
        assert!(err.to_string().contains("Ohio"));

        let full = "STATE,ELECTORAL_VOTES\nOhio,538\n";
        assert_eq!(
            load_electoral_votes_from_reader(full.as_bytes()).unwrap().total(),
            538
        );
    }
}
