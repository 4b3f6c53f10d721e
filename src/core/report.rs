use crate::domain::model::SimulationReport;
use crate::domain::outcome::{NationalWinner, Weighting};
use std::fmt::Write;

/// Plain-text summary of a run: per-state tallies, national result, coverage
/// and historical accuracy when available.
pub fn render_summary(report: &SimulationReport) -> String {
    let mut out = String::new();
    let outcome = report.outcome();

    let _ = writeln!(out, "🗳️  Simulation Summary (model: {})", report.model);
    let _ = writeln!(
        out,
        "  {:<22} {:>8} {:>10} {:>8}  {}",
        "State", "Democrat", "Republican", "Unknown", "Winner"
    );
    for tally in report.aggregation.tallies.values() {
        let _ = writeln!(
            out,
            "  {:<22} {:>8} {:>10} {:>8}  {}",
            tally.state.name(),
            tally.democrat_count,
            tally.republican_count,
            tally.unknown_count,
            tally.winner()
        );
    }
    let _ = writeln!(out);

    let unit = match outcome.weighting {
        Weighting::StateCount => "states",
        Weighting::ElectoralVotes => "electoral votes",
    };
    let headline = match outcome.national_winner {
        NationalWinner::Tie => "🏛️  National outcome: Tie".to_string(),
        winner => format!("🏛️  National winner: {}", winner),
    };
    let _ = writeln!(
        out,
        "{} (Democrat {} vs Republican {} {})",
        headline, outcome.democrat_score, outcome.republican_score, unit
    );
    if outcome.contested_states > 0 {
        let _ = writeln!(out, "  Contested states: {}", outcome.contested_states);
    }

    let coverage = &report.aggregation.coverage;
    let _ = writeln!(
        out,
        "📊 Coverage: {}/{} predictions resolved ({} Unknown)",
        coverage.resolved(),
        coverage.total,
        coverage.unknown
    );
    if !report.skipped_rows.is_empty() {
        let _ = writeln!(out, "  Skipped input rows: {}", report.skipped_rows.len());
    }
    if report.stats.cancelled > 0 {
        let _ = writeln!(out, "  Cancelled before prediction: {}", report.stats.cancelled);
    }

    if let Some(comparison) = &report.comparison {
        match comparison.accuracy() {
            Some(accuracy) => {
                let _ = writeln!(
                    out,
                    "📜 Historical match: {}/{} states ({:.1}%)",
                    comparison.correct_predictions,
                    comparison.states_with_history,
                    accuracy * 100.0
                );
            }
            None => {
                let _ = writeln!(out, "📜 Historical match: no simulated state has past results");
            }
        }
    }

    for warning in &report.warnings {
        let _ = writeln!(out, "⚠️  {}", warning);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::aggregate;
    use crate::domain::model::{BatchStats, Party, PredictionResult};
    use crate::domain::profile::{EducationLevel, Gender, IncomeLevel, MaritalStatus, VoterProfile};
    use crate::domain::state::UsState;
    use crate::utils::error::PartialCoverageWarning;

    fn prediction(index: usize, state: UsState, party: Party) -> PredictionResult {
        PredictionResult {
            index,
            profile: VoterProfile {
                age: 44,
                gender: Gender::Male,
                state,
                education: EducationLevel::HighSchool,
                marital_status: MaritalStatus::Married,
                occupation: "electrician".to_string(),
                income_level: IncomeLevel::new(5).unwrap(),
            },
            predicted_party: party,
            raw_response: None,
            provider_calls: 1,
            failure: None,
        }
    }

    #[test]
    fn test_summary_lists_states_and_winner() {
        let predictions = vec![
            prediction(0, UsState::Ohio, Party::Democrat),
            prediction(1, UsState::Ohio, Party::Democrat),
            prediction(2, UsState::Ohio, Party::Republican),
            prediction(3, UsState::Kansas, Party::Unknown),
        ];
        let aggregation = aggregate(&predictions, None);
        let report = SimulationReport {
            generated_at: chrono::Utc::now(),
            model: "gpt-test".to_string(),
            skipped_rows: vec![],
            predictions,
            stats: BatchStats::default(),
            aggregation,
            comparison: None,
            warnings: vec![PartialCoverageWarning {
                unknown: 1,
                total: 4,
                threshold: 0.2,
            }],
        };

        let summary = render_summary(&report);
        assert!(summary.contains("gpt-test"));
        assert!(summary.contains("Ohio"));
        assert!(summary.contains("Kansas"));
        assert!(summary.contains("National winner: Democrat"));
        assert!(summary.contains("Contested states: 1"));
        assert!(summary.contains("3/4 predictions resolved"));
        assert!(summary.contains("⚠️"));
    }
}
