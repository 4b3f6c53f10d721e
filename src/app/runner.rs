//! Wiring shared by the binaries: build the provider, predictor, pipeline
//! and engine from a config, run it, and turn the result into an exit code.

use crate::config::cli::LocalStorage;
use crate::core::engine::{RunSummary, SimulationEngine};
use crate::core::pipeline::SimulationPipeline;
use crate::core::predictor::{BatchPredictor, CancellationSignal, PredictorOptions};
use crate::core::prompt::BallotTemplate;
use crate::core::provider::{OpenAiProvider, ProviderSettings};
use crate::core::report::render_summary;
use crate::domain::ports::{CompletionProvider, ConfigProvider};
use crate::utils::error::{Result, SimError};
use crate::utils::validation::Validate;
use std::sync::Arc;

pub const EXIT_SUCCESS: i32 = 0;
/// The run finished but no prediction resolved to a party.
pub const EXIT_NO_RESOLVED: i32 = 2;

/// Everything needed to start one run besides the config itself.
pub struct RunRequest {
    pub settings: ProviderSettings,
    pub options: PredictorOptions,
    pub template: BallotTemplate,
    pub monitor: bool,
    pub cancel: CancellationSignal,
}

pub async fn run_simulation<C: ConfigProvider>(config: C, request: RunRequest) -> Result<RunSummary> {
    request.settings.validate()?;
    let provider: Arc<dyn CompletionProvider> = Arc::new(OpenAiProvider::new(&request.settings)?);
    run_with_provider(config, provider, request.options, request.template, request.monitor, request.cancel)
        .await
}

/// Same as [`run_simulation`] with an already built provider.
pub async fn run_with_provider<C: ConfigProvider>(
    config: C,
    provider: Arc<dyn CompletionProvider>,
    options: PredictorOptions,
    template: BallotTemplate,
    monitor: bool,
    cancel: CancellationSignal,
) -> Result<RunSummary> {
    let storage = LocalStorage::new(config.output_path().to_string());
    let predictor = BatchPredictor::new(provider, options, cancel);
    let pipeline = SimulationPipeline::new(storage, config, predictor)
        .with_template(template)
        .with_reference_data()?;

    SimulationEngine::new_with_monitoring(pipeline, monitor)
        .run()
        .await
}

/// Cancels the batch on the first Ctrl-C.
pub fn spawn_ctrl_c_handler(cancel: CancellationSignal) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("🛑 Ctrl-C received, finishing in-flight predictions");
            cancel.cancel();
        }
    });
}

pub fn exit_code_for(summary: &RunSummary) -> i32 {
    if summary.report.has_resolved_predictions() {
        EXIT_SUCCESS
    } else {
        EXIT_NO_RESOLVED
    }
}

/// Prints the outcome for a person at a terminal and returns the exit code.
pub fn report_result(result: &Result<RunSummary>) -> i32 {
    match result {
        Ok(summary) => {
            println!("{}", render_summary(&summary.report));
            println!("📁 Output saved to: {}", summary.output_path);

            let code = exit_code_for(summary);
            if code == EXIT_SUCCESS {
                tracing::info!("✅ Simulation completed successfully!");
                println!("✅ Simulation completed successfully!");
            } else {
                tracing::error!("❌ No prediction resolved to a party");
                eprintln!("❌ The run finished but no prediction could be resolved to a party");
            }
            code
        }
        Err(e) => report_error(e),
    }
}

pub fn report_error(e: &SimError) -> i32 {
    tracing::error!(
        "❌ Simulation failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
    e.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::aggregate;
    use crate::domain::model::{BatchStats, SimulationReport};

    fn summary(resolved: usize) -> RunSummary {
        RunSummary {
            output_path: "out".to_string(),
            report: SimulationReport {
                generated_at: chrono::Utc::now(),
                model: "gpt-test".to_string(),
                skipped_rows: vec![],
                predictions: vec![],
                stats: BatchStats {
                    resolved,
                    ..BatchStats::default()
                },
                aggregation: aggregate(&[], None),
                comparison: None,
                warnings: vec![],
            },
        }
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&summary(3)), EXIT_SUCCESS);
        assert_eq!(exit_code_for(&summary(0)), EXIT_NO_RESOLVED);
        assert_eq!(
            report_result(&Err(SimError::malformed_input("no rows"))),
            1
        );
        assert_eq!(
            report_result(&Err(SimError::ProviderUnavailable {
                attempted: 2,
                reason: "connection refused".to_string(),
            })),
            3
        );
    }
}
