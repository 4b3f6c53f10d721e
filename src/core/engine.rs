use crate::domain::model::SimulationReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;
use std::time::Instant;

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: String,
    pub report: SimulationReport,
}

pub struct SimulationEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> SimulationEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<RunSummary> {
        tracing::info!("🚀 Starting election simulation");
        self.monitor.log_stats("start");

        let started = Instant::now();
        let batch = self.pipeline.extract().await?;
        tracing::info!(
            "📥 Extracted {} profile(s) in {:?} ({} row(s) skipped)",
            batch.len(),
            started.elapsed(),
            batch.skipped.len()
        );
        self.monitor.log_stats("extract");

        let started = Instant::now();
        let report = self.pipeline.transform(batch).await?;
        tracing::info!(
            "🔄 Predicted and aggregated {} profile(s) in {:?}",
            report.predictions.len(),
            started.elapsed()
        );
        self.monitor.log_stats("transform");

        let started = Instant::now();
        let output_path = self.pipeline.load(&report).await?;
        tracing::info!("💾 Output saved to {} in {:?}", output_path, started.elapsed());
        self.monitor.log_stats("load");
        self.monitor.log_final_stats();

        Ok(RunSummary {
            output_path,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::aggregate;
    use crate::core::loader::default_profiles;
    use crate::domain::model::{BatchStats, Party, PredictionResult, ProfileBatch};
    use crate::utils::error::SimError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingPipeline {
        fail_extract: bool,
        stages: AtomicUsize,
    }

    #[async_trait]
    impl Pipeline for RecordingPipeline {
        async fn extract(&self) -> Result<ProfileBatch> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            if self.fail_extract {
                return Err(SimError::malformed_input("missing columns: STATE"));
            }
            Ok(default_profiles())
        }

        async fn transform(&self, batch: ProfileBatch) -> Result<SimulationReport> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            let predictions: Vec<PredictionResult> = batch
                .profiles
                .into_iter()
                .enumerate()
                .map(|(index, profile)| PredictionResult {
                    index,
                    profile,
                    predicted_party: Party::Republican,
                    raw_response: Some("Republican".to_string()),
                    provider_calls: 1,
                    failure: None,
                })
                .collect();
            Ok(SimulationReport {
                generated_at: chrono::Utc::now(),
                model: "gpt-test".to_string(),
                skipped_rows: batch.skipped,
                aggregation: aggregate(&predictions, None),
                stats: BatchStats {
                    profiles: predictions.len(),
                    resolved: predictions.len(),
                    ..BatchStats::default()
                },
                predictions,
                comparison: None,
                warnings: vec![],
            })
        }

        async fn load(&self, _report: &SimulationReport) -> Result<String> {
            self.stages.fetch_add(1, Ordering::SeqCst);
            Ok("out/simulation_output.zip".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_drives_all_stages() {
        let engine = SimulationEngine::new(RecordingPipeline::default());
        let summary = engine.run().await.unwrap();
        assert_eq!(summary.output_path, "out/simulation_output.zip");
        assert!(summary.report.has_resolved_predictions());
        assert_eq!(engine.pipeline.stages.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_run_stops_at_failed_extract() {
        let engine = SimulationEngine::new_with_monitoring(
            RecordingPipeline {
                fail_extract: true,
                ..RecordingPipeline::default()
            },
            true,
        );
        let err = engine.run().await.unwrap_err();
        assert!(matches!(err, SimError::MalformedInput { .. }));
        assert_eq!(engine.pipeline.stages.load(Ordering::SeqCst), 1);
    }
}
