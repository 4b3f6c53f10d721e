use crate::core::aggregator::{aggregate, coverage_warning};
use crate::core::comparison::{build_comparison_report, load_electoral_votes, load_historical};
use crate::core::export::{write_report, ZIP_FILE_NAME};
use crate::core::loader::{default_profiles, load_profiles_from_path};
use crate::core::predictor::{BatchPredictor, PredictionJob};
use crate::core::prompt::BallotTemplate;
use crate::domain::historical::HistoricalResults;
use crate::domain::model::{ProfileBatch, SimulationReport};
use crate::domain::outcome::ElectoralVotes;
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::{Result, SimError};

/// Load profiles, predict each vote, aggregate by state and export.
pub struct SimulationPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    predictor: BatchPredictor,
    template: BallotTemplate,
    historical: Option<HistoricalResults>,
    electoral_votes: Option<ElectoralVotes>,
}

impl<S: Storage, C: ConfigProvider> SimulationPipeline<S, C> {
    pub fn new(storage: S, config: C, predictor: BatchPredictor) -> Self {
        Self {
            storage,
            config,
            predictor,
            template: BallotTemplate::default(),
            historical: None,
            electoral_votes: None,
        }
    }

    pub fn with_template(mut self, template: BallotTemplate) -> Self {
        self.template = template;
        self
    }

    pub fn with_historical(mut self, historical: HistoricalResults) -> Self {
        self.historical = Some(historical);
        self
    }

    pub fn with_electoral_votes(mut self, electoral_votes: ElectoralVotes) -> Self {
        self.electoral_votes = Some(electoral_votes);
        self
    }

    /// Reads the historical results and elector weights the config names.
    pub fn with_reference_data(self) -> Result<Self> {
        let historical_path = self.config.historical_path().map(str::to_owned);
        let electoral_votes_path = self.config.electoral_votes_path().map(str::to_owned);

        let mut pipeline = self;
        if let Some(path) = historical_path {
            tracing::info!("📜 Loading historical results from {}", path);
            pipeline = pipeline.with_historical(load_historical(&path)?);
        }
        if let Some(path) = electoral_votes_path {
            tracing::info!("⚖️ Loading electoral votes from {}", path);
            pipeline = pipeline.with_electoral_votes(load_electoral_votes(&path)?);
        }
        Ok(pipeline)
    }

    fn build_jobs(&self, batch: &ProfileBatch) -> Vec<PredictionJob> {
        batch
            .profiles
            .iter()
            .enumerate()
            .map(|(index, profile)| {
                let leaning = self
                    .historical
                    .as_ref()
                    .and_then(|historical| historical.block(profile.state));
                PredictionJob {
                    index,
                    profile: profile.clone(),
                    prompt: self.template.render(profile, leaning),
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for SimulationPipeline<S, C> {
    async fn extract(&self) -> Result<ProfileBatch> {
        match self.config.input_path() {
            Some(path) => load_profiles_from_path(path),
            None => {
                tracing::warn!("No input file configured, using the built-in sample profiles");
                Ok(default_profiles())
            }
        }
    }

    async fn transform(&self, batch: ProfileBatch) -> Result<SimulationReport> {
        let jobs = self.build_jobs(&batch);
        let outcome = self.predictor.predict_all(jobs).await;

        if let Some(reason) = outcome.unreachable_reason() {
            return Err(SimError::ProviderUnavailable {
                attempted: outcome.stats.profiles - outcome.stats.cancelled,
                reason,
            });
        }

        let aggregation = aggregate(&outcome.results, self.electoral_votes.as_ref());

        let mut warnings = Vec::new();
        if let Some(warning) =
            coverage_warning(&aggregation.coverage, self.config.coverage_threshold())
        {
            tracing::warn!("⚠️ {}", warning);
            warnings.push(warning);
        }

        let comparison = self.historical.as_ref().map(|historical| {
            build_comparison_report(
                &aggregation.tallies,
                historical,
                self.config.simulation_weight(),
            )
        });

        tracing::info!(
            "🏛️ National outcome: {} ({} decisive, {} contested state(s))",
            aggregation.outcome.national_winner,
            aggregation.outcome.decisive_states,
            aggregation.outcome.contested_states
        );

        Ok(SimulationReport {
            generated_at: chrono::Utc::now(),
            model: self.predictor.options().model.clone(),
            skipped_rows: batch.skipped,
            predictions: outcome.results,
            stats: outcome.stats,
            aggregation,
            comparison,
            warnings,
        })
    }

    async fn load(&self, report: &SimulationReport) -> Result<String> {
        let compress = self.config.compress_output();
        let written = write_report(
            &self.storage,
            report,
            self.config.output_formats(),
            compress,
        )
        .await?;
        tracing::debug!("Wrote {}", written.join(", "));

        let output_path = if compress {
            format!("{}/{}", self.config.output_path(), ZIP_FILE_NAME)
        } else {
            self.config.output_path().to_string()
        };
        Ok(output_path)
    }
}
