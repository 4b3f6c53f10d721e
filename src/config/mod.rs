pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use self::args::CliConfig;

#[cfg(feature = "cli")]
mod args {
    use crate::core::comparison::DEFAULT_SIMULATION_WEIGHT;
    use crate::core::predictor::PredictorOptions;
    use crate::core::provider::{
        ProviderSettings, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL,
    };
    use crate::domain::ports::ConfigProvider;
    use crate::utils::error::Result;
    use crate::utils::retry::RetryPolicy;
    use crate::utils::validation::{
        validate_input_file, validate_non_empty_string, validate_output_formats, validate_path,
        validate_positive_number, validate_range, validate_url, Validate,
    };
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::time::Duration;

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "election-sim")]
    #[command(about = "Simulate a U.S. presidential election by asking an LLM how synthetic voters would vote")]
    pub struct CliConfig {
        /// Voter profile CSV; the built-in sample is used when omitted
        #[arg(long)]
        pub input: Option<String>,

        #[arg(long, env = "ELECTION_SIM_MODEL", default_value = DEFAULT_MODEL)]
        pub model: String,

        /// Maximum number of profiles predicted at once
        #[arg(long, default_value = "5")]
        pub concurrency: usize,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        /// Independent predictions per profile, majority-voted
        #[arg(long, default_value = "1")]
        pub repetitions: u32,

        #[arg(long, default_value = "3")]
        pub max_attempts: u32,

        #[arg(long, default_value = "30")]
        pub timeout_secs: u64,

        /// Minimum delay between request starts, 0 disables throttling
        #[arg(long, default_value = "0")]
        pub request_interval_ms: u64,

        /// Unknown share above which a coverage warning is issued
        #[arg(long, default_value = "0.2")]
        pub coverage_threshold: f64,

        /// Past results CSV (STATE,DEMOCRAT_PERCENT,REPUBLICAN_PERCENT,WINNER,BLOCK)
        #[arg(long)]
        pub historical: Option<String>,

        /// Elector weights CSV (STATE,ELECTORAL_VOTES)
        #[arg(long)]
        pub electoral_votes: Option<String>,

        /// Weight of the simulation when blending with past results
        #[arg(long, default_value_t = DEFAULT_SIMULATION_WEIGHT)]
        pub simulation_weight: f64,

        #[arg(long, default_value = DEFAULT_BASE_URL)]
        pub base_url: String,

        /// Environment variable holding the provider API key
        #[arg(long, default_value = DEFAULT_API_KEY_ENV)]
        pub api_key_env: String,

        #[arg(long, value_delimiter = ',', default_value = "csv,json")]
        pub output_formats: Vec<String>,

        /// Write files individually instead of a zip bundle
        #[arg(long)]
        pub no_compress: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON lines")]
        pub json_logs: bool,

        #[arg(long, help = "Log process CPU and memory between stages")]
        pub monitor: bool,
    }

    impl CliConfig {
        /// Provider settings with the API key read from `--api-key-env`.
        pub fn provider_settings(&self) -> Result<ProviderSettings> {
            let mut settings = ProviderSettings::from_env(&self.api_key_env)?;
            settings.base_url = self.base_url.clone();
            settings.request_timeout = Duration::from_secs(self.timeout_secs);
            Ok(settings)
        }

        pub fn predictor_options(&self) -> PredictorOptions {
            PredictorOptions {
                model: self.model.clone(),
                concurrency: self.concurrency,
                repetitions: self.repetitions,
                retry: self.retry_policy(),
                request_timeout: Duration::from_secs(self.timeout_secs),
                request_interval: Duration::from_millis(self.request_interval_ms),
            }
        }

        fn retry_policy(&self) -> RetryPolicy {
            RetryPolicy {
                max_attempts: self.max_attempts,
                ..RetryPolicy::default()
            }
        }
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> Option<&str> {
            self.input.as_deref()
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn model(&self) -> &str {
            &self.model
        }

        fn concurrency(&self) -> usize {
            self.concurrency
        }

        fn repetitions(&self) -> u32 {
            self.repetitions
        }

        fn coverage_threshold(&self) -> f64 {
            self.coverage_threshold
        }

        fn historical_path(&self) -> Option<&str> {
            self.historical.as_deref()
        }

        fn electoral_votes_path(&self) -> Option<&str> {
            self.electoral_votes.as_deref()
        }

        fn simulation_weight(&self) -> f64 {
            self.simulation_weight
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn compress_output(&self) -> bool {
            !self.no_compress
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_input_file("input", self.input.as_deref(), &["csv"])?;
            validate_input_file("historical", self.historical.as_deref(), &["csv"])?;
            validate_input_file("electoral_votes", self.electoral_votes.as_deref(), &["csv"])?;
            validate_path("output_path", &self.output_path)?;
            validate_non_empty_string("model", &self.model)?;
            validate_non_empty_string("api_key_env", &self.api_key_env)?;
            validate_url("base_url", &self.base_url)?;
            validate_positive_number("concurrency", self.concurrency, 1)?;
            validate_range("repetitions", self.repetitions, 1, 15)?;
            validate_range("max_attempts", self.max_attempts, 1, 10)?;
            validate_range("timeout_secs", self.timeout_secs, 1, 600)?;
            validate_range("coverage_threshold", self.coverage_threshold, 0.0, 1.0)?;
            validate_range("simulation_weight", self.simulation_weight, 0.0, 1.0)?;
            validate_output_formats("output_formats", &self.output_formats)?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn parse(args: &[&str]) -> CliConfig {
            CliConfig::try_parse_from(std::iter::once("election-sim").chain(args.iter().copied()))
                .unwrap()
        }

        #[test]
        fn test_defaults_are_valid() {
            let config = parse(&[]);
            assert!(config.validate().is_ok());
            assert_eq!(config.input_path(), None);
            assert_eq!(config.concurrency(), 5);
            assert_eq!(config.repetitions(), 1);
            assert!(config.compress_output());
            assert_eq!(config.output_formats().to_vec(), vec!["csv", "json"]);
            assert_eq!(config.api_key_env, DEFAULT_API_KEY_ENV);
            assert_eq!(config.simulation_weight(), DEFAULT_SIMULATION_WEIGHT);
        }

        #[test]
        fn test_flags_flow_into_predictor_options() {
            let config = parse(&[
                "--input",
                "profiles.csv",
                "--model",
                "gpt-4o-mini",
                "--concurrency",
                "12",
                "--repetitions",
                "3",
                "--max-attempts",
                "5",
                "--timeout-secs",
                "10",
                "--request-interval-ms",
                "250",
                "--no-compress",
            ]);
            let options = config.predictor_options();
            assert_eq!(options.model, "gpt-4o-mini");
            assert_eq!(options.concurrency, 12);
            assert_eq!(options.repetitions, 3);
            assert_eq!(options.retry.max_attempts, 5);
            assert_eq!(options.request_timeout, Duration::from_secs(10));
            assert_eq!(options.request_interval, Duration::from_millis(250));
            assert!(!config.compress_output());
            assert_eq!(config.input_path(), Some("profiles.csv"));
        }

        #[test]
        fn test_validation_rejects_bad_values() {
            assert!(parse(&["--concurrency", "0"]).validate().is_err());
            assert!(parse(&["--coverage-threshold", "1.5"]).validate().is_err());
            assert!(parse(&["--simulation-weight", "1.2"]).validate().is_err());
            assert!(parse(&["--input", "profiles.xlsx"]).validate().is_err());
            assert!(parse(&["--base-url", "ftp://example.com"]).validate().is_err());
            assert!(parse(&["--output-formats", "xml"]).validate().is_err());
        }

        #[test]
        fn test_retry_and_throttle_live_in_predictor_options() {
            std::env::set_var("ELECTION_SIM_CLI_TEST_KEY", "cli-test-key");
            let config = parse(&[
                "--api-key-env",
                "ELECTION_SIM_CLI_TEST_KEY",
                "--max-attempts",
                "7",
                "--request-interval-ms",
                "40",
                "--timeout-secs",
                "9",
            ]);

            let settings = config.provider_settings().unwrap();
            let options = config.predictor_options();
            assert_eq!(settings.request_timeout, options.request_timeout);
            assert_eq!(options.retry.max_attempts, 7);
            assert_eq!(options.request_interval, Duration::from_millis(40));
            assert!(settings.validate().is_ok());

            std::env::remove_var("ELECTION_SIM_CLI_TEST_KEY");
        }

        #[test]
        fn test_provider_settings_need_key_variable() {
            let config = parse(&["--api-key-env", "ELECTION_SIM_CLI_TEST_UNSET"]);
            assert!(config.provider_settings().is_err());
        }
    }
}
