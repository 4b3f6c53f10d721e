use crate::core::comparison::DEFAULT_SIMULATION_WEIGHT;
use crate::core::predictor::PredictorOptions;
use crate::core::prompt::BallotTemplate;
use crate::core::provider::{ProviderSettings, DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{Result, SimError};
use crate::utils::retry::RetryPolicy;
use crate::utils::validation::{
    validate_input_file, validate_non_empty_string, validate_output_formats, validate_path,
    validate_positive_number, validate_range, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub simulation: SimulationSection,
    pub provider: ProviderSection,
    pub ballot: BallotTemplate,
    pub input: InputSection,
    pub output: OutputSection,
    pub monitoring: MonitoringSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSection {
    pub model: String,
    pub concurrency: usize,
    pub repetitions: u32,
    pub coverage_threshold: f64,
    pub simulation_weight: f64,
}

impl Default for SimulationSection {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            concurrency: 5,
            repetitions: 1,
            coverage_threshold: 0.2,
            simulation_weight: DEFAULT_SIMULATION_WEIGHT,
        }
    }
}

/// Connection settings. The key itself is never stored here, only the
/// name of the environment variable that holds it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSection {
    pub base_url: String,
    pub api_key_env: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub retry_max_delay_ms: u64,
    pub request_interval_ms: u64,
}

impl Default for ProviderSection {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            temperature: 1.0,
            timeout_seconds: 30,
            max_attempts: retry.max_attempts,
            retry_base_delay_ms: retry.base_delay.as_millis() as u64,
            retry_max_delay_ms: retry.max_delay.as_millis() as u64,
            request_interval_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSection {
    pub profiles: Option<String>,
    pub historical: Option<String>,
    pub electoral_votes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSection {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compress: bool,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            output_formats: vec!["csv".to_string(), "json".to_string()],
            compress: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSection {
    pub enabled: bool,
}

fn env_var_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"))
}

impl TomlConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| SimError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the variable's value; unset variables stay as written.
    fn substitute_env_vars(content: &str) -> String {
        env_var_pattern()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.enabled
    }

    /// Provider settings with the API key read from `provider.api_key_env`.
    pub fn provider_settings(&self) -> Result<ProviderSettings> {
        let mut settings = ProviderSettings::from_env(&self.provider.api_key_env)?;
        settings.base_url = self.provider.base_url.clone();
        settings.temperature = self.provider.temperature;
        settings.request_timeout = Duration::from_secs(self.provider.timeout_seconds);
        Ok(settings)
    }

    pub fn predictor_options(&self) -> PredictorOptions {
        PredictorOptions {
            model: self.simulation.model.clone(),
            concurrency: self.simulation.concurrency,
            repetitions: self.simulation.repetitions,
            retry: self.retry_policy(),
            request_timeout: Duration::from_secs(self.provider.timeout_seconds),
            request_interval: Duration::from_millis(self.provider.request_interval_ms),
        }
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.provider.max_attempts,
            base_delay: Duration::from_millis(self.provider.retry_base_delay_ms),
            max_delay: Duration::from_millis(self.provider.retry_max_delay_ms),
        }
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> Option<&str> {
        self.input.profiles.as_deref()
    }

    fn output_path(&self) -> &str {
        &self.output.output_path
    }

    fn model(&self) -> &str {
        &self.simulation.model
    }

    fn concurrency(&self) -> usize {
        self.simulation.concurrency
    }

    fn repetitions(&self) -> u32 {
        self.simulation.repetitions
    }

    fn coverage_threshold(&self) -> f64 {
        self.simulation.coverage_threshold
    }

    fn historical_path(&self) -> Option<&str> {
        self.input.historical.as_deref()
    }

    fn electoral_votes_path(&self) -> Option<&str> {
        self.input.electoral_votes.as_deref()
    }

    fn simulation_weight(&self) -> f64 {
        self.simulation.simulation_weight
    }

    fn output_formats(&self) -> &[String] {
        &self.output.output_formats
    }

    fn compress_output(&self) -> bool {
        self.output.compress
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("simulation.model", &self.simulation.model)?;
        validate_positive_number("simulation.concurrency", self.simulation.concurrency, 1)?;
        validate_range("simulation.repetitions", self.simulation.repetitions, 1, 15)?;
        validate_range(
            "simulation.coverage_threshold",
            self.simulation.coverage_threshold,
            0.0,
            1.0,
        )?;
        validate_range(
            "simulation.simulation_weight",
            self.simulation.simulation_weight,
            0.0,
            1.0,
        )?;

        validate_url("provider.base_url", &self.provider.base_url)?;
        validate_non_empty_string("provider.api_key_env", &self.provider.api_key_env)?;
        validate_range("provider.temperature", self.provider.temperature, 0.0, 2.0)?;
        validate_range("provider.timeout_seconds", self.provider.timeout_seconds, 1, 600)?;
        validate_range("provider.max_attempts", self.provider.max_attempts, 1, 10)?;
        if self.provider.retry_base_delay_ms > self.provider.retry_max_delay_ms {
            return Err(SimError::InvalidConfigValueError {
                field: "provider.retry_base_delay_ms".to_string(),
                value: self.provider.retry_base_delay_ms.to_string(),
                reason: "Must not exceed provider.retry_max_delay_ms".to_string(),
            });
        }

        validate_non_empty_string("ballot.democratic_ticket", &self.ballot.democratic_ticket)?;
        validate_non_empty_string("ballot.republican_ticket", &self.ballot.republican_ticket)?;

        validate_input_file("input.profiles", self.input.profiles.as_deref(), &["csv"])?;
        validate_input_file("input.historical", self.input.historical.as_deref(), &["csv"])?;
        validate_input_file(
            "input.electoral_votes",
            self.input.electoral_votes.as_deref(),
            &["csv"],
        )?;

        validate_path("output.output_path", &self.output.output_path)?;
        validate_output_formats("output.output_formats", &self.output.output_formats)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[simulation]
model = "gpt-4o-mini"
concurrency = 8
repetitions = 3
coverage_threshold = 0.3
simulation_weight = 0.7

[provider]
base_url = "http://localhost:8080/v1"
api_key_env = "MY_PROVIDER_KEY"
timeout_seconds = 12
max_attempts = 4
request_interval_ms = 100

[ballot]
election_year = 2028
democratic_ticket = "Alice Example / Bob Example"
republican_ticket = "Carol Example / Dan Example"

[input]
profiles = "templates/voter_profiles_template.csv"
historical = "templates/historical_2020.csv"

[output]
output_path = "./sim-output"
output_formats = ["json"]
compress = false

[monitoring]
enabled = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.concurrency(), 8);
        assert_eq!(config.ballot.election_year, 2028);
        assert_eq!(
            config.input_path(),
            Some("templates/voter_profiles_template.csv")
        );
        assert_eq!(config.electoral_votes_path(), None);
        assert!(!config.compress_output());
        assert!(config.monitoring_enabled());

        let options = config.predictor_options();
        assert_eq!(options.repetitions, 3);
        assert_eq!(options.retry.max_attempts, 4);
        assert_eq!(options.request_timeout, Duration::from_secs(12));
        assert_eq!(options.request_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.provider.api_key_env, DEFAULT_API_KEY_ENV);
        assert_eq!(config.ballot, BallotTemplate::default());
        assert!(config.compress_output());
        assert_eq!(config.input_path(), None);
        assert_eq!(config.simulation_weight(), DEFAULT_SIMULATION_WEIGHT);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("ELECTION_SIM_TEST_PROFILES", "data/profiles.csv");

        let toml_content = r#"
[input]
profiles = "${ELECTION_SIM_TEST_PROFILES}"
historical = "${ELECTION_SIM_TEST_NOT_SET}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.input_path(), Some("data/profiles.csv"));
        assert_eq!(
            config.historical_path(),
            Some("${ELECTION_SIM_TEST_NOT_SET}")
        );

        std::env::remove_var("ELECTION_SIM_TEST_PROFILES");
    }

    #[test]
    fn test_config_validation() {
        let bad_url = "[provider]\nbase_url = \"invalid-url\"\n";
        assert!(TomlConfig::from_toml_str(bad_url)
            .unwrap()
            .validate()
            .is_err());

        let bad_weight = "[simulation]\nsimulation_weight = 1.5\n";
        assert!(TomlConfig::from_toml_str(bad_weight)
            .unwrap()
            .validate()
            .is_err());

        let bad_format = "[output]\noutput_formats = [\"tsv\"]\n";
        assert!(TomlConfig::from_toml_str(bad_format)
            .unwrap()
            .validate()
            .is_err());

        assert!(TomlConfig::from_toml_str("[simulation\n").is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[simulation]\nmodel = \"file-model\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.model(), "file-model");
    }
}
