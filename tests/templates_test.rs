use anyhow::Result;
use election_sim::core::comparison::{load_electoral_votes, load_historical};
use election_sim::core::loader::{load_profiles_from_path, load_profiles_from_reader, write_profiles_csv};
use election_sim::core::ConfigProvider;
use election_sim::domain::state::UsState;
use election_sim::utils::validation::Validate;
use election_sim::TomlConfig;
use std::path::{Path, PathBuf};

fn repo_file(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(relative)
}

#[test]
fn test_profile_template_round_trips() -> Result<()> {
    let loaded = load_profiles_from_path(repo_file("templates/voter_profiles_template.csv"))?;
    assert_eq!(loaded.len(), 10);
    assert!(loaded.skipped.is_empty());

    let written = write_profiles_csv(&loaded.profiles)?;
    assert!(written.starts_with(
        "AGE,GENDER,STATE,EDUCATION_LEVEL,MARITAL_STATUS,OCCUPATION_DESCRIPTION,INCOME_LEVEL"
    ));

    let reloaded = load_profiles_from_reader(written.as_bytes())?;
    assert_eq!(reloaded.profiles, loaded.profiles);
    Ok(())
}

#[test]
fn test_reference_templates_load() -> Result<()> {
    let historical = load_historical(repo_file("templates/historical_2020.csv"))?;
    assert_eq!(historical.len(), 10);
    assert_eq!(historical.block(UsState::Arizona), Some("swing state"));

    let votes = load_electoral_votes(repo_file("templates/electoral_votes.csv"))?;
    assert_eq!(votes.len(), 51);
    assert_eq!(votes.total(), 538);
    assert_eq!(votes.get(UsState::DistrictOfColumbia), Some(3));
    Ok(())
}

#[test]
fn test_sample_toml_config_is_valid() -> Result<()> {
    let config = TomlConfig::from_file(repo_file("election-sim.toml"))?;
    config.validate()?;
    assert_eq!(config.provider.api_key_env, "OPENAI_API_KEY");
    assert_eq!(
        config.input_path(),
        Some("templates/voter_profiles_template.csv")
    );
    assert!(config.compress_output());
    Ok(())
}
