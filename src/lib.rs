pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{
    engine::{RunSummary, SimulationEngine},
    pipeline::SimulationPipeline,
    predictor::{BatchPredictor, CancellationSignal, PredictorOptions},
    provider::{OpenAiProvider, ProviderSettings},
};
pub use utils::error::{Result, SimError};
