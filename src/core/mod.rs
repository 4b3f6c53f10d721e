pub mod aggregator;
pub mod comparison;
pub mod engine;
pub mod export;
pub mod loader;
pub mod parser;
pub mod pipeline;
pub mod predictor;
pub mod prompt;
pub mod provider;
pub mod report;

pub use crate::domain::model::{ProfileBatch, SimulationReport};
pub use crate::domain::ports::{CompletionProvider, ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
