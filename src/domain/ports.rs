use crate::domain::model::{ProfileBatch, SimulationReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Run settings shared by the CLI flags and the TOML file.
pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> Option<&str>;
    fn output_path(&self) -> &str;
    fn model(&self) -> &str;
    fn concurrency(&self) -> usize;
    fn repetitions(&self) -> u32;
    fn coverage_threshold(&self) -> f64;
    fn historical_path(&self) -> Option<&str>;
    fn electoral_votes_path(&self) -> Option<&str>;
    fn simulation_weight(&self) -> f64;
    fn output_formats(&self) -> &[String];
    fn compress_output(&self) -> bool;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ProfileBatch>;
    async fn transform(&self, batch: ProfileBatch) -> Result<SimulationReport>;
    async fn load(&self, report: &SimulationReport) -> Result<String>;
}

/// Why a single provider call produced no usable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    Timeout(Duration),
    Connect(String),
    Unauthorized(u16),
    Status(u16),
    Rejected(u16),
    InvalidResponse(String),
    Transport(String),
}

impl ProviderFailure {
    /// Worth another attempt after backing off.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderFailure::Timeout(_)
                | ProviderFailure::Connect(_)
                | ProviderFailure::Status(_)
                | ProviderFailure::Transport(_)
        )
    }

    /// Points at the provider being unreachable for everyone, not just this call.
    pub fn is_systemic(&self) -> bool {
        matches!(
            self,
            ProviderFailure::Connect(_) | ProviderFailure::Unauthorized(_)
        )
    }
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderFailure::Timeout(after) => write!(f, "timed out after {:?}", after),
            ProviderFailure::Connect(msg) => write!(f, "connection failed: {}", msg),
            ProviderFailure::Unauthorized(status) => {
                write!(f, "credentials rejected (HTTP {})", status)
            }
            ProviderFailure::Status(status) => write!(f, "server returned HTTP {}", status),
            ProviderFailure::Rejected(status) => write!(f, "request rejected (HTTP {})", status),
            ProviderFailure::InvalidResponse(msg) => write!(f, "unreadable response: {}", msg),
            ProviderFailure::Transport(msg) => write!(f, "transport error: {}", msg),
        }
    }
}

impl std::error::Error for ProviderFailure {}

/// Single-turn text completion against an external model.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, model: &str)
        -> std::result::Result<String, ProviderFailure>;
}

