//! Error types for the CLI

use std::path::PathBuf;

use trellis_common::telemetry::TelemetryError;
use trellis_deployment::DeploymentError;
use trellis_workload::WorkloadError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Chart(#[from] trellis_common::Error),

    #[error(transparent)]
    Workload(#[from] WorkloadError),

    #[error(transparent)]
    Deployment(#[from] DeploymentError),

    #[error(transparent)]
    Telemetry(#[from] TelemetryError),

    #[error("failed to read app file {path}: {source}")]
    AppFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid app file: {message}")]
    Config { message: String },
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }
}
