//! Error types for the client binary.

use crate::config::ConfigError;
use agrisense_core::{RemoteError, ValidationError};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Telemetry error: {0}")]
    Telemetry(String),
    #[error("{0}")]
    Mutation(#[from] crate::mutations::MutationError),
}
