//! Errors from the Hugging Face deployer

use std::time::Duration;

use pipeline_integrations_core::ArtifactError;
use thiserror::Error;

/// Errors from deployer, endpoint client and service operations
#[derive(Error, Debug)]
pub enum DeployerError {
    #[error("Invalid deployer configuration: {0}")]
    Config(String),
    #[error("Inference endpoint not found: {0}")]
    NotFound(String),
    #[error("Hosting API request failed with status {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Inference endpoint {endpoint} failed: {message}")]
    EndpointFailed { endpoint: String, message: String },
    #[error("Timed out after {timeout:?} waiting for inference endpoint {endpoint}")]
    Timeout { endpoint: String, timeout: Duration },
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<config::ConfigError> for DeployerError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for deployer operations
pub type DeployerResult<T> = Result<T, DeployerError>;
