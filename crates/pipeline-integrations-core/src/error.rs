//! Errors raised by artifact stores and registries

use std::path::PathBuf;
use thiserror::Error;

/// Errors from artifact store and registry operations
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("Artifact not found: {0}")]
    NotFound(String),
    #[error("Artifact already exists: {0}")]
    AlreadyExists(String),
    #[error("Invalid artifact URI: {0}")]
    InvalidUri(String),
    #[error("Invalid artifact name or version: {0}")]
    InvalidName(String),
    #[error("Artifact I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Artifact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ArtifactError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for artifact operations
pub type ArtifactResult<T> = Result<T, ArtifactError>;
