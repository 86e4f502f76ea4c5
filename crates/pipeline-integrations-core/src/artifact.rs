//! Artifact descriptors shared by stores, registries and materializers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of data an artifact holds (mirrors the framework's artifact types)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactType {
    #[default]
    Data,
    Model,
    Service,
    Schema,
    Statistics,
}

/// Options applied when an artifact version is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SaveOptions {
    /// Artifact type recorded with the version
    pub artifact_type: ArtifactType,
    /// Whether the artifact describes a model deployment
    pub is_deployment_artifact: bool,
}

impl SaveOptions {
    /// Options for a deployment (service) artifact
    pub fn deployment() -> Self {
        Self {
            artifact_type: ArtifactType::Service,
            is_deployment_artifact: true,
        }
    }

    pub fn with_type(mut self, artifact_type: ArtifactType) -> Self {
        self.artifact_type = artifact_type;
        self
    }
}

/// A single version of a named artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    /// Artifact name
    pub name: String,
    /// Version label
    pub version: String,
    /// Artifact type
    pub artifact_type: ArtifactType,
    /// Whether this version belongs to a model deployment
    #[serde(default)]
    pub is_deployment_artifact: bool,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A saved artifact version with its payload and logged metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub version: ArtifactVersion,
    pub payload: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}
