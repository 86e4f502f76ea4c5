//! Artifact registry
//!
//! Versioned, named artifacts with a JSON payload and free-form metadata.
//! Deployers use it to persist service handles so a later pipeline run can
//! find and manage the remote resource again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::artifact::{ArtifactVersion, SaveOptions, StoredArtifact};
use crate::error::{ArtifactError, ArtifactResult};

const ARTIFACT_FILE: &str = "artifact.json";

/// Trait for versioned artifact persistence
#[async_trait]
pub trait ArtifactRegistry: Send + Sync {
    /// Save a new artifact version
    async fn save_artifact(
        &self,
        name: &str,
        version: &str,
        payload: Value,
        options: SaveOptions,
    ) -> ArtifactResult<ArtifactVersion>;

    /// Merge metadata into an existing artifact version
    async fn log_artifact_metadata(
        &self,
        name: &str,
        version: &str,
        metadata: Map<String, Value>,
    ) -> ArtifactResult<()>;

    /// Load an artifact version with its payload and metadata
    async fn load_artifact(&self, name: &str, version: &str) -> ArtifactResult<StoredArtifact>;

    /// Metadata logged against an artifact version
    async fn get_metadata(&self, name: &str, version: &str) -> ArtifactResult<Map<String, Value>> {
        Ok(self.load_artifact(name, version).await?.metadata)
    }

    /// List all versions of an artifact, oldest first
    async fn list_versions(&self, name: &str) -> ArtifactResult<Vec<ArtifactVersion>>;
}

fn validate_segment(kind: &str, value: &str) -> ArtifactResult<()> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(ArtifactError::InvalidName(format!("{} '{}'", kind, value)));
    }
    Ok(())
}

fn new_version(name: &str, version: &str, options: SaveOptions) -> ArtifactVersion {
    ArtifactVersion {
        name: name.to_string(),
        version: version.to_string(),
        artifact_type: options.artifact_type,
        is_deployment_artifact: options.is_deployment_artifact,
        created_at: chrono::Utc::now(),
    }
}

/// In-process artifact registry
#[derive(Debug, Clone, Default)]
pub struct InMemoryArtifactRegistry {
    artifacts: Arc<tokio::sync::RwLock<HashMap<String, StoredArtifact>>>,
}

impl InMemoryArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(name: &str, version: &str) -> String {
        format!("{}@{}", name, version)
    }

    /// Number of stored artifact versions
    pub async fn len(&self) -> usize {
        self.artifacts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.artifacts.read().await.is_empty()
    }
}

#[async_trait]
impl ArtifactRegistry for InMemoryArtifactRegistry {
    #[instrument(skip(self, payload))]
    async fn save_artifact(
        &self,
        name: &str,
        version: &str,
        payload: Value,
        options: SaveOptions,
    ) -> ArtifactResult<ArtifactVersion> {
        validate_segment("name", name)?;
        validate_segment("version", version)?;

        let key = Self::key(name, version);
        let mut artifacts = self.artifacts.write().await;
        if artifacts.contains_key(&key) {
            return Err(ArtifactError::AlreadyExists(key));
        }

        let artifact_version = new_version(name, version, options);
        artifacts.insert(
            key,
            StoredArtifact {
                version: artifact_version.clone(),
                payload,
                metadata: Map::new(),
            },
        );

        debug!(artifact = %name, version = %version, "Saved artifact version");
        Ok(artifact_version)
    }

    #[instrument(skip(self, metadata))]
    async fn log_artifact_metadata(
        &self,
        name: &str,
        version: &str,
        metadata: Map<String, Value>,
    ) -> ArtifactResult<()> {
        let key = Self::key(name, version);
        let mut artifacts = self.artifacts.write().await;
        let stored = artifacts
            .get_mut(&key)
            .ok_or_else(|| ArtifactError::NotFound(key.clone()))?;
        stored.metadata.extend(metadata);
        Ok(())
    }

    async fn load_artifact(&self, name: &str, version: &str) -> ArtifactResult<StoredArtifact> {
        let key = Self::key(name, version);
        let artifacts = self.artifacts.read().await;
        artifacts
            .get(&key)
            .cloned()
            .ok_or(ArtifactError::NotFound(key))
    }

    async fn list_versions(&self, name: &str) -> ArtifactResult<Vec<ArtifactVersion>> {
        let artifacts = self.artifacts.read().await;
        let mut versions: Vec<ArtifactVersion> = artifacts
            .values()
            .filter(|a| a.version.name == name)
            .map(|a| a.version.clone())
            .collect();
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(versions)
    }
}

/// Artifact registry persisted as JSON files
///
/// Layout: `<root>/<name>/<version>/artifact.json`.
#[derive(Debug, Clone)]
pub struct FileArtifactRegistry {
    root: PathBuf,
}

impl FileArtifactRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_path(&self, name: &str, version: &str) -> PathBuf {
        self.root.join(name).join(version).join(ARTIFACT_FILE)
    }

    async fn read(&self, path: &Path) -> ArtifactResult<StoredArtifact> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ArtifactError::io(path, e))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn write(&self, path: &Path, artifact: &StoredArtifact) -> ArtifactResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ArtifactError::io(parent, e))?;
        }
        let bytes = serde_json::to_vec_pretty(artifact)?;
        tokio::fs::write(path, bytes)
            .await
            .map_err(|e| ArtifactError::io(path, e))
    }
}

#[async_trait]
impl ArtifactRegistry for FileArtifactRegistry {
    #[instrument(skip(self, payload))]
    async fn save_artifact(
        &self,
        name: &str,
        version: &str,
        payload: Value,
        options: SaveOptions,
    ) -> ArtifactResult<ArtifactVersion> {
        validate_segment("name", name)?;
        validate_segment("version", version)?;

        let path = self.artifact_path(name, version);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ArtifactError::AlreadyExists(format!("{}@{}", name, version)));
        }

        let artifact_version = new_version(name, version, options);
        let stored = StoredArtifact {
            version: artifact_version.clone(),
            payload,
            metadata: Map::new(),
        };
        self.write(&path, &stored).await?;

        debug!(
            artifact = %name,
            version = %version,
            path = %path.display(),
            "Saved artifact version"
        );
        Ok(artifact_version)
    }

    #[instrument(skip(self, metadata))]
    async fn log_artifact_metadata(
        &self,
        name: &str,
        version: &str,
        metadata: Map<String, Value>,
    ) -> ArtifactResult<()> {
        validate_segment("name", name)?;
        validate_segment("version", version)?;

        let path = self.artifact_path(name, version);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ArtifactError::NotFound(format!("{}@{}", name, version)));
        }

        let mut stored = self.read(&path).await?;
        stored.metadata.extend(metadata);
        self.write(&path, &stored).await
    }

    async fn load_artifact(&self, name: &str, version: &str) -> ArtifactResult<StoredArtifact> {
        validate_segment("name", name)?;
        validate_segment("version", version)?;

        let path = self.artifact_path(name, version);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(ArtifactError::NotFound(format!("{}@{}", name, version)));
        }
        self.read(&path).await
    }

    async fn list_versions(&self, name: &str) -> ArtifactResult<Vec<ArtifactVersion>> {
        validate_segment("name", name)?;

        let dir = self.root.join(name);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(ArtifactError::io(&dir, e)),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ArtifactError::io(&dir, e))?
        {
            let path = entry.path().join(ARTIFACT_FILE);
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                versions.push(self.read(&path).await?.version);
            }
        }
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(versions)
    }
}
