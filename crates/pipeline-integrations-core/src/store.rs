//! Artifact stores
//!
//! Materializers never touch storage paths directly; they go through an
//! [`ArtifactStore`] so the same adapter works against any backend the
//! framework is configured with. [`LocalArtifactStore`] covers plain paths,
//! paths relative to a store root and `file://` URIs.

use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use url::Url;

use crate::error::{ArtifactError, ArtifactResult};

/// Storage backend addressed by URI
pub trait ArtifactStore: Send + Sync {
    /// Copy a single file between two URIs
    ///
    /// Fails with [`ArtifactError::AlreadyExists`] when `dst` exists and
    /// `overwrite` is false.
    fn copy(&self, src: &str, dst: &str, overwrite: bool) -> ArtifactResult<()>;

    /// Check whether a URI exists
    fn exists(&self, uri: &str) -> ArtifactResult<bool>;

    /// Create a directory URI and all of its parents
    fn makedirs(&self, uri: &str) -> ArtifactResult<()>;
}

/// Join a file name onto an artifact URI
pub fn join_uri(base: &str, name: &str) -> String {
    if base.is_empty() {
        name.to_string()
    } else if base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}/{}", base, name)
    }
}

/// Artifact store backed by the local filesystem
#[derive(Debug, Clone)]
pub struct LocalArtifactStore {
    root: PathBuf,
}

impl LocalArtifactStore {
    /// Create a store whose relative URIs resolve under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a URI to a local filesystem path
    pub fn resolve(&self, uri: &str) -> ArtifactResult<PathBuf> {
        if uri.is_empty() {
            return Err(ArtifactError::InvalidUri("empty URI".to_string()));
        }

        if uri.starts_with("file://") {
            let url = Url::parse(uri)
                .map_err(|e| ArtifactError::InvalidUri(format!("{}: {}", uri, e)))?;
            return url
                .to_file_path()
                .map_err(|_| ArtifactError::InvalidUri(uri.to_string()));
        }

        if uri.contains("://") {
            return Err(ArtifactError::InvalidUri(format!(
                "unsupported scheme for local store: {}",
                uri
            )));
        }

        let path = Path::new(uri);
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(self.root.join(path))
        }
    }
}

impl ArtifactStore for LocalArtifactStore {
    #[instrument(skip(self))]
    fn copy(&self, src: &str, dst: &str, overwrite: bool) -> ArtifactResult<()> {
        let src_path = self.resolve(src)?;
        let dst_path = self.resolve(dst)?;

        if !src_path.is_file() {
            return Err(ArtifactError::NotFound(src.to_string()));
        }
        if dst_path.exists() && !overwrite {
            return Err(ArtifactError::AlreadyExists(dst.to_string()));
        }
        if let Some(parent) = dst_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(parent, e))?;
        }

        let bytes = std::fs::copy(&src_path, &dst_path)
            .map_err(|e| ArtifactError::io(&dst_path, e))?;

        debug!(
            src = %src_path.display(),
            dst = %dst_path.display(),
            bytes,
            "Copied artifact file"
        );

        Ok(())
    }

    fn exists(&self, uri: &str) -> ArtifactResult<bool> {
        Ok(self.resolve(uri)?.exists())
    }

    fn makedirs(&self, uri: &str) -> ArtifactResult<()> {
        let path = self.resolve(uri)?;
        std::fs::create_dir_all(&path).map_err(|e| ArtifactError::io(&path, e))
    }
}
