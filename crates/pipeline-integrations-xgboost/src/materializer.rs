//! Booster materializer
//!
//! The booster only reads and writes local paths, so both directions stage
//! the model through a temporary file that is removed on every exit path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pipeline_integrations_core::{join_uri, ArtifactError, ArtifactStore, ArtifactType, Materializer};
use tempfile::TempDir;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::booster::{Booster, BoosterError};

/// File name of the serialized model inside the artifact directory
pub const DEFAULT_FILENAME: &str = "model.json";

const TEMP_DIR_PREFIX: &str = "zenml-temp-";

/// Errors from booster materialization
#[derive(Error, Debug)]
pub enum MaterializerError {
    #[error("Failed to create temporary staging file: {0}")]
    TempFile(#[from] std::io::Error),
    #[error("Staging path is not valid UTF-8: {}", .0.display())]
    InvalidPath(PathBuf),
    #[error(transparent)]
    Store(#[from] ArtifactError),
    #[error(transparent)]
    Booster(#[from] BoosterError),
}

/// Materializer for [`Booster`] models
pub struct XgboostBoosterMaterializer {
    store: Arc<dyn ArtifactStore>,
    temp_root: Option<PathBuf>,
}

impl XgboostBoosterMaterializer {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self {
            store,
            temp_root: None,
        }
    }

    /// Stage temporary files under `root` instead of the system temp dir
    pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.temp_root = Some(root.into());
        self
    }

    fn temp_dir(&self) -> std::io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX);
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }

    fn temp_file(&self) -> std::io::Result<tempfile::NamedTempFile> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(TEMP_DIR_PREFIX).suffix(".json");
        match &self.temp_root {
            Some(root) => builder.tempfile_in(root),
            None => builder.tempfile(),
        }
    }
}

fn path_str(path: &Path) -> Result<&str, MaterializerError> {
    path.to_str()
        .ok_or_else(|| MaterializerError::InvalidPath(path.to_path_buf()))
}

impl Materializer for XgboostBoosterMaterializer {
    type Item = Booster;
    type Error = MaterializerError;

    const ASSOCIATED_ARTIFACT_TYPE: ArtifactType = ArtifactType::Model;

    #[instrument(skip(self))]
    fn load(&self, uri: &str) -> Result<Booster, MaterializerError> {
        let filepath = join_uri(uri, DEFAULT_FILENAME);

        let temp_dir = self.temp_dir()?;
        let temp_file = temp_dir.path().join(DEFAULT_FILENAME);

        self.store.copy(&filepath, path_str(&temp_file)?, false)?;
        let booster = Booster::load_model(&temp_file)?;

        debug!(trees = booster.num_trees(), "Loaded booster from artifact store");
        Ok(booster)
    }

    #[instrument(skip(self, booster))]
    fn save(&self, booster: &Booster, uri: &str) -> Result<(), MaterializerError> {
        let filepath = join_uri(uri, DEFAULT_FILENAME);

        let temp_file = self.temp_file()?;
        booster.save_model(temp_file.path())?;
        self.store.copy(path_str(temp_file.path())?, &filepath, false)?;

        debug!(trees = booster.num_trees(), "Saved booster to artifact store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booster::RegTree;
    use pipeline_integrations_core::LocalArtifactStore;

    struct Fixture {
        store_root: TempDir,
        temp_root: TempDir,
        materializer: XgboostBoosterMaterializer,
    }

    fn fixture() -> Fixture {
        let store_root = tempfile::tempdir().unwrap();
        let temp_root = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalArtifactStore::new(store_root.path()));
        let materializer = XgboostBoosterMaterializer::new(store).with_temp_root(temp_root.path());
        Fixture {
            store_root,
            temp_root,
            materializer,
        }
    }

    fn staging_entries(fixture: &Fixture) -> usize {
        std::fs::read_dir(fixture.temp_root.path()).unwrap().count()
    }

    fn booster() -> Booster {
        Booster::new("binary:logistic", 0.3, 3)
            .with_tree(RegTree::stump(0, 0.5, -1.2, 0.8, true))
            .with_tree(RegTree::stump(2, 10.0, 0.4, -0.6, false))
    }

    #[test]
    fn test_save_then_load_predicts_identically() {
        let fixture = fixture();
        let original = booster();
        let rows = vec![
            vec![0.1, 7.0, 3.0],
            vec![0.9, -1.0, 42.0],
            vec![f32::NAN, 0.0, f32::NAN],
        ];

        fixture.materializer.save(&original, "artifacts/model").unwrap();
        assert!(fixture
            .store_root
            .path()
            .join("artifacts/model/model.json")
            .is_file());

        let loaded = fixture.materializer.load("artifacts/model").unwrap();
        assert_eq!(loaded.predict(&rows).unwrap(), original.predict(&rows).unwrap());
        assert_eq!(loaded, original);
        assert_eq!(staging_entries(&fixture), 0);
    }

    #[test]
    fn test_load_failure_still_removes_staging_dir() {
        let fixture = fixture();
        let dir = fixture.store_root.path().join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(DEFAULT_FILENAME), b"{ not json").unwrap();

        let err = fixture.materializer.load("broken").unwrap_err();
        assert!(matches!(err, MaterializerError::Booster(BoosterError::Format(_))));
        assert_eq!(staging_entries(&fixture), 0);
    }

    #[test]
    fn test_load_missing_artifact() {
        let fixture = fixture();
        let err = fixture.materializer.load("nothing-here").unwrap_err();
        assert!(matches!(
            err,
            MaterializerError::Store(ArtifactError::NotFound(_))
        ));
        assert_eq!(staging_entries(&fixture), 0);
    }

    #[test]
    fn test_save_does_not_overwrite_existing_model() {
        let fixture = fixture();
        fixture.materializer.save(&booster(), "model").unwrap();

        let err = fixture.materializer.save(&booster(), "model").unwrap_err();
        assert!(matches!(
            err,
            MaterializerError::Store(ArtifactError::AlreadyExists(_))
        ));
        assert_eq!(staging_entries(&fixture), 0);
    }

    #[test]
    fn test_associated_types() {
        let fixture = fixture();
        assert_eq!(
            XgboostBoosterMaterializer::ASSOCIATED_ARTIFACT_TYPE,
            ArtifactType::Model
        );
        assert!(fixture.materializer.associated_type().ends_with("Booster"));
    }
}
