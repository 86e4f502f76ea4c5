//! Directory datasource
//!
//! Copies a directory of serialized training records (e.g. TFRecord files)
//! into the pipeline output path. Records are treated as opaque bytes; the
//! optional schema is carried as metadata and never checked against the
//! files.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use pipeline_integrations_core::Datasource;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Errors from datasource processing
#[derive(Error, Debug)]
pub enum DatasourceError {
    #[error("Invalid datasource: {0}")]
    Invalid(String),
    #[error("Source directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    #[error("Output path {} lies inside source directory {}", output.display(), source_dir.display())]
    OutputInsideSource { output: PathBuf, source_dir: PathBuf },
    #[error("I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to walk source directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Result type for datasource operations
pub type DatasourceResult<T> = Result<T, DatasourceError>;

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> DatasourceError + '_ {
    move |source| DatasourceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Persistable description of a [`DirectoryDatasource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectoryDatasourceConfig {
    pub name: String,
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<BTreeMap<String, String>>,
}

/// Datasource backed by a directory of record files
#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryDatasource {
    name: String,
    path: PathBuf,
    schema: Option<BTreeMap<String, String>>,
}

impl DirectoryDatasource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> DatasourceResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DatasourceError::Invalid("datasource name is empty".to_string()));
        }
        Ok(Self {
            name,
            path: path.into(),
            schema: None,
        })
    }

    /// Attach a schema hint (field name to type)
    pub fn with_schema(mut self, schema: BTreeMap<String, String>) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn schema(&self) -> Option<&BTreeMap<String, String>> {
        self.schema.as_ref()
    }

    pub fn config(&self) -> DirectoryDatasourceConfig {
        DirectoryDatasourceConfig {
            name: self.name.clone(),
            path: self.path.clone(),
            schema: self.schema.clone(),
        }
    }

    pub fn from_config(config: DirectoryDatasourceConfig) -> DatasourceResult<Self> {
        let datasource = Self::new(config.name, config.path)?;
        Ok(match config.schema {
            Some(schema) => datasource.with_schema(schema),
            None => datasource,
        })
    }

    /// Copy every record file to `output_path`, returning the file count
    #[instrument(skip(self), fields(datasource = %self.name))]
    pub fn copy_records(&self, output_path: &Path) -> DatasourceResult<usize> {
        let source = std::fs::canonicalize(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DatasourceError::SourceNotFound(self.path.clone())
            } else {
                io_error(&self.path)(e)
            }
        })?;
        if !source.is_dir() {
            return Err(DatasourceError::SourceNotFound(source));
        }

        let output = resolve_output(output_path)?;
        if output.starts_with(&source) {
            return Err(DatasourceError::OutputInsideSource {
                output,
                source_dir: source,
            });
        }
        std::fs::create_dir_all(&output).map_err(io_error(&output))?;

        let copied = copy_dir_recursive(&source, &output)?;
        info!(
            source = %source.display(),
            output = %output.display(),
            files = copied,
            "Copied datasource records"
        );
        Ok(copied)
    }
}

impl Datasource for DirectoryDatasource {
    type Error = DatasourceError;

    fn name(&self) -> &str {
        &self.name
    }

    fn process(&self, output_path: &Path) -> DatasourceResult<()> {
        self.copy_records(output_path).map(|_| ())
    }
}

/// Absolute, symlink-free form of a path that may not exist yet
///
/// The deepest existing ancestor is canonicalized and the missing tail is
/// appended as is, so nothing is created on disk.
fn resolve_output(path: &Path) -> DatasourceResult<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map_err(io_error(path))?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }

    let mut existing = normalized.as_path();
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = std::fs::canonicalize(existing).map_err(io_error(existing))?;
    resolved.extend(missing.iter().rev());
    Ok(resolved)
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> DatasourceResult<usize> {
    let mut copied = 0;
    for entry in walkdir::WalkDir::new(src).follow_links(true) {
        let entry = entry?;
        let path = entry.path();
        if path == src {
            continue;
        }

        let rel = path.strip_prefix(src).map_err(|_| {
            DatasourceError::Invalid(format!("{} is outside {}", path.display(), src.display()))
        })?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target).map_err(io_error(&target))?;
            continue;
        }
        if entry.file_type().is_file() {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(io_error(parent))?;
            }
            std::fs::copy(path, &target).map_err(io_error(&target))?;
            debug!(file = %rel.display(), "Copied record file");
            copied += 1;
        }
    }
    Ok(copied)
}
