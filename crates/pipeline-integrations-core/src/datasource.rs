//! Legacy datasource contract

use std::path::Path;

/// A datasource that materializes its raw data into a pipeline output path
pub trait Datasource: Send + Sync {
    /// Error type for processing
    type Error: std::error::Error + Send + Sync + 'static;

    /// Datasource name
    fn name(&self) -> &str;

    /// Write the datasource's contents to `output_path`
    fn process(&self, output_path: &Path) -> Result<(), Self::Error>;
}
