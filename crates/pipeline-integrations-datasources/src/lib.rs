//! Legacy datasources
//!
//! File-based datasources that copy raw records into a pipeline's working
//! path without interpreting them.

pub mod directory;

pub use directory::{DatasourceError, DatasourceResult, DirectoryDatasource, DirectoryDatasourceConfig};
