//! Framework contracts shared by the pipeline integrations
//!
//! The orchestration framework defines the lifecycle every integration has to
//! conform to. This crate carries those contracts plus local implementations
//! of the storage collaborators the adapters talk to:
//!
//! - [`store`]: artifact stores addressed by URI
//! - [`registry`]: versioned artifact registry with metadata
//! - [`deployer`], [`materializer`], [`datasource`]: plugin lifecycle traits

pub mod artifact;
pub mod datasource;
pub mod deployer;
pub mod error;
pub mod materializer;
pub mod registry;
pub mod store;

pub use artifact::{ArtifactType, ArtifactVersion, SaveOptions, StoredArtifact};
pub use datasource::Datasource;
pub use deployer::{ModelDeployer, ModelServerInfo, DEFAULT_DEPLOYMENT_START_STOP_TIMEOUT};
pub use error::{ArtifactError, ArtifactResult};
pub use materializer::Materializer;
pub use registry::{ArtifactRegistry, FileArtifactRegistry, InMemoryArtifactRegistry};
pub use store::{join_uri, ArtifactStore, LocalArtifactStore};
