//! Materializer contract
//!
//! A materializer defines how one in-memory type is written to and read back
//! from an artifact URI.

use crate::artifact::ArtifactType;

/// Serializes a specific in-memory type to and from an artifact store
pub trait Materializer: Send + Sync {
    /// In-memory type handled by this materializer
    type Item;
    /// Error type for load and save
    type Error: std::error::Error + Send + Sync + 'static;

    /// Artifact type recorded for items written by this materializer
    const ASSOCIATED_ARTIFACT_TYPE: ArtifactType;

    /// Read an item from the artifact directory at `uri`
    fn load(&self, uri: &str) -> Result<Self::Item, Self::Error>;

    /// Write an item into the artifact directory at `uri`
    fn save(&self, item: &Self::Item, uri: &str) -> Result<(), Self::Error>;

    /// Name of the associated in-memory type
    fn associated_type(&self) -> &'static str {
        std::any::type_name::<Self::Item>()
    }
}
