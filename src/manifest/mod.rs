//! Registry manifest parsing
//!
//! Extracts the layer digests of an image from a registry manifest document
//! (schema v1 or v2), plus the dependent-layer count from the image config
//! document's build history.

mod history;
mod layers;
mod reference;
mod schema;

pub use history::{meaningful_layer_count, ENTRYPOINT_MARKER};
pub use layers::{ImageManifest, ManifestLayerSet};
pub use reference::image_path;
pub use schema::ManifestSchema;

use buildinfo_digest::DigestError;

/// Errors for manifest and image-config parsing
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Unsupported manifest schemaVersion: {0}")]
    UnsupportedSchema(String),

    #[error("Malformed manifest: missing {0}")]
    Malformed(String),

    #[error("Malformed manifest digest: {0}")]
    Digest(#[from] DigestError),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
