//! Manifest schema versions and their field names.

use serde_json::Value;

use super::ManifestError;

/// Layout of a registry manifest, resolved once from `schemaVersion`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestSchema {
    /// Legacy layout: `fsLayers[].blobSum`
    V1,
    /// Modern layout: `layers[].digest`
    V2,
}

impl ManifestSchema {
    /// Resolve the schema from a parsed manifest document.
    ///
    /// `1` selects V1 and any later version selects V2. A missing, non-integer,
    /// or non-positive version is rejected.
    pub fn detect(manifest: &Value) -> Result<Self, ManifestError> {
        let raw = manifest
            .get("schemaVersion")
            .ok_or_else(|| ManifestError::UnsupportedSchema("missing".to_string()))?;

        match raw.as_i64() {
            Some(1) => Ok(Self::V1),
            Some(v) if v >= 2 => Ok(Self::V2),
            _ => Err(ManifestError::UnsupportedSchema(raw.to_string())),
        }
    }

    /// Key of the layer array.
    pub fn layers_key(&self) -> &'static str {
        match self {
            Self::V1 => "fsLayers",
            Self::V2 => "layers",
        }
    }

    /// Key of the digest field inside each layer entry.
    pub fn digest_key(&self) -> &'static str {
        match self {
            Self::V1 => "blobSum",
            Self::V2 => "digest",
        }
    }
}
