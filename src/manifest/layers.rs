//! Layer digest extraction from manifest documents.

use buildinfo_digest::Digest;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::history::meaningful_layer_count;
use super::schema::ManifestSchema;
use super::ManifestError;

/// Digests contributed by one manifest observation.
///
/// Ordering: layers in declaration order, then the config digest, then the
/// manifest's own content digest last of all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestLayerSet {
    /// Registry layer blobs, oldest first
    pub layers: Vec<Digest>,

    /// Image config blob
    pub config: Digest,

    /// Self-hash of the manifest document bytes
    pub manifest: Digest,
}

impl ManifestLayerSet {
    /// Parse a manifest document.
    ///
    /// The self digest is computed over `manifest` exactly as given, not over a
    /// re-serialization of the parsed value.
    pub fn parse(manifest: &str) -> Result<Self, ManifestError> {
        let doc: Value = serde_json::from_str(manifest)?;
        let schema = ManifestSchema::detect(&doc)?;

        let entries = doc
            .get(schema.layers_key())
            .and_then(Value::as_array)
            .ok_or_else(|| ManifestError::Malformed(schema.layers_key().to_string()))?;

        let mut layers = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let raw = entry
                .get(schema.digest_key())
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ManifestError::Malformed(format!(
                        "{}[{}].{}",
                        schema.layers_key(),
                        i,
                        schema.digest_key()
                    ))
                })?;
            layers.push(Digest::parse(raw)?);
        }

        let config = doc
            .get("config")
            .and_then(|c| c.get("digest"))
            .and_then(Value::as_str)
            .ok_or_else(|| ManifestError::Malformed("config.digest".to_string()))?;
        let config = Digest::parse(config)?;

        let manifest = Digest::manifest_self_hash(manifest.as_bytes());

        debug!(
            schema = ?schema,
            layers = layers.len(),
            manifest = %manifest,
            "parsed manifest"
        );

        Ok(Self {
            layers,
            config,
            manifest,
        })
    }

    /// All digests in order: layers, config, self.
    pub fn digests(&self) -> impl Iterator<Item = &Digest> {
        self.layers
            .iter()
            .chain(std::iter::once(&self.config))
            .chain(std::iter::once(&self.manifest))
    }

    /// Owned copy of [`ManifestLayerSet::digests`].
    pub fn to_vec(&self) -> Vec<Digest> {
        self.digests().cloned().collect()
    }

    /// Number of digests, including config and self.
    pub fn len(&self) -> usize {
        self.layers.len() + 2
    }

    /// Never true: config and self digests are always present.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// A manifest together with what its image config says about dependency layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageManifest {
    pub layer_set: ManifestLayerSet,

    /// Layers carrying dependency content; `None` without an image config
    pub dependent_layers: Option<usize>,
}

impl ImageManifest {
    /// Parse a manifest and, when supplied, its image config document.
    pub fn from_documents(manifest: &str, image_config: Option<&str>) -> Result<Self, ManifestError> {
        let layer_set = ManifestLayerSet::parse(manifest)?;
        let dependent_layers = image_config.map(meaningful_layer_count).transpose()?;

        Ok(Self {
            layer_set,
            dependent_layers,
        })
    }
}
