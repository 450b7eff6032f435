//! Container image facts of a build
//!
//! Accumulates the digests of every manifest observed during a build step and
//! turns each observed image into a module when the record is finalized.

use buildinfo_digest::Digest;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::entity::{Artifact, Dependency, IdentitySet, Module};
use crate::manifest::{image_path, ImageManifest, ManifestLayerSet};

const SHA256: &str = "sha256";

/// One image whose manifest was parsed during a step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedImage {
    /// Image reference as pushed (`registry/name:tag`)
    pub tag: String,

    pub layer_set: ManifestLayerSet,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependent_layers: Option<usize>,
}

impl ObservedImage {
    /// Same pushed tag with the same manifest document
    fn is_same_image(&self, other: &ObservedImage) -> bool {
        self.tag == other.tag && self.layer_set.manifest == other.layer_set.manifest
    }

    /// Module describing this image.
    ///
    /// The first `dependent_layers` layers are dependencies (base content); the
    /// remaining layers, the config blob and the manifest are artifacts. Entries
    /// are named by their storage names.
    pub fn to_module(&self) -> Module {
        let dependent = self.dependent_layers.unwrap_or(0);
        let mut dependencies = IdentitySet::new();
        let mut artifacts = IdentitySet::new();

        for (i, layer) in self.layer_set.layers.iter().enumerate() {
            if i < dependent {
                let mut dependency = Dependency::new(layer.storage_name());
                if layer.algorithm() == SHA256 {
                    dependency = dependency.with_sha256(layer.value());
                }
                dependencies.insert(dependency);
            } else {
                artifacts.insert(blob_artifact(layer));
            }
        }

        artifacts.insert(blob_artifact(&self.layer_set.config));
        artifacts.insert(
            Artifact::new(self.layer_set.manifest.storage_name())
                .with_sha1(self.layer_set.manifest.value()),
        );

        Module {
            id: image_path(&self.tag),
            artifacts: artifacts.iter().cloned().collect(),
            dependencies: dependencies.iter().cloned().collect(),
        }
    }
}

fn blob_artifact(digest: &Digest) -> Artifact {
    let artifact = Artifact::new(digest.storage_name());
    if digest.algorithm() == SHA256 {
        artifact.with_sha256(digest.value())
    } else {
        artifact
    }
}

/// Image sub-record: the set of discovered digests plus the observed images
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSubRecord {
    #[serde(default)]
    digests: BTreeSet<Digest>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<ObservedImage>,
}

impl ImageSubRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a manifest's digests into the set.
    pub fn add_layer_set(&mut self, layer_set: &ManifestLayerSet) {
        self.digests.extend(layer_set.digests().cloned());
    }

    /// Record an image and fold its digests into the set.
    ///
    /// An image already observed with the same tag and manifest is kept as is.
    pub fn add_image(&mut self, tag: impl Into<String>, manifest: ImageManifest) {
        self.add_layer_set(&manifest.layer_set);
        self.insert_image(ObservedImage {
            tag: tag.into(),
            layer_set: manifest.layer_set,
            dependent_layers: manifest.dependent_layers,
        });
    }

    fn insert_image(&mut self, image: ObservedImage) {
        if !self.images.iter().any(|seen| seen.is_same_image(&image)) {
            self.images.push(image);
        }
    }

    /// Union digests and observed images; self's images come first.
    pub fn append(&mut self, other: &ImageSubRecord) {
        self.digests.extend(other.digests.iter().cloned());
        for image in &other.images {
            self.insert_image(image.clone());
        }
    }

    pub fn digests(&self) -> &BTreeSet<Digest> {
        &self.digests
    }

    pub fn images(&self) -> &[ObservedImage] {
        &self.images
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }

    /// One module per observed image, in observation order.
    pub fn modules(&self) -> Vec<Module> {
        self.images.iter().map(ObservedImage::to_module).collect()
    }
}
