//! Shared fixtures for integration tests
//!
//! - Registry manifests (schema v1 and v2) and an image config document
//! - Record builders for per-step build-info
//! - A catalog of stored items for the mock artifact index

#![allow(dead_code)]

use buildinfo::mock::{MockArtifactIndex, StoredItem};
use buildinfo::record::{Artifact, BuildDependency, BuildInfo, Dependency};
use buildinfo::IndexEntry;
use chrono::{TimeZone, Utc};
use std::fs;
use std::path::{Path, PathBuf};

pub const BUILD_NAME: &str = "shop/checkout";
pub const BUILD_NUMBER: &str = "42";
pub const STARTED_MILLIS: i64 = 1_700_000_000_000;

/// Path to a manifest fixture
pub fn manifest_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/manifests")
        .join(name)
}

/// Raw text of a manifest fixture
pub fn manifest_text(name: &str) -> String {
    fs::read_to_string(manifest_path(name)).expect("fixture exists")
}

/// Empty open record with the shared identity
pub fn open_record() -> BuildInfo {
    BuildInfo::new(
        BUILD_NAME,
        BUILD_NUMBER,
        Utc.timestamp_millis_opt(STARTED_MILLIS).unwrap(),
    )
}

/// Record of a step that compiled and published a library
pub fn library_step() -> BuildInfo {
    let mut record = open_record();
    record
        .append_deployed_artifacts([
            Artifact::new("checkout-core.jar").with_type("jar").with_sha1("c0re"),
            Artifact::new("checkout-core.pom").with_type("pom").with_sha1("p0m"),
        ])
        .unwrap();
    record
        .append_published_dependencies([Dependency::new("org.slf4j:slf4j-api:2.0.9")
            .with_type("jar")
            .with_sha1("s1f4j")])
        .unwrap();
    record
        .append_build_dependencies([BuildDependency::new("shop/base-image", "7")])
        .unwrap();
    record
}

/// Record of a step that only pushed an image described by `manifest`
pub fn image_step(tag: &str, manifest: &str) -> BuildInfo {
    let mut record = open_record();
    let image = buildinfo::ImageManifest::from_documents(manifest, None).unwrap();
    record.add_image(tag, image).unwrap();
    record
}

/// Index entry under the docker repository
pub fn docker_entry(path: &str, name: &str, sha1: &str) -> IndexEntry {
    IndexEntry::new("docker-local", path, name, Some(sha1.to_string()))
}

/// Mock index holding `items`
pub fn index_with(items: Vec<StoredItem>) -> MockArtifactIndex {
    MockArtifactIndex::with_items(items)
}
