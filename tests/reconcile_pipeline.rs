//! Reconciliation and Deployment Integration Tests
//!
//! End-to-end: per-step records are aggregated, reconciled against the mock
//! artifact index, finalized into modules and written by the file driver.

mod fixtures;

use buildinfo::deploy::{publish, DeployError, JsonFileDriver};
use buildinfo::mock::{FailureConfig, IndexOperation, StoredItem};
use buildinfo::reconcile::{reconcile, ReconcileError, Reconciler};
use buildinfo::record::{aggregate, BuildInfo, RecordState};
use buildinfo::{Digest, IndexError, SearchQuery};
use tempfile::TempDir;

const MANIFEST: &str = r#"{"schemaVersion":2,"layers":[{"digest":"sha256:aaa"},{"digest":"sha256:bbb"}],"config":{"digest":"sha256:ccc"}}"#;

fn manifest_sha1() -> String {
    Digest::manifest_self_hash(MANIFEST.as_bytes()).value().to_string()
}

// === Reconciliation ===

#[test]
fn test_three_digests_two_matches() {
    let manifest = Digest::manifest_self_hash(b"manifest document");
    let index = fixtures::index_with(vec![
        StoredItem::new(fixtures::docker_entry("shop/app/1", "sha256__aaa", "f-aaa")).with_sha256("aaa"),
        StoredItem::new(fixtures::docker_entry("shop/app/1", "manifest.json", manifest.value())),
        StoredItem::new(fixtures::docker_entry("other/x/1", "sha256__zzz", "f-zzz")).with_sha256("zzz"),
    ]);

    let mut record = fixtures::open_record();
    let layer_set = buildinfo::ManifestLayerSet {
        layers: vec![Digest::parse("sha256:aaa").unwrap()],
        config: Digest::parse("sha256:bbb").unwrap(),
        manifest,
    };
    record.add_layer_set(&layer_set).unwrap();
    assert_eq!(record.image().len(), 3);

    let report = reconcile(&mut record, &index).unwrap();

    assert_eq!(report.queried_digests, 3);
    assert_eq!(report.matched_entries, 2);
    assert_eq!(report.new_artifacts, 2);
    assert_eq!(record.deployed_artifacts().len(), 2);
    assert_eq!(index.writes().len(), 2);
    assert_eq!(index.queries().len(), 1);
    assert_eq!(record.state(), RecordState::Reconciled);
}

#[test]
fn test_property_string_and_paths() {
    let index = fixtures::index_with(vec![StoredItem::new(fixtures::docker_entry(
        "shop/app/1",
        "manifest.json",
        &manifest_sha1(),
    ))]);

    let mut record = fixtures::image_step("shop/app:1", MANIFEST);
    reconcile(&mut record, &index).unwrap();

    let writes = index.writes();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].path, "docker-local/shop/app/1/manifest.json");
    assert_eq!(
        writes[0].properties,
        format!(
            "build.name={}|build.number={}|build.timestamp={}",
            fixtures::BUILD_NAME,
            fixtures::BUILD_NUMBER,
            fixtures::STARTED_MILLIS
        )
    );

    let artifact = &record.deployed_artifacts().as_slice()[0];
    assert_eq!(artifact.name, "manifest.json");
    assert_eq!(artifact.sha1.as_deref(), Some(manifest_sha1().as_str()));
}

#[test]
fn test_query_covers_every_digest() {
    let index = fixtures::index_with(Vec::new());
    let mut record = fixtures::image_step("shop/app:1", MANIFEST);
    let report = reconcile(&mut record, &index).unwrap();

    assert_eq!(report.queried_digests, 4);
    assert_eq!(report.matched_entries, 0);

    let query = SearchQuery::parse(&index.queries()[0]).unwrap();
    assert_eq!(query.criteria().len(), 4);
    assert_eq!(query.include(), ["name", "repo", "path", "actual_sha1"]);
}

#[test]
fn test_already_known_artifact_not_counted_as_new() {
    let index = fixtures::index_with(vec![
        StoredItem::new(fixtures::docker_entry("shop/app/1", "sha256__aaa", "f-aaa")).with_sha256("aaa"),
    ]);
    let mut record = fixtures::image_step("shop/app:1", MANIFEST);
    record
        .append_deployed_artifacts([buildinfo::record::Artifact::new("sha256__aaa").with_sha1("f-aaa")])
        .unwrap();

    let report = reconcile(&mut record, &index).unwrap();
    assert_eq!(report.matched_entries, 1);
    assert_eq!(report.new_artifacts, 0);
    assert_eq!(index.writes().len(), 1);
}

#[test]
fn test_search_failure_propagates_and_record_stays_open() {
    let index = fixtures::index_with(Vec::new());
    index.inject_failure(IndexOperation::Search, FailureConfig::error("connection refused"));

    let mut record = fixtures::image_step("shop/app:1", MANIFEST);
    let err = reconcile(&mut record, &index).unwrap_err();

    assert!(matches!(err, ReconcileError::Index(IndexError::Unavailable(_))));
    assert_eq!(record.state(), RecordState::Open);
}

#[test]
fn test_property_write_failure_propagates() {
    let index = fixtures::index_with(vec![
        StoredItem::new(fixtures::docker_entry("shop/app/1", "sha256__aaa", "1")).with_sha256("aaa"),
        StoredItem::new(fixtures::docker_entry("shop/app/1", "sha256__bbb", "2")).with_sha256("bbb"),
    ]);
    index.inject_failure(IndexOperation::SetProperties, FailureConfig::error("forbidden").after(1));

    let mut record = fixtures::image_step("shop/app:1", MANIFEST);
    let err = reconcile(&mut record, &index).unwrap_err();

    assert!(matches!(err, ReconcileError::Index(IndexError::PropertyWrite { .. })));
    assert_eq!(index.writes().len(), 1);
    assert_eq!(record.deployed_artifacts().len(), 1);
    assert_eq!(record.state(), RecordState::Open);
}

// === Deployment ===

#[test]
fn test_full_pipeline_writes_modules() {
    let temp = TempDir::new().unwrap();
    let index = fixtures::index_with(vec![
        StoredItem::new(fixtures::docker_entry("shop/app/1.0", "sha256__bbb", "f-bbb")).with_sha256("bbb"),
    ]);

    let image = buildinfo::ImageManifest::from_documents(
        MANIFEST,
        Some(r#"{"history":[{"created_by":"ADD base"},{"created_by":"COPY app"},{"created_by":"ENTRYPOINT x"}]}"#),
    )
    .unwrap();
    let mut image_step = fixtures::open_record();
    image_step.add_image("registry:5000/shop/app:1.0", image).unwrap();

    let mut record = aggregate(vec![fixtures::library_step(), image_step]).unwrap();
    Reconciler::new(&index).reconcile(&mut record).unwrap();

    let driver = JsonFileDriver::new(temp.path().join("build-info.json"));
    publish(&mut record, &driver, fixtures::BUILD_NAME).unwrap();
    assert_eq!(record.state(), RecordState::Deployed);

    let written = BuildInfo::from_file(driver.path()).unwrap();
    let modules = written.modules();
    assert_eq!(modules.len(), 2);

    // image module: 2 dependent layers (aaa, bbb) + config + manifest.json
    assert_eq!(modules[0].id, "shop/app/1.0");
    assert_eq!(modules[0].dependencies.len(), 2);
    assert_eq!(modules[0].artifacts.len(), 2);

    // default module: library artifacts plus the reconciled layer
    assert_eq!(modules[1].id, "shop :: checkout");
    assert_eq!(modules[1].artifacts.len(), 3);
    assert_eq!(modules[1].dependencies.len(), 1);
}

#[test]
fn test_publish_open_record_rejected() {
    let temp = TempDir::new().unwrap();
    let driver = JsonFileDriver::new(temp.path().join("build-info.json"));
    let mut record = fixtures::library_step();

    let err = publish(&mut record, &driver, "x").unwrap_err();
    assert!(matches!(err, DeployError::State(_)));
}
