//! Build-Info Merge Integration Tests
//!
//! - Set-valued fields merge idempotently; list-valued fields do not
//! - Retention arguments are validated before anything changes
//! - Per-step records built on separate threads aggregate into one record

mod fixtures;

use std::thread;

use buildinfo::record::{
    aggregate, Artifact, BuildDependency, BuildInfo, ConfigurationError, Module, RecordState,
};
use buildinfo::ImageManifest;
use serde_json::json;

// === Append Semantics ===

#[test]
fn test_repeated_append_is_idempotent_for_sets_only() {
    let a = fixtures::library_step();
    let mut b = fixtures::open_record();
    b.append_deployed_artifacts([Artifact::new("checkout-api.jar").with_sha1("ap1")])
        .unwrap();
    b.append_build_dependencies([BuildDependency::new("shop/protos", "3")])
        .unwrap();
    b.append_modules([Module::new("checkout-api")]).unwrap();
    let image = ImageManifest::from_documents(&fixtures::manifest_text("schema_v2.json"), None).unwrap();
    b.add_image("registry:5000/shop/app:1.0", image).unwrap();

    let mut once = a.clone();
    once.append(&b);

    let mut twice = once.clone();
    twice.append(&b);

    assert_eq!(twice.deployed_artifacts(), once.deployed_artifacts());
    assert_eq!(twice.published_dependencies(), once.published_dependencies());
    assert_eq!(twice.image(), once.image());
    assert_eq!(twice.image().images().len(), 1);

    assert_eq!(once.build_dependencies().len(), 2);
    assert_eq!(twice.build_dependencies().len(), 3);
    assert_eq!(twice.modules().len(), 2);

    twice.transition(RecordState::Reconciled).unwrap();
    twice.finalize_modules(fixtures::BUILD_NAME).unwrap();
    let image_modules = twice.modules().iter().filter(|m| m.id == "shop/app/1.0").count();
    assert_eq!(image_modules, 1);
}

#[test]
fn test_append_keeps_first_write() {
    let mut a = fixtures::open_record();
    a.append_deployed_artifacts([Artifact::new("app.tar").with_sha1("1").with_md5("from-a")])
        .unwrap();

    let mut b = fixtures::open_record();
    b.append_deployed_artifacts([Artifact::new("app.tar").with_sha1("1").with_md5("from-b")])
        .unwrap();

    a.append(&b);
    assert_eq!(a.deployed_artifacts().len(), 1);
    assert_eq!(a.deployed_artifacts().as_slice()[0].md5.as_deref(), Some("from-a"));
}

#[test]
fn test_list_order_self_first() {
    let mut a = fixtures::open_record();
    a.append_build_dependencies([BuildDependency::new("first", "1")]).unwrap();
    let mut b = fixtures::open_record();
    b.append_build_dependencies([BuildDependency::new("second", "1")]).unwrap();

    a.append(&b);
    let names: Vec<_> = a.build_dependencies().iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_failed_manifest_parse_keeps_other_contributions() {
    let mut step = fixtures::library_step();
    let parsed = buildinfo::ImageManifest::from_documents(r#"{"layers":[]}"#, None);
    assert!(parsed.is_err());

    if let Ok(image) = parsed {
        step.add_image("shop/checkout:1", image).unwrap();
    }

    let merged = aggregate(vec![fixtures::open_record(), step]).unwrap();
    assert!(merged.image().is_empty());
    assert_eq!(merged.deployed_artifacts().len(), 2);
}

// === Retention ===

#[test]
fn test_retention_unknown_key_leaves_prior_value() {
    let mut record = fixtures::open_record();
    record
        .configure_retention(json!({"maxDays": 30, "deleteBuildArtifacts": true}).as_object().unwrap())
        .unwrap();
    let before = record.retention().clone();

    let err = record
        .configure_retention(json!({"maxDays": 5, "bogus": true}).as_object().unwrap())
        .unwrap_err();

    assert!(matches!(err, ConfigurationError::UnknownKeys { .. }));
    assert_eq!(record.retention(), &before);
}

#[test]
fn test_retention_round_trips_through_document() {
    let mut record = fixtures::open_record();
    record
        .configure_retention(json!({"maxBuilds": 10, "doNotDiscardBuilds": ["41"]}).as_object().unwrap())
        .unwrap();

    let loaded = BuildInfo::from_json(&record.to_json().unwrap()).unwrap();
    assert_eq!(loaded.retention().max_builds, Some(10));
    assert_eq!(loaded.retention().do_not_discard_builds, vec!["41"]);
}

// === Parallel Steps ===

#[test]
fn test_parallel_steps_aggregate() {
    let manifests = [
        r#"{"schemaVersion":2,"layers":[{"digest":"sha256:base"},{"digest":"sha256:web"}],"config":{"digest":"sha256:cfg1"}}"#,
        r#"{"schemaVersion":2,"layers":[{"digest":"sha256:base"},{"digest":"sha256:worker"}],"config":{"digest":"sha256:cfg2"}}"#,
    ];

    let mut handles = vec![thread::spawn(fixtures::library_step)];
    for (i, manifest) in manifests.into_iter().enumerate() {
        handles.push(thread::spawn(move || {
            fixtures::image_step(&format!("registry:5000/shop/svc{}:1.0", i), manifest)
        }));
    }

    let records: Vec<BuildInfo> = handles
        .into_iter()
        .map(|h| h.join().expect("Thread panicked"))
        .collect();
    let merged = aggregate(records).unwrap();

    // base, web, cfg1, m1, worker, cfg2, m2
    assert_eq!(merged.image().len(), 7);
    assert_eq!(merged.image().images().len(), 2);
    assert_eq!(merged.deployed_artifacts().len(), 2);
    assert_eq!(merged.state(), RecordState::Open);
}

#[test]
fn test_merged_document_round_trip() {
    let merged = aggregate(vec![
        fixtures::library_step(),
        fixtures::image_step("shop/checkout:2", &fixtures::manifest_text("schema_v2.json")),
    ])
    .unwrap();

    let temp = tempfile::TempDir::new().unwrap();
    let path = temp.path().join("merged.json");
    merged.write_to_file(&path).unwrap();

    let loaded = BuildInfo::from_file(&path).unwrap();
    assert_eq!(loaded, merged);
}
