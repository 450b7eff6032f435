//! Build-info record
//!
//! One record is created per build step. Records from parallel steps are
//! merged with [`BuildInfo::append`] by a single aggregator once every step has
//! finished; the merged record is then reconciled and deployed.
//!
//! Merge semantics:
//! - Deployed artifacts, published dependencies, image digests, observed
//!   images: set union, first write wins, idempotent
//! - Build dependencies, modules: list concatenation, self first
//! - Environment: per key, last write wins

mod entity;
mod env;
mod image;
mod retention;
mod state;

pub use entity::{
    Artifact, BuildDependency, Dependency, Identified, IdentityKey, IdentitySet, Module,
};
pub use env::{
    Env, EnvError, EnvFilter, EnvMatcher, ExecutionContext, ProcessContext, DEFAULT_EXCLUDES,
    DEFAULT_INCLUDES,
};
pub use image::{ImageSubRecord, ObservedImage};
pub use retention::{BuildRetention, ConfigurationError, RETENTION_KEYS};
pub use state::{RecordState, RecordStateError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

use crate::manifest::{ImageManifest, ManifestLayerSet};

/// Separator replacing `/` in module ids derived from build names
const BUILD_NAME_SEPARATOR: &str = " :: ";

/// Accumulated facts about one build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildInfo {
    name: String,

    number: String,

    #[serde(rename = "startedMillis", with = "chrono::serde::ts_milliseconds")]
    start_time: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "is_default_retention")]
    retention: BuildRetention,

    #[serde(default)]
    deployed_artifacts: IdentitySet<Artifact>,

    #[serde(default)]
    published_dependencies: IdentitySet<Dependency>,

    #[serde(default)]
    build_dependencies: Vec<BuildDependency>,

    #[serde(default)]
    modules: Vec<Module>,

    #[serde(default)]
    env: Env,

    #[serde(default, rename = "docker")]
    image: ImageSubRecord,

    #[serde(default)]
    state: RecordState,
}

fn is_default_retention(retention: &BuildRetention) -> bool {
    !retention.is_set()
}

impl BuildInfo {
    /// Create an open record for a build step
    pub fn new(name: impl Into<String>, number: impl Into<String>, start_time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            number: number.into(),
            start_time,
            retention: BuildRetention::default(),
            deployed_artifacts: IdentitySet::new(),
            published_dependencies: IdentitySet::new(),
            build_dependencies: Vec::new(),
            modules: Vec::new(),
            env: Env::new(),
            image: ImageSubRecord::new(),
            state: RecordState::Open,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Start time as epoch milliseconds
    pub fn start_millis(&self) -> i64 {
        self.start_time.timestamp_millis()
    }

    /// Administrative rename
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn set_number(&mut self, number: impl Into<String>) {
        self.number = number.into();
    }

    pub fn set_start_time(&mut self, start_time: DateTime<Utc>) {
        self.start_time = start_time;
    }

    pub fn retention(&self) -> &BuildRetention {
        &self.retention
    }

    /// Replace the retention policy from free-form arguments.
    ///
    /// On error the previous policy is kept.
    pub fn configure_retention(&mut self, arguments: &Map<String, Value>) -> Result<(), ConfigurationError> {
        self.retention = BuildRetention::from_arguments(arguments)?;
        Ok(())
    }

    pub fn deployed_artifacts(&self) -> &IdentitySet<Artifact> {
        &self.deployed_artifacts
    }

    pub fn published_dependencies(&self) -> &IdentitySet<Dependency> {
        &self.published_dependencies
    }

    pub fn build_dependencies(&self) -> &[BuildDependency] {
        &self.build_dependencies
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Env {
        &mut self.env
    }

    pub fn image(&self) -> &ImageSubRecord {
        &self.image
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    fn ensure_state(&self, expected: RecordState) -> Result<(), RecordStateError> {
        if self.state != expected {
            return Err(RecordStateError::WrongState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    /// Move to the next lifecycle state
    pub fn transition(&mut self, to: RecordState) -> Result<(), RecordStateError> {
        if !self.state.can_transition_to(to) {
            return Err(RecordStateError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        debug!(build = %self.name, number = %self.number, from = ?self.state, to = ?to, "record state change");
        self.state = to;
        Ok(())
    }

    pub fn append_deployed_artifacts(
        &mut self,
        artifacts: impl IntoIterator<Item = Artifact>,
    ) -> Result<(), RecordStateError> {
        self.ensure_state(RecordState::Open)?;
        self.deployed_artifacts.extend(artifacts);
        Ok(())
    }

    pub fn append_published_dependencies(
        &mut self,
        dependencies: impl IntoIterator<Item = Dependency>,
    ) -> Result<(), RecordStateError> {
        self.ensure_state(RecordState::Open)?;
        self.published_dependencies.extend(dependencies);
        Ok(())
    }

    pub fn append_build_dependencies(
        &mut self,
        dependencies: impl IntoIterator<Item = BuildDependency>,
    ) -> Result<(), RecordStateError> {
        self.ensure_state(RecordState::Open)?;
        self.build_dependencies.extend(dependencies);
        Ok(())
    }

    pub fn append_modules(
        &mut self,
        modules: impl IntoIterator<Item = Module>,
    ) -> Result<(), RecordStateError> {
        self.ensure_state(RecordState::Open)?;
        self.modules.extend(modules);
        Ok(())
    }

    /// Fold a manifest's digests into the image sub-record
    pub fn add_layer_set(&mut self, layer_set: &ManifestLayerSet) -> Result<(), RecordStateError> {
        self.ensure_state(RecordState::Open)?;
        self.image.add_layer_set(layer_set);
        Ok(())
    }

    /// Record a pushed image and its digests
    pub fn add_image(
        &mut self,
        tag: impl Into<String>,
        manifest: ImageManifest,
    ) -> Result<(), RecordStateError> {
        self.ensure_state(RecordState::Open)?;
        self.image.add_image(tag, manifest);
        Ok(())
    }

    /// Insert an artifact found by reconciliation.
    ///
    /// Returns true if it was not already present.
    pub(crate) fn insert_reconciled_artifact(&mut self, artifact: Artifact) -> bool {
        self.deployed_artifacts.insert(artifact)
    }

    /// Merge another step's record into this one.
    ///
    /// Never fails and does not look at either record's state. Identity and
    /// retention stay those of `self`.
    pub fn append(&mut self, other: &BuildInfo) {
        self.modules.extend(other.modules.iter().cloned());
        self.deployed_artifacts
            .extend(other.deployed_artifacts.iter().cloned());
        self.published_dependencies
            .extend(other.published_dependencies.iter().cloned());
        self.build_dependencies
            .extend(other.build_dependencies.iter().cloned());
        self.image.append(&other.image);
        self.env.append(&other.env);

        debug!(
            build = %self.name,
            artifacts = self.deployed_artifacts.len(),
            dependencies = self.published_dependencies.len(),
            digests = self.image.len(),
            "appended record"
        );
    }

    /// Populate the environment snapshot from the execution context if enabled
    pub fn collect_env(&mut self, context: &dyn ExecutionContext) -> Result<(), EnvError> {
        self.env.collect(context)
    }

    /// Add image modules and the default module ahead of deployment.
    ///
    /// One module per observed image, then a default module holding the
    /// deployed artifacts and published dependencies unless both are empty.
    pub fn finalize_modules(&mut self, default_module_id: &str) -> Result<(), RecordStateError> {
        self.ensure_state(RecordState::Reconciled)?;

        self.modules.extend(self.image.modules());

        if self.deployed_artifacts.is_empty() && self.published_dependencies.is_empty() {
            return Ok(());
        }

        self.modules.push(Module {
            id: sanitize_build_name(default_module_id),
            artifacts: self.deployed_artifacts.iter().cloned().collect(),
            dependencies: self.published_dependencies.iter().cloned().collect(),
        });
        Ok(())
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Load from JSON
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e))
        })?;
        fs::write(path, json)
    }

    /// Load from file
    pub fn from_file(path: &Path) -> io::Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, format!("JSON error: {}", e)))
    }
}

/// Module id for a build name: `/` becomes ` :: `
pub fn sanitize_build_name(name: &str) -> String {
    name.replace('/', BUILD_NAME_SEPARATOR)
}

/// Merge per-step records in order. `None` if there are none.
pub fn aggregate(records: impl IntoIterator<Item = BuildInfo>) -> Option<BuildInfo> {
    let mut records = records.into_iter();
    let mut merged = records.next()?;
    for record in records {
        merged.append(&record);
    }
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn record() -> BuildInfo {
        BuildInfo::new("app", "7", Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    fn layer_set() -> ManifestLayerSet {
        ManifestLayerSet::parse(
            r#"{"schemaVersion":2,"layers":[{"digest":"sha256:aaa"}],"config":{"digest":"sha256:ccc"}}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_new_record_is_open_and_empty() {
        let r = record();
        assert_eq!(r.state(), RecordState::Open);
        assert!(r.deployed_artifacts().is_empty());
        assert!(r.image().is_empty());
        assert_eq!(r.start_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_rename() {
        let mut r = record();
        r.set_name("renamed");
        r.set_number("8");
        assert_eq!(r.name(), "renamed");
        assert_eq!(r.number(), "8");
    }

    #[test]
    fn test_configure_retention_keeps_previous_on_error() {
        let mut r = record();
        r.configure_retention(json!({"maxBuilds": 3}).as_object().unwrap())
            .unwrap();

        let err = r
            .configure_retention(json!({"maxDays": 5, "bogus": true}).as_object().unwrap())
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownKeys { .. }));
        assert_eq!(r.retention().max_builds, Some(3));
        assert_eq!(r.retention().max_days, None);
    }

    #[test]
    fn test_empty_appends_are_noops() {
        let mut r = record();
        r.append_deployed_artifacts(Vec::new()).unwrap();
        r.append_build_dependencies(Vec::new()).unwrap();
        assert!(r.deployed_artifacts().is_empty());
        assert!(r.build_dependencies().is_empty());
    }

    #[test]
    fn test_appends_rejected_after_reconcile() {
        let mut r = record();
        r.transition(RecordState::Reconciled).unwrap();

        let err = r.append_deployed_artifacts([Artifact::new("a")]).unwrap_err();
        assert_eq!(
            err,
            RecordStateError::WrongState {
                expected: RecordState::Open,
                actual: RecordState::Reconciled
            }
        );
        assert!(r.add_layer_set(&layer_set()).is_err());
    }

    #[test]
    fn test_append_merges_everything() {
        let mut a = record();
        a.append_deployed_artifacts([Artifact::new("a.jar").with_sha1("1")]).unwrap();
        a.env_mut().set_env_var("K", "a");

        let mut b = record();
        b.append_deployed_artifacts([Artifact::new("b.jar").with_sha1("2")]).unwrap();
        b.append_published_dependencies([Dependency::new("dep")]).unwrap();
        b.append_modules([Module::new("m")]).unwrap();
        b.add_layer_set(&layer_set()).unwrap();
        b.env_mut().set_env_var("K", "b");

        a.append(&b);
        assert_eq!(a.deployed_artifacts().len(), 2);
        assert_eq!(a.published_dependencies().len(), 1);
        assert_eq!(a.modules().len(), 1);
        assert_eq!(a.image().len(), 3);
        assert_eq!(a.env().env_vars()["K"], "b");
    }

    #[test]
    fn test_aggregate() {
        assert!(aggregate(Vec::new()).is_none());

        let mut b = record();
        b.append_build_dependencies([BuildDependency::new("upstream", "1")])
            .unwrap();
        let merged = aggregate(vec![record(), b.clone(), b]).unwrap();
        assert_eq!(merged.build_dependencies().len(), 2);
    }

    #[test]
    fn test_finalize_requires_reconciled() {
        let mut r = record();
        assert!(r.finalize_modules("app").is_err());
    }

    #[test]
    fn test_finalize_default_module() {
        let mut r = record();
        r.append_deployed_artifacts([Artifact::new("a.jar")]).unwrap();
        r.transition(RecordState::Reconciled).unwrap();
        r.finalize_modules("folder/app").unwrap();

        assert_eq!(r.modules().len(), 1);
        assert_eq!(r.modules()[0].id, "folder :: app");
        assert_eq!(r.modules()[0].artifacts.len(), 1);
    }

    #[test]
    fn test_finalize_skips_empty_default_module() {
        let mut r = record();
        r.transition(RecordState::Reconciled).unwrap();
        r.finalize_modules("app").unwrap();
        assert!(r.modules().is_empty());
    }

    #[test]
    fn test_json_shape() {
        let mut r = record();
        r.add_layer_set(&layer_set()).unwrap();
        let value: Value = serde_json::from_str(&r.to_json().unwrap()).unwrap();

        assert_eq!(value["name"], "app");
        assert_eq!(value["startedMillis"], 1_700_000_000_000i64);
        assert_eq!(value["state"], "OPEN");
        assert_eq!(value["docker"]["digests"].as_array().unwrap().len(), 3);
        assert!(value.get("retention").is_none());

        let back = BuildInfo::from_json(&r.to_json().unwrap()).unwrap();
        assert_eq!(back, r);
    }
}
