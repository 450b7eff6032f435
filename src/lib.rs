//! Build-info core
//!
//! Collects facts about a build (artifacts, dependencies, environment,
//! retention, container image digests), merges the per-step records of a
//! parallel build, reconciles image digests against an artifact index and
//! hands the result to a deployment driver.

pub mod config;
pub mod deploy;
pub mod manifest;
pub mod mock;
pub mod reconcile;
pub mod record;

pub use buildinfo_digest::{Digest, DigestError};
pub use buildinfo_index::{BuildProperties, IndexEntry, IndexError, SearchQuery};
pub use config::{BuildInfoConfig, ConfigError, EffectiveConfig};
pub use deploy::{publish, DeployError, DeploymentDriver, JsonFileDriver};
pub use manifest::{ImageManifest, ManifestError, ManifestLayerSet, ManifestSchema};
pub use reconcile::{reconcile, ArtifactIndex, ReconcileError, ReconcileReport, Reconciler};
pub use record::{aggregate, BuildInfo, RecordState};
