//! Build retention policy data
//!
//! Only the policy is recorded here; enforcing it is the repository's job.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Option keys accepted by [`BuildRetention::from_arguments`].
pub const RETENTION_KEYS: &[&str] = &[
    "maxDays",
    "maxBuilds",
    "deleteBuildArtifacts",
    "doNotDiscardBuilds",
];

/// Errors for retention configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Only the following arguments are allowed: [{}] (got unknown: {})", RETENTION_KEYS.join(", "), .unknown.join(", "))]
    UnknownKeys { unknown: Vec<String> },

    #[error("Invalid retention value: {0}")]
    InvalidValue(#[from] serde_json::Error),
}

/// Retention policy attached to a build-info record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildRetention {
    /// Discard builds older than this many days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_days: Option<u32>,

    /// Keep at most this many builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_builds: Option<u32>,

    /// Also delete the artifacts of discarded builds
    #[serde(default)]
    pub delete_build_artifacts: bool,

    /// Build numbers never discarded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub do_not_discard_builds: Vec<String>,
}

impl BuildRetention {
    /// Build a policy from free-form arguments.
    ///
    /// Every key must be one of [`RETENTION_KEYS`]; the key set is checked
    /// before any value is converted.
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self, ConfigurationError> {
        let unknown: Vec<String> = arguments
            .keys()
            .filter(|k| !RETENTION_KEYS.contains(&k.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConfigurationError::UnknownKeys { unknown });
        }

        Ok(serde_json::from_value(Value::Object(arguments.clone()))?)
    }

    /// Whether any option differs from the empty policy.
    pub fn is_set(&self) -> bool {
        self != &Self::default()
    }
}
