//! Typed view of the merged configuration

use serde::{Deserialize, Serialize};

use crate::record::{Env, EnvFilter};

/// Recognized top-level sections
pub const SECTIONS: &[&str] = &["env", "reconcile", "deploy"];

/// Environment capture settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvSettings {
    pub capture: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl EnvSettings {
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::new(self.include.clone(), self.exclude.clone())
    }

    /// Apply capture flag and filter to a record's environment
    pub fn apply(&self, env: &mut Env) {
        env.set_capture(self.capture);
        env.set_filter(self.filter());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileSettings {
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploySettings {
    /// Path written by the JSON file driver
    pub output: String,

    /// Id of the default module; the build name when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

/// Settings used by the CLI pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildInfoConfig {
    pub env: EnvSettings,
    pub reconcile: ReconcileSettings,
    pub deploy: DeploySettings,
}
