//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use crate::record::{DEFAULT_EXCLUDES, DEFAULT_INCLUDES};

/// Default path of the deployed build-info document
pub const DEFAULT_OUTPUT: &str = "build-info.json";

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Capture environment variables from the execution context (default: false)
    pub env_capture: bool,

    /// Include patterns for captured variables (default: everything)
    pub env_include: Vec<String>,

    /// Exclude patterns for captured variables (default: secret-looking names)
    pub env_exclude: Vec<String>,

    /// Query the artifact index before deploying (default: true)
    pub reconcile_enabled: bool,

    /// Output path of the JSON file driver
    pub deploy_output: String,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            env_capture: false,
            env_include: DEFAULT_INCLUDES.iter().map(|s| s.to_string()).collect(),
            env_exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            reconcile_enabled: true,
            deploy_output: DEFAULT_OUTPUT.to_string(),
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "env": {
                "capture": self.env_capture,
                "include": self.env_include,
                "exclude": self.env_exclude
            },
            "reconcile": {
                "enabled": self.reconcile_enabled
            },
            "deploy": {
                "output": self.deploy_output
            }
        })
    }
}
