//! Layered configuration
//!
//! Settings are merged from three layers, later layers winning:
//! 1. Built-in defaults
//! 2. Config file (TOML)
//! 3. CLI flags

mod defaults;
mod effective;
mod merge;
mod settings;

pub use defaults::BuiltinDefaults;
pub use effective::{ConfigError, ConfigOrigin, ConfigSource, EffectiveConfig};
pub use merge::{deep_merge, merge_layers};
pub use settings::{BuildInfoConfig, DeploySettings, EnvSettings, ReconcileSettings, SECTIONS};
