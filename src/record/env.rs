//! Environment snapshot of a build
//!
//! Holds environment and system variables, filtered by include/exclude glob
//! patterns when they are captured from the execution context.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default patterns keeping secrets out of captured variables
pub const DEFAULT_EXCLUDES: &[&str] = &["*password*", "*secret*", "*key*", "*token*"];

/// Default include pattern (everything)
pub const DEFAULT_INCLUDES: &[&str] = &["*"];

/// Errors for environment capture
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("Glob pattern error: {0}")]
    GlobError(#[from] globset::Error),
}

/// Source of variables when a record captures its environment lazily.
pub trait ExecutionContext {
    /// Environment variables of the step
    fn env_vars(&self) -> BTreeMap<String, String>;

    /// System properties of the executing host
    fn sys_vars(&self) -> BTreeMap<String, String>;
}

/// Execution context of the current process.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessContext;

impl ExecutionContext for ProcessContext {
    fn env_vars(&self) -> BTreeMap<String, String> {
        std::env::vars().collect()
    }

    fn sys_vars(&self) -> BTreeMap<String, String> {
        let mut vars = BTreeMap::new();
        vars.insert("os.name".to_string(), std::env::consts::OS.to_string());
        vars.insert("os.arch".to_string(), std::env::consts::ARCH.to_string());
        vars.insert("os.family".to_string(), std::env::consts::FAMILY.to_string());
        if let Ok(dir) = std::env::current_dir() {
            vars.insert("user.dir".to_string(), dir.to_string_lossy().to_string());
        }
        vars
    }
}

/// Include/exclude patterns applied to captured variable names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvFilter {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for EnvFilter {
    fn default() -> Self {
        Self {
            include: DEFAULT_INCLUDES.iter().map(|s| s.to_string()).collect(),
            exclude: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl EnvFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self { include, exclude }
    }

    /// Compile the patterns. Matching ignores case.
    pub fn matcher(&self) -> Result<EnvMatcher, EnvError> {
        Ok(EnvMatcher {
            include: Self::build(&self.include)?,
            exclude: Self::build(&self.exclude)?,
        })
    }

    fn build(patterns: &[String]) -> Result<GlobSet, EnvError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns.iter().filter(|p| !p.is_empty()) {
            builder.add(GlobBuilder::new(pattern).case_insensitive(true).build()?);
        }
        Ok(builder.build()?)
    }
}

/// Compiled [`EnvFilter`]
#[derive(Debug, Clone)]
pub struct EnvMatcher {
    include: GlobSet,
    exclude: GlobSet,
}

impl EnvMatcher {
    /// A name is kept if it matches an include pattern and no exclude pattern.
    pub fn accepts(&self, name: &str) -> bool {
        self.include.is_match(name) && !self.exclude.is_match(name)
    }
}

/// Environment and system variables recorded for a build
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Env {
    #[serde(default)]
    env_vars: BTreeMap<String, String>,

    #[serde(default)]
    sys_vars: BTreeMap<String, String>,

    /// Whether [`Env::collect`] may populate empty maps
    #[serde(skip)]
    capture: bool,

    #[serde(skip)]
    filter: EnvFilter,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn env_vars(&self) -> &BTreeMap<String, String> {
        &self.env_vars
    }

    pub fn sys_vars(&self) -> &BTreeMap<String, String> {
        &self.sys_vars
    }

    pub fn set_env_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.env_vars.insert(key.into(), value.into());
    }

    pub fn set_sys_var(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.sys_vars.insert(key.into(), value.into());
    }

    pub fn capture(&self) -> bool {
        self.capture
    }

    pub fn set_capture(&mut self, capture: bool) {
        self.capture = capture;
    }

    pub fn filter(&self) -> &EnvFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: EnvFilter) {
        self.filter = filter;
    }

    /// Merge another snapshot into this one; on key collisions `other` wins.
    pub fn append(&mut self, other: &Env) {
        self.env_vars
            .extend(other.env_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.sys_vars
            .extend(other.sys_vars.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    /// Populate empty maps from the execution context.
    ///
    /// Does nothing unless capture is enabled. A map that already holds entries
    /// is left untouched.
    pub fn collect(&mut self, context: &dyn ExecutionContext) -> Result<(), EnvError> {
        if !self.capture {
            return Ok(());
        }

        let matcher = self.filter.matcher()?;
        if self.env_vars.is_empty() {
            self.env_vars = context
                .env_vars()
                .into_iter()
                .filter(|(k, _)| matcher.accepts(k))
                .collect();
        }
        if self.sys_vars.is_empty() {
            self.sys_vars = context
                .sys_vars()
                .into_iter()
                .filter(|(k, _)| matcher.accepts(k))
                .collect();
        }

        tracing::debug!(
            env_vars = self.env_vars.len(),
            sys_vars = self.sys_vars.len(),
            "collected environment"
        );
        Ok(())
    }
}
