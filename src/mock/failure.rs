//! Failure injection for the mock index

use std::collections::HashMap;

/// Operations of the index that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexOperation {
    Search,
    SetProperties,
}

/// Failure configuration for an operation
#[derive(Debug, Clone)]
pub struct FailureConfig {
    /// Error message returned to the caller
    pub message: String,
    /// Number of times to fail before succeeding (None = always fail)
    pub fail_count: Option<u32>,
    /// Calls allowed to succeed before failures start
    pub skip: u32,
}

impl FailureConfig {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fail_count: None,
            skip: 0,
        }
    }

    /// Set the number of times to fail before succeeding
    pub fn with_fail_count(mut self, count: u32) -> Self {
        self.fail_count = Some(count);
        self
    }

    /// Let the first `count` calls through
    pub fn after(mut self, count: u32) -> Self {
        self.skip = count;
        self
    }
}

/// Failure injector for the mock index
#[derive(Debug, Default)]
pub struct FailureInjector {
    configs: HashMap<IndexOperation, FailureConfig>,
    call_counts: HashMap<IndexOperation, u32>,
}

impl FailureInjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject(&mut self, op: IndexOperation, config: FailureConfig) {
        self.configs.insert(op, config);
        self.call_counts.insert(op, 0);
    }

    /// Count a call and return the failure to report, if any
    pub fn check(&mut self, op: IndexOperation) -> Option<&FailureConfig> {
        let config = self.configs.get(&op)?;
        let count = self.call_counts.entry(op).or_insert(0);
        *count += 1;

        if *count <= config.skip {
            return None;
        }
        if let Some(fail_limit) = config.fail_count {
            if *count - config.skip > fail_limit {
                return None;
            }
        }
        Some(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_failure_by_default() {
        let mut injector = FailureInjector::new();
        assert!(injector.check(IndexOperation::Search).is_none());
    }

    #[test]
    fn test_always_fail() {
        let mut injector = FailureInjector::new();
        injector.inject(IndexOperation::Search, FailureConfig::error("down"));

        assert_eq!(injector.check(IndexOperation::Search).unwrap().message, "down");
        assert!(injector.check(IndexOperation::Search).is_some());
        assert!(injector.check(IndexOperation::SetProperties).is_none());
    }

    #[test]
    fn test_fail_count() {
        let mut injector = FailureInjector::new();
        injector.inject(
            IndexOperation::SetProperties,
            FailureConfig::error("busy").with_fail_count(2),
        );

        assert!(injector.check(IndexOperation::SetProperties).is_some());
        assert!(injector.check(IndexOperation::SetProperties).is_some());
        assert!(injector.check(IndexOperation::SetProperties).is_none());
    }

    #[test]
    fn test_after() {
        let mut injector = FailureInjector::new();
        injector.inject(IndexOperation::SetProperties, FailureConfig::error("x").after(1));

        assert!(injector.check(IndexOperation::SetProperties).is_none());
        assert!(injector.check(IndexOperation::SetProperties).is_some());
    }
}
