//! Deployment of reconciled records
//!
//! A deployment driver performs the actual publish of a finalized record.
//! [`publish`] drives the last lifecycle step: finalize modules, hand the
//! record to the driver, mark it deployed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::record::{BuildInfo, RecordState, RecordStateError};

/// Errors for deployment
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error(transparent)]
    State(#[from] RecordStateError),

    #[error("Deployment failed: {0}")]
    Driver(String),
}

/// Publishes a finalized, reconciled record.
pub trait DeploymentDriver {
    fn deploy(&self, record: &BuildInfo) -> Result<(), DeployError>;
}

/// Writes the build-info document to a file
#[derive(Debug, Clone)]
pub struct JsonFileDriver {
    path: PathBuf,
}

impl JsonFileDriver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DeploymentDriver for JsonFileDriver {
    fn deploy(&self, record: &BuildInfo) -> Result<(), DeployError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, record.to_json()?)?;
        Ok(())
    }
}

/// Finalize modules, deploy through `driver`, and mark the record `Deployed`.
///
/// The record must be `Reconciled`. The driver sees the record before the
/// final transition, so a deployed document carries `"state": "RECONCILED"`.
/// If the driver fails the record stays `Reconciled` with its modules already
/// finalized.
pub fn publish(
    record: &mut BuildInfo,
    driver: &dyn DeploymentDriver,
    default_module_id: &str,
) -> Result<(), DeployError> {
    record.finalize_modules(default_module_id)?;

    if let Err(e) = driver.deploy(record) {
        warn!(build = %record.name(), number = %record.number(), error = %e, "deployment failed");
        return Err(e);
    }

    record.transition(RecordState::Deployed)?;
    info!(
        build = %record.name(),
        number = %record.number(),
        modules = record.modules().len(),
        "deployed record"
    );
    Ok(())
}
