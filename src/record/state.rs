//! Record lifecycle
//!
//! OPEN → RECONCILED → DEPLOYED. Transitions are one-way.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a build-info record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordState {
    /// Accepting appends from build steps
    #[default]
    Open,
    /// Reconciled against the artifact index
    Reconciled,
    /// Handed to the deployment driver
    Deployed,
}

impl RecordState {
    /// Check if transition from this state to target is valid
    pub fn can_transition_to(&self, target: RecordState) -> bool {
        matches!(
            (self, target),
            (RecordState::Open, RecordState::Reconciled)
                | (RecordState::Reconciled, RecordState::Deployed)
        )
    }
}

/// Errors for lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordStateError {
    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidTransition { from: RecordState, to: RecordState },

    #[error("Record is {actual:?}, expected {expected:?}")]
    WrongState {
        expected: RecordState,
        actual: RecordState,
    },
}
