//! Scan state machine
//!
//! The states a scan session moves through and the table of legal
//! transitions between them. Every controller state change is checked
//! against `validate_transition` before any event is emitted.

use crate::error::ScanError;
use serde::{Deserialize, Serialize};

/// Observable state of the scan controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Capturing,
    Detected,
    Resolving,
    Resolved,
    Failed,
    Stopped,
}

impl ScanState {
    /// States that end a scan without further automatic sampling
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Failed)
    }

    /// States that hold the camera device
    #[inline]
    #[must_use]
    pub fn holds_device(self) -> bool {
        !matches!(self, Self::Idle | Self::Stopped)
    }
}

/// Validates a state transition.
///
/// Every release of the device passes through `Stopped`, so a restart from
/// any non-idle state is `.. -> Stopped -> Idle -> Capturing`.
pub fn validate_transition(from: ScanState, to: ScanState) -> Result<(), ScanError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(ScanError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: ScanState) -> Vec<ScanState> {
    use ScanState::*;
    match from {
        Idle => vec![Capturing],
        Capturing => vec![Detected, Stopped],
        Detected => vec![Resolving, Stopped],
        Resolving => vec![Resolved, Failed, Stopped],
        Resolved => vec![Stopped],
        Failed => vec![Stopped],
        Stopped => vec![Idle],
    }
}

fn allowed(from: ScanState, to: ScanState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
