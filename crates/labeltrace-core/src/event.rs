//! Events emitted to the presenter

use crate::error::ErrorKind;
use crate::state_machine::ScanState;
use crate::types::{Identifier, TraceabilityRecord};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Scan progress as seen by the presenter.
///
/// Per scan the order is `StateChanged`, `CodeDetected`, then exactly one of
/// `ResolutionSucceeded` or `ResolutionFailed`. Entering `Resolved`/`Failed`
/// is announced by the outcome event itself.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    StateChanged(ScanState),
    CodeDetected {
        identifier: Identifier,
        /// Raw decoded payload
        payload: String,
    },
    ResolutionSucceeded(Arc<TraceabilityRecord>),
    ResolutionFailed(ErrorKind),
    /// Camera permission or hardware failure
    DeviceFailed(ErrorKind),
}

impl ScanEvent {
    /// Whether the event reports an error
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::ResolutionFailed(_) | Self::DeviceFailed(_))
    }
}

pub type EventReceiver = mpsc::UnboundedReceiver<ScanEvent>;

/// Sending half owned by the controller.
///
/// A dropped receiver is not an error: the presenter may go away first.
#[derive(Debug, Clone)]
pub(crate) struct EventSink {
    tx: mpsc::UnboundedSender<ScanEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, EventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub(crate) fn emit(&self, event: ScanEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("event receiver dropped");
        }
    }
}
