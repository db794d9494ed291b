//! LabelTrace Core - scan acquisition and identifier resolution
//!
//! Turns a live camera feed into a traceability record:
//! - Samples frames on a fixed cadence and runs an external decoder on them
//! - Normalizes the decoded payload into a lookup identifier
//! - Drives exactly one lookup per scan session, discarding stale results
//! - Emits state and outcome events for a presenter
//!
//! # Example
//!
//! ```rust,ignore
//! use labeltrace_core::prelude::*;
//!
//! # async fn example(camera: impl FrameSource + 'static,
//! #                  decoder: impl CodeDecoder + 'static,
//! #                  resolver: impl TraceabilityResolver + 'static) -> Result<(), ScanError> {
//! let config = ScanConfig::new();
//! let (controller, mut events) = ScanController::new(camera, decoder, &config);
//! let (handle, _task) = ScanRuntime::spawn(controller, resolver, &config);
//!
//! handle.start().await?;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod controller;
pub mod decoder;
pub mod error;
pub mod event;
pub mod frame;
pub mod normalize;
pub mod resolver;
pub mod runtime;
pub mod state_machine;
pub mod types;

pub use config::{ResolverConfig, ScanConfig, DEFAULT_BASE_URL};
pub use controller::{ScanController, ScanSession};
pub use decoder::{CodeDecoder, DecodedPayload};
pub use error::{ConfigError, ErrorKind, ScanError};
pub use event::{EventReceiver, ScanEvent};
pub use frame::{Frame, FrameSource};
pub use normalize::normalize;
pub use resolver::{ResolutionRequest, TraceabilityResolver};
pub use runtime::{ScanHandle, ScanRuntime};
pub use state_machine::ScanState;
pub use types::{
    ComplianceStatus, Identifier, LabelEntry, ProductSnapshot, QualityCheck, ResolutionToken,
    SessionId, TraceabilityRecord, WorkflowLogEntry,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for wiring a scanner
    pub use crate::{
        normalize, CodeDecoder, ErrorKind, Frame, FrameSource, Identifier, ScanConfig,
        ScanController, ScanError, ScanEvent, ScanHandle, ScanRuntime, ScanState,
        TraceabilityRecord, TraceabilityResolver,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
