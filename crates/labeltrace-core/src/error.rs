//! Error types for LabelTrace Core
//!
//! The scan pipeline distinguishes four failure kinds:
//! - Camera device failures (fatal to the session)
//! - Frames not yet available (transient, never surfaced)
//! - Identifiers the lookup service does not know
//! - Lookup service/transport failures

use crate::state_machine::ScanState;
use std::path::PathBuf;

/// Main scan pipeline error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// Camera permission denied or no device present
    #[error("camera device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Device acquired but no frame produced yet
    #[error("no frame available")]
    NoFrameAvailable,

    /// Identifier did not resolve to a traceability record
    #[error("identifier not found: {0}")]
    NotFound(String),

    /// Lookup service or transport failure
    #[error("traceability service unavailable: {0}")]
    Unavailable(String),

    /// State machine rejected a transition
    #[error("illegal scan transition: {from:?} -> {to:?}")]
    IllegalTransition { from: ScanState, to: ScanState },

    /// The runtime task driving the controller has exited
    #[error("scan runtime is no longer running")]
    RuntimeClosed,
}

impl ScanError {
    /// Project onto the copyable kind carried by events
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeviceUnavailable(_) => ErrorKind::DeviceUnavailable,
            Self::NoFrameAvailable => ErrorKind::NoFrameAvailable,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::IllegalTransition { .. } | Self::RuntimeClosed => ErrorKind::Internal,
        }
    }

    /// Whether this error is reported to the presenter.
    ///
    /// Missing frames are steady-state behaviour and are skipped silently.
    #[inline]
    #[must_use]
    pub fn is_surfaced(&self) -> bool {
        !matches!(self, Self::NoFrameAvailable)
    }

    /// Whether this error ends the current scan
    #[inline]
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable(_) | Self::NotFound(_) | Self::Unavailable(_)
        )
    }
}

/// Error classification carried by `ScanEvent`s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DeviceUnavailable,
    NoFrameAvailable,
    NotFound,
    Unavailable,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::DeviceUnavailable => "device unavailable",
            Self::NoFrameAvailable => "no frame available",
            Self::NotFound => "not found",
            Self::Unavailable => "service unavailable",
            Self::Internal => "internal error",
        };
        f.write_str(s)
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `ScanConfig`
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A field holds an unusable value
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
