//! Scan pipeline configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default lookup service root
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000/api/";

/// Scan pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Sampling interval while capturing
    pub tick_interval_ms: u64,
    /// Consecutive frame-less ticks before a warning is logged (0 disables)
    pub stalled_frame_warning_ticks: u32,
    /// Runtime command channel capacity
    pub command_buffer: usize,
    /// Lookup service settings
    pub resolver: ResolverConfig,
}

impl ScanConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With sampling interval, rounded up to whole milliseconds
    #[inline]
    #[must_use]
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        let millis = interval.as_nanos().div_ceil(1_000_000);
        self.tick_interval_ms = u64::try_from(millis).unwrap_or(u64::MAX);
        self
    }

    /// With frame starvation warning threshold
    #[inline]
    #[must_use]
    pub fn with_stalled_frame_warning(mut self, ticks: u32) -> Self {
        self.stalled_frame_warning_ticks = ticks;
        self
    }

    /// With lookup service root
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.resolver.base_url = base_url.into();
        self
    }

    #[inline]
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.command_buffer == 0 {
            return Err(ConfigError::InvalidValue {
                field: "command_buffer",
                reason: "must be greater than zero".to_string(),
            });
        }
        self.resolver.validate()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 500,
            stalled_frame_warning_ticks: 20,
            command_buffer: 32,
            resolver: ResolverConfig::default(),
        }
    }
}

/// Lookup service settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Service root; `traceability/{identifier}` is appended
    pub base_url: String,
    /// Per-request timeout
    pub timeout_ms: u64,
}

impl ResolverConfig {
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "resolver.timeout_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        let url = url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "resolver.base_url",
            reason: e.to_string(),
        })?;
        if url.cannot_be_a_base() {
            return Err(ConfigError::InvalidValue {
                field: "resolver.base_url",
                reason: "must be a hierarchical URL".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_ms: 10_000,
        }
    }
}
