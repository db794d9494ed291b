//! Core types for LabelTrace
//!
//! Defines the data that flows through the scan pipeline:
//! - Session and resolution identifiers
//! - Canonical lookup identifiers
//! - Traceability records returned by the lookup service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique scan session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate new session ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque tag for one outstanding lookup.
///
/// Only token identity is compared when a lookup settles, never the
/// identifier, so a rescan of the same code still supersedes a stale request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolutionToken(pub Uuid);

impl ResolutionToken {
    /// Generate a fresh token
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ResolutionToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ResolutionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Canonical string used to query the traceability service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap an already-canonical identifier
    #[inline]
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Aggregate returned by the traceability service for one identifier.
///
/// Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceabilityRecord {
    pub product: ProductSnapshot,
    #[serde(default)]
    pub quality_checks: Vec<QualityCheck>,
    #[serde(default)]
    pub labels: Vec<LabelEntry>,
    #[serde(default)]
    pub workflow_logs: Vec<WorkflowLogEntry>,
    /// 0..=100
    #[serde(default)]
    pub traceability_score: f64,
    #[serde(default)]
    pub compliance_status: ComplianceStatus,
}

impl TraceabilityRecord {
    /// Quality checks that did not pass
    pub fn failed_checks(&self) -> impl Iterator<Item = &QualityCheck> {
        self.quality_checks
            .iter()
            .filter(|c| c.status.as_deref() == Some("failed"))
    }

    /// Number of labels that have been verified
    #[must_use]
    pub fn verified_label_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_verified).count()
    }
}

/// Product snapshot at lookup time
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub manufacturing_date: Option<String>,
    #[serde(default)]
    pub expiry_date: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub auto_label_enabled: Option<bool>,
    #[serde(default)]
    pub workflow_status: Option<String>,
    /// Human-readable shelf-life verdict
    #[serde(default)]
    pub quality_status: Option<String>,
    #[serde(default)]
    pub is_good: Option<bool>,
}

/// One quality check.
///
/// The service returns either recorded checks or, when none exist, catalog
/// parameters for the product; both shapes land here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualityCheck {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(alias = "parameter")]
    pub parameter_name: String,
    #[serde(default, alias = "expected")]
    pub expected_value: Option<String>,
    #[serde(default)]
    pub actual_value: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    /// passed, failed or pending
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub checked_by: Option<String>,
    #[serde(default)]
    pub checked_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub auto_generated: Option<bool>,
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
}

/// One generated label
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub label_type: String,
    #[serde(default)]
    pub label_data: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub generated_at: Option<String>,
    #[serde(default)]
    pub verified_at: Option<String>,
    #[serde(default)]
    pub auto_generated: Option<bool>,
    #[serde(default)]
    pub print_status: Option<String>,
    #[serde(default)]
    pub has_image: Option<bool>,
}

/// One workflow log line
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowLogEntry {
    #[serde(default)]
    pub id: Option<String>,
    pub action: String,
    /// success, failed or in_progress
    pub status: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Compliance verdict computed by the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    Compliant,
    NonCompliant,
    Pending,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ComplianceStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "compliant",
            Self::NonCompliant => "non_compliant",
            Self::Pending => "pending",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ComplianceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
