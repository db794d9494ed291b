//! Traceability lookup contract

use crate::error::ScanError;
use crate::types::{Identifier, ResolutionToken, TraceabilityRecord};
use std::sync::Arc;

/// Resolves an identifier into a traceability record.
///
/// Failures are reported as `ScanError::NotFound` or `ScanError::Unavailable`.
/// The token is passed through for logging only; staleness is decided by the
/// controller when the result comes back.
#[async_trait::async_trait]
pub trait TraceabilityResolver: Send + Sync {
    async fn resolve(
        &self,
        identifier: &Identifier,
        token: ResolutionToken,
    ) -> Result<TraceabilityRecord, ScanError>;
}

#[async_trait::async_trait]
impl<T: TraceabilityResolver + ?Sized> TraceabilityResolver for Arc<T> {
    async fn resolve(
        &self,
        identifier: &Identifier,
        token: ResolutionToken,
    ) -> Result<TraceabilityRecord, ScanError> {
        (**self).resolve(identifier, token).await
    }
}

/// Lookup request issued by the controller on entering `Resolving`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    pub identifier: Identifier,
    pub token: ResolutionToken,
}
