//! HTTP client for the traceability lookup service
//!
//! Implements `TraceabilityResolver` over `GET {base}/traceability/{identifier}`.
//! Response interpretation is a pure function so it can be exercised without
//! a server.

#![allow(missing_docs)]

mod wire;

pub use wire::interpret_response;

use labeltrace_core::{Identifier, ResolutionToken, ResolverConfig, ScanError, TraceabilityRecord, TraceabilityResolver};
use url::Url;

/// Resolver construction errors
#[derive(Debug, thiserror::Error)]
pub enum HttpResolverError {
    /// Base URL is unparseable or cannot carry path segments
    #[error("invalid base url {url}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// HTTP client could not be built
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Traceability lookups over HTTP
#[derive(Debug, Clone)]
pub struct HttpTraceabilityResolver {
    base_url: Url,
    http_client: reqwest::Client,
}

impl HttpTraceabilityResolver {
    /// Create a resolver from configuration
    pub fn new(config: &ResolverConfig) -> Result<Self, HttpResolverError> {
        let base_url = Url::parse(&config.base_url).map_err(|e| HttpResolverError::InvalidBaseUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(HttpResolverError::InvalidBaseUrl {
                url: config.base_url.clone(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            base_url,
            http_client,
        })
    }

    /// Service root this resolver queries
    #[inline]
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Lookup URL for an identifier.
    ///
    /// The identifier is pushed as one path segment, so `/`, `?` and `#`
    /// inside it are percent-encoded rather than changing the route. Empty
    /// and dot-segment identifiers cannot name a product and are `NotFound`.
    pub fn lookup_url(&self, identifier: &Identifier) -> Result<Url, ScanError> {
        if matches!(identifier.as_str(), "" | "." | "..") {
            return Err(ScanError::NotFound(format!(
                "invalid identifier {:?}",
                identifier.as_str()
            )));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ScanError::Unavailable("base url cannot carry a path".to_string()))?
            .pop_if_empty()
            .push("traceability")
            .push(identifier.as_str());
        Ok(url)
    }
}

#[async_trait::async_trait]
impl TraceabilityResolver for HttpTraceabilityResolver {
    async fn resolve(
        &self,
        identifier: &Identifier,
        token: ResolutionToken,
    ) -> Result<TraceabilityRecord, ScanError> {
        let url = self.lookup_url(identifier)?;
        tracing::debug!(url = %url, token = %token, "requesting traceability record");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport_error)?;
        tracing::debug!(status, bytes = body.len(), token = %token, "traceability response");

        interpret_response(status, &body)
    }
}

fn transport_error(err: reqwest::Error) -> ScanError {
    if err.is_timeout() {
        ScanError::Unavailable("request timed out".to_string())
    } else if err.is_connect() {
        ScanError::Unavailable(format!("connection failed: {err}"))
    } else {
        ScanError::Unavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(base: &str) -> HttpTraceabilityResolver {
        let config = ResolverConfig {
            base_url: base.to_string(),
            ..Default::default()
        };
        HttpTraceabilityResolver::new(&config).unwrap()
    }

    #[test]
    fn lookup_url_with_trailing_slash() {
        let url = resolver("http://localhost:5000/api/")
            .lookup_url(&Identifier::new("ABC123"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/traceability/ABC123");
    }

    #[test]
    fn lookup_url_without_trailing_slash() {
        let url = resolver("http://localhost:5000/api")
            .lookup_url(&Identifier::new("ABC123"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:5000/api/traceability/ABC123");
    }

    #[test]
    fn identifier_is_one_segment() {
        let url = resolver("https://trace.example/")
            .lookup_url(&Identifier::new("a/b?c#d"))
            .unwrap();
        assert_eq!(url.path(), "/traceability/a%2Fb%3Fc%23d");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn dot_segments_never_reach_the_wire() {
        let http = resolver("http://localhost:5000/api/");
        for id in ["", ".", ".."] {
            let err = http.lookup_url(&Identifier::new(id)).unwrap_err();
            assert_eq!(err.kind(), labeltrace_core::ErrorKind::NotFound, "identifier {id:?}");
        }

        let url = http.lookup_url(&Identifier::new("...")).unwrap();
        assert_eq!(url.path(), "/api/traceability/...");
    }

    #[test]
    fn rejects_hostless_base() {
        let config = ResolverConfig {
            base_url: "mailto:qa@example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            HttpTraceabilityResolver::new(&config),
            Err(HttpResolverError::InvalidBaseUrl { .. })
        ));
    }
}
