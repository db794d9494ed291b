//! Payload normalization
//!
//! Turns whatever an optical code encoded into the identifier the lookup
//! service understands. A payload is either a bare identifier or a URL whose
//! final path segment is the identifier.

use crate::types::Identifier;
use url::Url;

/// Derive the canonical lookup identifier from a decoded payload.
///
/// Total: every input produces exactly one identifier. Applying it to its own
/// output returns the output unchanged.
#[must_use]
pub fn normalize(payload: &str) -> Identifier {
    let mut current = payload.trim().to_string();
    loop {
        // Each changing step drops a URL scheme, so this ends.
        let next = normalize_once(&current);
        if next == current {
            return Identifier::new(current);
        }
        current = next;
    }
}

fn normalize_once(trimmed: &str) -> String {
    match Url::parse(trimmed) {
        Ok(url) => last_segment(&url).unwrap_or(trimmed).trim().to_string(),
        Err(_) => trimmed.to_string(),
    }
}

/// Final non-empty path segment, still percent-encoded.
///
/// Opaque URLs (`mailto:`, `urn:`) have no segment list, so their path is
/// split on `/` directly.
fn last_segment(url: &Url) -> Option<&str> {
    let usable = |s: &&str| !s.trim().is_empty();
    if url.cannot_be_a_base() {
        url.path().split('/').filter(usable).last()
    } else {
        url.path_segments()
            .and_then(|segments| segments.filter(usable).last())
    }
}
