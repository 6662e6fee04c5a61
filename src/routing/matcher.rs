//! Request path matching.
//!
//! # Responsibilities
//! - Split `/api/{service}/rest` into the service key and the forwarded remainder
//! - Service segment is case-insensitive; the remainder is kept verbatim
//!
//! # Design Decisions
//! - No regex in hot path (one prefix check and one split)
//! - The API prefix must be followed by `/` so `/apiary` never matches `/api`

/// A request path addressed to a service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePath<'a> {
    /// Lowercased service segment.
    pub service_key: String,
    /// Path after `/{prefix}/{service}`, `""` or starting with `/`.
    pub remainder: &'a str,
}

impl ServicePath<'_> {
    /// Path to send upstream: the first two segments removed, never empty.
    pub fn forward_path(&self) -> &str {
        if self.remainder.is_empty() {
            "/"
        } else {
            self.remainder
        }
    }
}

/// Match `path` against `{api_prefix}/{service}/**`.
pub fn split_service_path<'a>(api_prefix: &str, path: &'a str) -> Option<ServicePath<'a>> {
    let rest = path.strip_prefix(api_prefix)?.strip_prefix('/')?;
    let (segment, remainder) = match rest.find('/') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
    };
    if segment.is_empty() {
        return None;
    }
    Some(ServicePath {
        service_key: segment.to_lowercase(),
        remainder,
    })
}
