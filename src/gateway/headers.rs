//! Which HTTP headers reach the gRPC server, and under what name.
//!
//! Rules, in order:
//! 1. Headers in the forwarded set (always `authorization` and
//!    `x-request-id`) pass through under their own name.
//! 2. Permanent HTTP headers pass through prefixed with `grpcgateway-`.
//! 3. `Grpc-Metadata-*` headers pass through with the prefix stripped.
//! 4. Everything else is dropped.

use std::collections::HashSet;

use http::HeaderMap;
use tonic::metadata::{Ascii, AsciiMetadataValue, MetadataKey, MetadataMap};

use crate::http::request::X_REQUEST_ID;

/// Prefix given to permanent HTTP headers.
pub const GATEWAY_PREFIX: &str = "grpcgateway-";

/// Prefix that marks a header as explicit gRPC metadata.
pub const METADATA_HEADER_PREFIX: &str = "grpc-metadata-";

const PERMANENT_HEADERS: [&str; 24] = [
    "accept",
    "accept-charset",
    "accept-language",
    "accept-ranges",
    "authorization",
    "cache-control",
    "content-type",
    "cookie",
    "date",
    "expect",
    "from",
    "host",
    "if-match",
    "if-modified-since",
    "if-none-match",
    "if-schedule-tag-match",
    "if-unmodified-since",
    "max-forwards",
    "origin",
    "pragma",
    "referer",
    "user-agent",
    "via",
    "warning",
];

/// Default rule for headers not in the forwarded set.
pub fn default_matcher(key: &str) -> Option<String> {
    let key = key.to_ascii_lowercase();
    if PERMANENT_HEADERS.contains(&key.as_str()) {
        return Some(format!("{GATEWAY_PREFIX}{key}"));
    }
    key.strip_prefix(METADATA_HEADER_PREFIX)
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

/// Maps incoming HTTP headers to outgoing gRPC metadata.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    forwarded: HashSet<String>,
}

impl Default for HeaderMatcher {
    fn default() -> Self {
        Self::new(["authorization"])
    }
}

impl HeaderMatcher {
    pub fn new<I, S>(forwarded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut forwarded: HashSet<String> = forwarded
            .into_iter()
            .map(|h| h.as_ref().to_ascii_lowercase())
            .collect();
        forwarded.insert("authorization".to_string());
        forwarded.insert(X_REQUEST_ID.to_string());
        Self { forwarded }
    }

    /// Metadata key for an HTTP header, or `None` to drop it.
    pub fn matches(&self, key: &str) -> Option<String> {
        let lower = key.to_ascii_lowercase();
        if self.forwarded.contains(&lower) {
            return Some(lower);
        }
        default_matcher(&lower)
    }

    /// Copy every matching header into `metadata`.
    pub fn forward(&self, headers: &HeaderMap, metadata: &mut MetadataMap) {
        for (name, value) in headers {
            let Some(key) = self.matches(name.as_str()) else {
                continue;
            };
            let key = match MetadataKey::<Ascii>::from_bytes(key.as_bytes()) {
                Ok(key) => key,
                Err(_) => {
                    tracing::debug!(header = %name, "Header is not valid gRPC metadata, dropped");
                    continue;
                }
            };
            let Some(value) = value
                .to_str()
                .ok()
                .and_then(|v| v.parse::<AsciiMetadataValue>().ok())
            else {
                tracing::debug!(header = %name, "Header value is not ASCII, dropped");
                continue;
            };
            metadata.append(key, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn authorization_forwarded_verbatim() {
        let matcher = HeaderMatcher::default();
        assert_eq!(matcher.matches("Authorization").as_deref(), Some("authorization"));
    }

    #[test]
    fn permanent_headers_prefixed() {
        let matcher = HeaderMatcher::default();
        assert_eq!(matcher.matches("User-Agent").as_deref(), Some("grpcgateway-user-agent"));
    }

    #[test]
    fn metadata_headers_stripped() {
        let matcher = HeaderMatcher::default();
        assert_eq!(matcher.matches("Grpc-Metadata-Tenant").as_deref(), Some("tenant"));
        assert_eq!(matcher.matches("grpc-metadata-"), None);
    }

    #[test]
    fn other_headers_dropped() {
        let matcher = HeaderMatcher::default();
        assert_eq!(matcher.matches("x-custom"), None);
    }

    #[test]
    fn configured_headers_forwarded() {
        let matcher = HeaderMatcher::new(["X-Tenant"]);
        assert_eq!(matcher.matches("x-tenant").as_deref(), Some("x-tenant"));
        assert_eq!(matcher.matches("authorization").as_deref(), Some("authorization"));
    }

    #[test]
    fn forward_builds_metadata() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer t0ken"));
        headers.insert("x-request-id", HeaderValue::from_static("req-1"));
        headers.insert("grpc-metadata-tenant", HeaderValue::from_static("acme"));
        headers.insert("x-ignored", HeaderValue::from_static("nope"));

        let mut metadata = MetadataMap::new();
        HeaderMatcher::default().forward(&headers, &mut metadata);

        assert_eq!(metadata.get("authorization").unwrap().to_str().unwrap(), "Bearer t0ken");
        assert_eq!(metadata.get("x-request-id").unwrap().to_str().unwrap(), "req-1");
        assert_eq!(metadata.get("tenant").unwrap().to_str().unwrap(), "acme");
        assert!(metadata.get("x-ignored").is_none());
    }
}
