//! HTTP/JSON to gRPC translation.
//!
//! # Data Flow
//! ```text
//! HTTP request (after request ID + access log middleware)
//!     → translate.rs (route → gRPC request, JSON ↔ proto)
//!     → headers.rs (HTTP headers → gRPC metadata)
//!     → gRPC server over a lazily connected channel
//!     → gRPC status → HTTP status + JSON error body
//! ```

pub mod headers;
pub mod translate;

pub use headers::HeaderMatcher;
pub use translate::{routes, GatewayError, GatewayState};
