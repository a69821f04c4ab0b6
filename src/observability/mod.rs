//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Lifecycle events (started, gracefully shutdown, failures)
//!     → tracing macros at the call site
//!
//! Access events:
//!     rpc::logging (tower layer)      ─┐
//!     http::middleware::logging (axum) ─┴→ logging.rs (RequestLogger) → tracing
//!
//! Consumers:
//!     → stdout, pretty or JSON
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - One event per request, same shape for both protocols
//! - Health checks never reach the access log

pub mod logging;

pub use logging::{RequestEvent, RequestLogger};
