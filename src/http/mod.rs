//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (listener bound by the orchestrator)
//!     → server.rs (Axum setup, graceful drain)
//!     → request.rs (assign x-request-id)
//!     → middleware/logging.rs (access log, via capture.rs)
//!     → gateway routes (HTTP/JSON → gRPC)
//! ```

pub mod capture;
pub mod middleware;
pub mod request;
pub mod server;

pub use capture::ResponseCapture;
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::GatewayService;
