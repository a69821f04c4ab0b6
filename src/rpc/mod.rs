//! gRPC subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection (listener bound by the orchestrator)
//!     → server.rs (tonic server: health + reflection)
//!     → logging.rs (one access event per call)
//!     → status.rs (code names, HTTP mapping for the gateway)
//! ```

pub mod logging;
pub mod server;
pub mod status;

pub use logging::RpcLogLayer;
pub use server::RpcService;
