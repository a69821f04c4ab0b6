//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Listener bound by the orchestrator
//!     → connection.rs (accept loop, one task per connection)
//!     → hyper HTTP/1 or HTTP/2 (auto-detected)
//!     → tower service (axum router or gRPC routes)
//!
//! Connection States:
//!     Active → Draining (drain fired) → Closed
//!                 └─ force-closed when the serve future is dropped
//! ```
//!
//! # Design Decisions
//! - Connections are owned by the serve future, never detached
//! - Dropping the serve future aborts every connection it accepted

pub mod connection;

pub use connection::serve;
