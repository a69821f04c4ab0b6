//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (orchestrator.rs):
//!     Register units → Bind all listeners → Spawn serve task + shutdown watcher per unit
//!
//! Shutdown (shutdown.rs, coordinator.rs):
//!     Signal received or fatal serve error → Shutdown fires
//!     → every watcher drains its unit → wait() returns first fatal error
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - All listeners bind before any unit serves
//! - Shutdown has timeout: forced close after the grace period
//! - Requested shutdown never counts as failure

pub mod coordinator;
pub mod orchestrator;
pub mod shutdown;
pub mod signals;
pub mod unit;

pub use coordinator::FailFast;
pub use orchestrator::Orchestrator;
pub use shutdown::Shutdown;
pub use unit::{ServeFuture, ServiceUnit, UnitState, UnitStatus};
