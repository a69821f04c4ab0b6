//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! built-in defaults (schema.rs)
//!     → cli.rs (flags and GATEWAYD_* environment overrides)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → handed to each service at construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults so no flag is required
//! - No config files: flags and environment only

pub mod cli;
pub mod schema;
pub mod validation;

pub use cli::Cli;
pub use schema::{
    GatewayConfig, LifecycleConfig, LogFormat, ObservabilityConfig, RpcConfig, ServerConfig,
};
