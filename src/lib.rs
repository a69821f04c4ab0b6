//! gatewayd: a gRPC server and its HTTP/JSON gateway under one supervisor.
//!
//! # Architecture Overview
//!
//! ```text
//!   SIGINT/SIGTERM ──▶ lifecycle::signals ──▶ Shutdown
//!                                               │
//!                                               ▼
//!                    ┌──────────────── lifecycle::Orchestrator ────────────────┐
//!                    │  bind all listeners, then per unit:                      │
//!                    │    serve task ── fatal error ──▶ FailFast ──▶ Shutdown   │
//!                    │    shutdown watcher ── drain within grace period          │
//!                    └──────────────┬──────────────────────────┬────────────────┘
//!                                   │                          │
//!                        ┌──────────▼─────────┐     ┌──────────▼─────────┐
//!   HTTP/JSON client ───▶│ http::GatewayService│────▶│  rpc::RpcService   │◀─── gRPC client
//!                        │ access_log middleware│ gRPC│  RpcLogLayer       │
//!                        └──────────┬─────────┘     └──────────┬─────────┘
//!                                   └────────────┬─────────────┘
//!                                                ├──▶ net::serve (owned connection tasks)
//!                                                ▼
//!                                observability::logging::RequestLogger
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod rpc;

pub use config::ServerConfig;
pub use error::{LifecycleError, ServeError};
pub use lifecycle::{Orchestrator, ServiceUnit, Shutdown};
