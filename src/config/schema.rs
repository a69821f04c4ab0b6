//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the daemon.
//! Every section has defaults so the daemon runs with no flags at all;
//! flags and environment variables (see `cli.rs`) override them.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use super::validation::ValidationError;
use crate::error::ConfigError;

/// Health-check identifiers that are never written to the access log.
pub const DEFAULT_SUPPRESSED_PATHS: [&str; 2] = ["/health", "/grpc.health.v1.Health/Check"];

/// Root configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    /// gRPC server settings.
    pub rpc: RpcConfig,

    /// HTTP gateway settings.
    pub gateway: GatewayConfig,

    /// Startup and shutdown behaviour.
    pub lifecycle: LifecycleConfig,

    /// Logging settings.
    pub observability: ObservabilityConfig,
}

impl ServerConfig {
    /// Upstream URI the gateway dials.
    ///
    /// Falls back to the gRPC bind address, with an unspecified IP replaced
    /// by loopback so the gateway can actually connect to it.
    pub fn upstream_uri(&self) -> String {
        if let Some(upstream) = &self.gateway.upstream {
            return upstream.clone();
        }
        match self.rpc.bind_address.parse::<SocketAddr>() {
            Ok(mut addr) => {
                if addr.ip().is_unspecified() {
                    let loopback = match addr.ip() {
                        IpAddr::V4(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
                        IpAddr::V6(_) => IpAddr::V6(Ipv6Addr::LOCALHOST),
                    };
                    addr.set_ip(loopback);
                }
                format!("http://{}", addr)
            }
            Err(_) => format!("http://{}", self.rpc.bind_address),
        }
    }

    /// Parsed bind addresses of the gRPC server and the gateway, in that order.
    pub fn bind_addresses(&self) -> Result<(SocketAddr, SocketAddr), ConfigError> {
        let parse = |field: &'static str, value: &str| {
            value
                .parse::<SocketAddr>()
                .map_err(|_| ValidationError::InvalidAddress {
                    field,
                    value: value.to_string(),
                })
        };
        let rpc = parse("rpc.bind_address", &self.rpc.bind_address);
        let gateway = parse("gateway.bind_address", &self.gateway.bind_address);
        match (rpc, gateway) {
            (Ok(rpc), Ok(gateway)) => Ok((rpc, gateway)),
            (rpc, gateway) => Err(ConfigError::Validation(
                [rpc.err(), gateway.err()].into_iter().flatten().collect(),
            )),
        }
    }
}

/// gRPC server configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Bind address (e.g., "0.0.0.0:9090").
    pub bind_address: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// HTTP gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// gRPC server URI; derived from the gRPC bind address when unset.
    pub upstream: Option<String>,

    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// Headers forwarded to the gRPC server verbatim, on top of the default rules.
    pub forwarded_headers: Vec<String>,
}

impl GatewayConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            upstream: None,
            request_timeout_secs: 30,
            forwarded_headers: vec!["authorization".to_string()],
        }
    }
}

/// Lifecycle configuration.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Time each service gets to drain in-flight requests before force-close.
    pub grace_period_secs: u64,
}

impl LifecycleConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.grace_period_secs)
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 10,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Human-readable output for development.
    Pretty,
    /// One JSON object per line for log aggregation.
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Output format.
    pub log_format: LogFormat,

    /// Paths and full gRPC methods excluded from the access log.
    pub suppressed_paths: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            suppressed_paths: DEFAULT_SUPPRESSED_PATHS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}
