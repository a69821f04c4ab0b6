//! Command-line and environment overrides.
//!
//! Every flag is optional; anything not given keeps its default from
//! [`ServerConfig::default`].

use clap::Parser;

use super::schema::{LogFormat, ServerConfig};
use super::validation::validate_config;
use crate::error::ConfigError;

#[derive(Debug, Parser)]
#[command(name = "gatewayd")]
#[command(about = "gRPC server and HTTP/JSON gateway under one supervisor", long_about = None)]
pub struct Cli {
    /// gRPC server bind address.
    #[arg(long, env = "GATEWAYD_RPC_ADDR")]
    pub rpc_addr: Option<String>,

    /// HTTP gateway bind address.
    #[arg(long, env = "GATEWAYD_GATEWAY_ADDR")]
    pub gateway_addr: Option<String>,

    /// gRPC server URI the gateway forwards to.
    #[arg(long, env = "GATEWAYD_UPSTREAM")]
    pub upstream: Option<String>,

    /// Seconds each service may spend draining before it is force-closed.
    #[arg(long, env = "GATEWAYD_GRACE_PERIOD_SECS")]
    pub grace_period_secs: Option<u64>,

    /// Gateway per-request timeout in seconds.
    #[arg(long, env = "GATEWAYD_REQUEST_TIMEOUT_SECS")]
    pub request_timeout_secs: Option<u64>,

    #[arg(long, env = "GATEWAYD_LOG_LEVEL")]
    pub log_level: Option<String>,

    #[arg(long, value_enum, env = "GATEWAYD_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    /// Path or full gRPC method to keep out of the access log (repeatable).
    #[arg(long = "suppress-path")]
    pub suppress_paths: Vec<String>,

    /// Extra header to forward verbatim to the gRPC server (repeatable).
    #[arg(long = "forward-header")]
    pub forward_headers: Vec<String>,
}

impl Cli {
    /// Apply the overrides on top of the defaults and validate the result.
    pub fn into_config(self) -> Result<ServerConfig, ConfigError> {
        let mut config = ServerConfig::default();

        if let Some(addr) = self.rpc_addr {
            config.rpc.bind_address = addr;
        }
        if let Some(addr) = self.gateway_addr {
            config.gateway.bind_address = addr;
        }
        if self.upstream.is_some() {
            config.gateway.upstream = self.upstream;
        }
        if let Some(secs) = self.grace_period_secs {
            config.lifecycle.grace_period_secs = secs;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.gateway.request_timeout_secs = secs;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
        if !self.suppress_paths.is_empty() {
            config.observability.suppressed_paths = self.suppress_paths;
        }
        for header in self.forward_headers {
            let header = header.to_ascii_lowercase();
            if !config.gateway.forwarded_headers.contains(&header) {
                config.gateway.forwarded_headers.push(header);
            }
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}
