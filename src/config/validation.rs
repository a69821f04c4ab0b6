//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (clap handles syntax)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Detect the two services claiming the same address
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before anything binds

use std::net::SocketAddr;

use thiserror::Error;

use super::schema::ServerConfig;

/// A single semantic problem with the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("gRPC server and gateway both bind {0}")]
    AddressConflict(String),

    #[error("upstream must be an http:// URI, got {0}")]
    InvalidUpstream(String),

    #[error("gRPC server binds an ephemeral port, so the gateway needs an explicit upstream")]
    UnreachableUpstream,

    #[error("grace period must be greater than zero")]
    ZeroGracePeriod,

    #[error("request timeout must be greater than zero")]
    ZeroRequestTimeout,

    #[error("unknown log level: {0}")]
    InvalidLogLevel(String),
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Check the configuration, collecting every problem found.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let rpc = parse_address("rpc.bind_address", &config.rpc.bind_address, &mut errors);
    let gateway = parse_address(
        "gateway.bind_address",
        &config.gateway.bind_address,
        &mut errors,
    );

    if let (Some(rpc), Some(gateway)) = (rpc, gateway) {
        // Port 0 asks the OS for a fresh port each time, so it never conflicts.
        if rpc == gateway && rpc.port() != 0 {
            errors.push(ValidationError::AddressConflict(rpc.to_string()));
        }
    }

    match &config.gateway.upstream {
        Some(upstream) if !upstream.starts_with("http://") => {
            errors.push(ValidationError::InvalidUpstream(upstream.clone()));
        }
        Some(_) => {}
        // The derived upstream reuses the configured port, which is unknown until bind.
        None if rpc.is_some_and(|addr| addr.port() == 0) => {
            errors.push(ValidationError::UnreachableUpstream);
        }
        None => {}
    }

    if config.lifecycle.grace_period_secs == 0 {
        errors.push(ValidationError::ZeroGracePeriod);
    }

    if config.gateway.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::InvalidLogLevel(
            config.observability.log_level.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn parse_address(
    field: &'static str,
    value: &str,
    errors: &mut Vec<ValidationError>,
) -> Option<SocketAddr> {
    match value.parse() {
        Ok(addr) => Some(addr),
        Err(_) => {
            errors.push(ValidationError::InvalidAddress {
                field,
                value: value.to_string(),
            });
            None
        }
    }
}
