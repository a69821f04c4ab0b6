//! Error types shared across subsystems.
//!
//! # Taxonomy
//! ```text
//! LifecycleError::Bind       → listener could not be created, startup aborted
//! LifecycleError::Serve      → server failed outside of a requested shutdown
//! ServeError::Closed         → server stopped because shutdown was requested (benign)
//! ShutdownError              → drain did not finish cleanly (logged, never fatal)
//! ConfigError                → configuration rejected before anything binds
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::validation::ValidationError;

/// Why a service's serve loop returned.
///
/// Sources are wrapped in `Arc` so the first fatal error can be handed out
/// from the coordinator while still being logged at the failure site.
#[derive(Debug, Clone, Error)]
pub enum ServeError {
    /// The listener was closed intentionally as part of a graceful stop.
    #[error("server closed")]
    Closed,

    /// The gRPC transport failed.
    #[error("transport error: {0}")]
    Transport(Arc<tonic::transport::Error>),

    /// Accepting or serving connections failed.
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The server could not be assembled.
    #[error("server setup failed: {0}")]
    Setup(String),

    /// The serve task panicked.
    #[error("server task panicked: {0}")]
    Panicked(String),
}

impl ServeError {
    /// Returns true if this outcome was caused by a requested shutdown.
    pub fn is_shutdown(&self) -> bool {
        matches!(self, ServeError::Closed)
    }
}

impl From<std::io::Error> for ServeError {
    fn from(err: std::io::Error) -> Self {
        ServeError::Io(Arc::new(err))
    }
}

impl From<tonic::transport::Error> for ServeError {
    fn from(err: tonic::transport::Error) -> Self {
        ServeError::Transport(Arc::new(err))
    }
}

/// Fatal orchestration errors. Any of these makes the process exit non-zero.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    /// A listener could not be bound.
    #[error("failed to bind {service} on {address}: {source}")]
    Bind {
        service: String,
        address: SocketAddr,
        #[source]
        source: Arc<std::io::Error>,
    },

    /// A service stopped serving for a reason other than shutdown.
    #[error("{service} failed: {source}")]
    Serve {
        service: String,
        #[source]
        source: ServeError,
    },

    /// `register` or `start` was called after orchestration began.
    #[error("orchestrator already started")]
    AlreadyStarted,
}

/// A drain that did not complete cleanly.
#[derive(Debug, Clone, Error)]
pub enum ShutdownError {
    #[error("grace period of {0:?} exceeded, in-flight connections force-closed")]
    GraceExceeded(Duration),

    /// The server returned an error while draining.
    #[error("server failed while draining: {0}")]
    Failed(ServeError),
}

/// Configuration rejected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_closed_is_shutdown() {
        assert!(ServeError::Closed.is_shutdown());
        assert!(!ServeError::from(std::io::Error::other("boom")).is_shutdown());
        assert!(!ServeError::Setup("bad".into()).is_shutdown());
    }

    #[test]
    fn bind_error_names_service_and_address() {
        let err = LifecycleError::Bind {
            service: "grpc server".into(),
            address: "127.0.0.1:9090".parse().unwrap(),
            source: Arc::new(std::io::Error::from(std::io::ErrorKind::AddrInUse)),
        };
        let text = err.to_string();
        assert!(text.contains("grpc server"));
        assert!(text.contains("127.0.0.1:9090"));
    }

    #[test]
    fn config_error_lists_every_problem() {
        let err = ConfigError::Validation(vec![
            ValidationError::ZeroGracePeriod,
            ValidationError::ZeroRequestTimeout,
        ]);
        let text = err.to_string();
        assert!(text.contains("grace period"));
        assert!(text.contains("request timeout"));
    }
}
