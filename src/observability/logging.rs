//! Structured logging.
//!
//! # Responsibilities
//! - Initialize logging subsystem
//! - Normalize gRPC and HTTP request outcomes into one access-log event
//! - Keep health-check traffic out of the access log
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and environment (`RUST_LOG` wins)
//! - Response bodies are logged only on the error path

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use axum::body::Bytes;
use http::StatusCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::rpc::status::code_name;

/// Target of every access-log event.
pub const ACCESS_TARGET: &str = "gatewayd::access";

/// Install the global subscriber.
pub fn init(config: &ObservabilityConfig) {
    let level = config.log_level.to_ascii_lowercase();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("gatewayd={level},tower_http={level}").into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Protocol an access-log event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Grpc,
    Http,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Grpc => "grpc",
            Protocol::Http => "http",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity an event is emitted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// One completed request, normalized across protocols.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    protocol: Protocol,
    method: Option<String>,
    path: String,
    status_text: String,
    status_code: u32,
    duration: Duration,
    error: Option<String>,
    body: Option<Bytes>,
}

impl RequestEvent {
    /// An HTTP request. Status text is the reason phrase of `status`.
    pub fn http(method: &http::Method, path: impl Into<String>, status: StatusCode, duration: Duration) -> Self {
        Self {
            protocol: Protocol::Http,
            method: Some(method.to_string()),
            path: path.into(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            status_code: u32::from(status.as_u16()),
            duration,
            error: None,
            body: None,
        }
    }

    /// A gRPC call. There is never an HTTP method on these.
    pub fn grpc(full_method: impl Into<String>, code: tonic::Code, duration: Duration) -> Self {
        Self {
            protocol: Protocol::Grpc,
            method: None,
            path: full_method.into(),
            status_text: code_name(code).to_string(),
            status_code: code as u32,
            duration,
            error: None,
            body: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Attach the captured response body. Only logged at error severity.
    pub fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn method(&self) -> Option<&str> {
        self.method.as_deref()
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn status_code(&self) -> u32 {
        self.status_code
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Error if an error is attached, or for HTTP anything other than a literal 200.
    pub fn severity(&self) -> Severity {
        let failed_status =
            self.protocol == Protocol::Http && self.status_code != u32::from(StatusCode::OK.as_u16());
        if self.error.is_some() || failed_status {
            Severity::Error
        } else {
            Severity::Info
        }
    }
}

/// Writes access-log events for both protocol adapters.
#[derive(Debug, Clone, Default)]
pub struct RequestLogger {
    suppressed: HashSet<String>,
}

impl RequestLogger {
    pub fn new<I, S>(suppressed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            suppressed: suppressed.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_suppressed(&self, path: &str) -> bool {
        self.suppressed.contains(path)
    }

    /// Emit one event. Returns the severity used, or `None` if suppressed.
    ///
    /// The captured body is recorded verbatim as a string field. `tracing`
    /// has no stable way to embed a structured value, so in JSON output a
    /// JSON body shows up as an escaped string that parses back unchanged.
    pub fn record(&self, event: RequestEvent) -> Option<Severity> {
        if self.is_suppressed(&event.path) {
            return None;
        }

        let severity = event.severity();
        let protocol = event.protocol.as_str();
        let duration_ms = event.duration.as_secs_f64() * 1000.0;

        match severity {
            Severity::Error => {
                let body = event.body.as_ref().map(|b| String::from_utf8_lossy(b));
                tracing::error!(
                    target: ACCESS_TARGET,
                    protocol,
                    method = event.method.as_deref(),
                    path = %event.path,
                    status_text = %event.status_text,
                    status_code = event.status_code,
                    duration_ms,
                    error = event.error.as_deref(),
                    body = body.as_deref(),
                    "processed a {} request",
                    protocol
                );
            }
            Severity::Info => {
                tracing::info!(
                    target: ACCESS_TARGET,
                    protocol,
                    method = event.method.as_deref(),
                    path = %event.path,
                    status_text = %event.status_text,
                    status_code = event.status_code,
                    duration_ms,
                    "processed a {} request",
                    protocol
                );
            }
        }

        Some(severity)
    }
}
