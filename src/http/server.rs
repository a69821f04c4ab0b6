//! HTTP gateway server setup.
//!
//! # Responsibilities
//! - Create the Axum router with the gateway routes
//! - Wire up middleware (request ID, access log, timeout)
//! - Serve on the listener bound by the orchestrator
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, Router};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tonic::transport::Endpoint;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::gateway::{routes, GatewayState, HeaderMatcher};
use crate::http::middleware::access_log;
use crate::http::request::UuidRequestId;
use crate::lifecycle::{ServeFuture, ServiceUnit};
use crate::net;
use crate::observability::logging::RequestLogger;

/// The HTTP gateway as a supervised service.
pub struct GatewayService {
    bind_address: SocketAddr,
    upstream: String,
    request_timeout: Duration,
    headers: HeaderMatcher,
    logger: Arc<RequestLogger>,
}

impl GatewayService {
    pub const NAME: &'static str = "grpc gateway";

    /// Create a gateway that forwards to the gRPC server at `upstream`.
    pub fn new(
        bind_address: SocketAddr,
        upstream: impl Into<String>,
        config: &GatewayConfig,
        logger: Arc<RequestLogger>,
    ) -> Self {
        Self {
            bind_address,
            upstream: upstream.into(),
            request_timeout: config.request_timeout(),
            headers: HeaderMatcher::new(&config.forwarded_headers),
            logger,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(
        state: GatewayState,
        logger: Arc<RequestLogger>,
        request_timeout: Duration,
    ) -> Router {
        routes()
            .with_state(state)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                request_timeout,
            ))
            .layer(middleware::from_fn_with_state(logger, access_log))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
    }
}

impl ServiceUnit for GatewayService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    fn serve(self: Box<Self>, listener: TcpListener, drain: CancellationToken) -> ServeFuture {
        Box::pin(async move {
            let channel = Endpoint::from_shared(self.upstream.clone())?.connect_lazy();
            tracing::debug!(service = Self::NAME, upstream = %self.upstream, "Upstream channel ready");

            let state = GatewayState::new(channel, self.headers);
            let router = Self::build_router(state, self.logger, self.request_timeout);

            net::serve(Self::NAME, listener, router, drain).await?;

            tracing::debug!(service = Self::NAME, "Server stopped accepting");
            Ok(())
        })
    }
}
