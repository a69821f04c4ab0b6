//! gRPC server unit.
//!
//! # Responsibilities
//! - Serve the standard health service and server reflection
//! - Log every call through [`RpcLogLayer`]
//! - Report NOT_SERVING and drain in-flight calls on shutdown
//!
//! # Design Decisions
//! - Insecure transport only
//! - Accepts on the listener bound by the orchestrator, through `net::serve`
//!   so a force-close also drops in-flight calls

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tonic::service::Routes;
use tonic_health::ServingStatus;
use tower::Layer;

use crate::error::ServeError;
use crate::lifecycle::{ServeFuture, ServiceUnit};
use crate::net;
use crate::observability::logging::RequestLogger;
use crate::rpc::logging::RpcLogLayer;

/// The gRPC server as a supervised service.
pub struct RpcService {
    bind_address: SocketAddr,
    logger: Arc<RequestLogger>,
}

impl RpcService {
    pub const NAME: &'static str = "grpc server";

    pub fn new(bind_address: SocketAddr, logger: Arc<RequestLogger>) -> Self {
        Self {
            bind_address,
            logger,
        }
    }
}

impl ServiceUnit for RpcService {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn bind_address(&self) -> SocketAddr {
        self.bind_address
    }

    fn serve(self: Box<Self>, listener: TcpListener, drain: CancellationToken) -> ServeFuture {
        Box::pin(async move {
            let (reporter, health) = tonic_health::server::health_reporter();

            let reflection = tonic_reflection::server::Builder::configure()
                .register_encoded_file_descriptor_set(tonic_health::pb::FILE_DESCRIPTOR_SET)
                .build_v1()
                .map_err(|e| ServeError::Setup(e.to_string()))?;

            let routes = Routes::new(health).add_service(reflection);
            let service = RpcLogLayer::new(self.logger).layer(routes);

            // Health checkers see NOT_SERVING while in-flight calls drain.
            let not_serving = {
                let drain = drain.clone();
                async move {
                    drain.cancelled().await;
                    reporter
                        .set_service_status("", ServingStatus::NotServing)
                        .await;
                }
            };

            let (result, ()) = tokio::join!(
                net::serve(Self::NAME, listener, service, drain),
                not_serving
            );
            result?;

            tracing::debug!(service = Self::NAME, "Server stopped accepting");
            Ok(())
        })
    }
}
