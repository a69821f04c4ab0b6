//! Accept loop and per-connection lifecycle.
//!
//! # Responsibilities
//! - Accept TCP connections on a bound listener
//! - Serve each one with hyper in a task owned by the accept loop
//! - On drain: stop accepting, ask every connection to finish gracefully
//!
//! # Design Decisions
//! - Connection tasks live in a `JoinSet`, so dropping the serve future
//!   (the orchestrator's force-close) aborts them too
//! - Transient accept errors are skipped, anything else is a serve failure

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;

use hyper::body::{Body, Incoming};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::service::TowerToHyperService;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower::Service;

use crate::error::ServeError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Serve `service` on `listener` until `drain` fires and every connection closes.
pub async fn serve<S, B>(
    name: &'static str,
    listener: TcpListener,
    service: S,
    drain: CancellationToken,
) -> Result<(), ServeError>
where
    S: Service<http::Request<Incoming>, Response = http::Response<B>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = drain.cancelled() => break,
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) if is_transient(&e) => {
                        tracing::debug!(service = name, error = %e, "Accept failed, retrying");
                        continue;
                    }
                    Err(e) => return Err(e.into()),
                };
                connections.spawn(serve_connection(
                    name,
                    stream,
                    peer,
                    service.clone(),
                    drain.clone(),
                ));
            }
            // Reap finished connections so the set only holds live ones.
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    tracing::debug!(service = name, connections = connections.len(), "Draining connections");
    while connections.join_next().await.is_some() {}
    Ok(())
}

async fn serve_connection<S, B>(
    name: &'static str,
    stream: TcpStream,
    peer: SocketAddr,
    service: S,
    drain: CancellationToken,
) where
    S: Service<http::Request<Incoming>, Response = http::Response<B>, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send + 'static,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<BoxError>,
{
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!(service = name, peer = %peer, error = %e, "Failed to set TCP_NODELAY");
    }

    let builder = Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(stream), TowerToHyperService::new(service));
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = drain.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };

    if let Err(e) = result {
        tracing::debug!(service = name, peer = %peer, error = %e, "Connection closed with error");
    }
}

fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
    )
}
