//! gRPC access logging.
//!
//! A tower layer placed in front of every gRPC service. The full method is
//! the request path; the terminal status comes from the `grpc-status` header
//! of trailers-only responses, which is how unary errors are returned.

use std::fmt;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use futures_util::future::BoxFuture;
use http::{Request, Response};
use tonic::{Code, Status};
use tower::{Layer, Service};

use crate::observability::logging::{RequestEvent, RequestLogger};

/// Layer that logs one access event per gRPC call.
#[derive(Debug, Clone)]
pub struct RpcLogLayer {
    logger: Arc<RequestLogger>,
}

impl RpcLogLayer {
    pub fn new(logger: Arc<RequestLogger>) -> Self {
        Self { logger }
    }
}

impl<S> Layer<S> for RpcLogLayer {
    type Service = RpcLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RpcLog {
            inner,
            logger: self.logger.clone(),
        }
    }
}

/// Service produced by [`RpcLogLayer`].
#[derive(Debug, Clone)]
pub struct RpcLog<S> {
    inner: S,
    logger: Arc<RequestLogger>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RpcLog<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let logger = self.logger.clone();
        let full_method = request.uri().path().to_string();

        Box::pin(async move {
            let start = Instant::now();
            let result = inner.call(request).await;
            let duration = start.elapsed();

            let event = match &result {
                Ok(response) => match Status::from_header_map(response.headers()) {
                    Some(status) if status.code() != Code::Ok => {
                        let error = if status.message().is_empty() {
                            crate::rpc::status::code_name(status.code()).to_string()
                        } else {
                            status.message().to_string()
                        };
                        RequestEvent::grpc(full_method, status.code(), duration).with_error(error)
                    }
                    _ => RequestEvent::grpc(full_method, Code::Ok, duration),
                },
                Err(e) => RequestEvent::grpc(full_method, Code::Unknown, duration).with_error(e.to_string()),
            };
            logger.record(event);

            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::logging::capture::capture;
    use crate::observability::logging::Severity;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceExt};

    fn logger() -> Arc<RequestLogger> {
        Arc::new(RequestLogger::new(["/grpc.health.v1.Health/Check"]))
    }

    fn request(path: &str) -> Request<()> {
        Request::builder().uri(path).body(()).unwrap()
    }

    #[tokio::test]
    async fn failed_call_logged_at_error() {
        let (logs, _guard) = capture();
        let svc = RpcLogLayer::new(logger()).layer(service_fn(|_req: Request<()>| async {
            let response = Response::builder()
                .header("grpc-status", "5")
                .header("grpc-message", "widget missing")
                .body(())
                .unwrap();
            Ok::<_, Infallible>(response)
        }));

        svc.oneshot(request("/shop.Widgets/Get")).await.unwrap();

        let events = logs.access_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["level"], "ERROR");
        assert_eq!(events[0]["fields"]["path"], "/shop.Widgets/Get");
        assert_eq!(events[0]["fields"]["status_code"], 5);
        assert_eq!(events[0]["fields"]["status_text"], "NotFound");
        assert_eq!(events[0]["fields"]["error"], "widget missing");
        assert!(events[0]["fields"].get("method").is_none());
    }

    #[tokio::test]
    async fn successful_call_logged_at_info() {
        let (logs, _guard) = capture();
        let svc = RpcLogLayer::new(logger()).layer(service_fn(|_req: Request<()>| async {
            Ok::<_, Infallible>(Response::new(()))
        }));

        svc.oneshot(request("/shop.Widgets/List")).await.unwrap();

        let events = logs.access_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["level"], "INFO");
        assert_eq!(events[0]["fields"]["status_text"], "OK");
        assert_eq!(events[0]["fields"]["status_code"], 0);
        assert!(events[0]["fields"].get("body").is_none());
    }

    #[tokio::test]
    async fn service_error_is_classified_unknown() {
        let (logs, _guard) = capture();
        let svc = RpcLogLayer::new(logger()).layer(service_fn(|_req: Request<()>| async {
            Err::<Response<()>, _>("connection reset")
        }));

        let result = svc.oneshot(request("/shop.Widgets/Get")).await;
        assert_eq!(result.unwrap_err(), "connection reset");

        let events = logs.access_events();
        assert_eq!(events[0]["fields"]["status_text"], "Unknown");
        assert_eq!(events[0]["fields"]["status_code"], 2);
        assert_eq!(events[0]["fields"]["error"], "connection reset");
    }

    #[tokio::test]
    async fn health_check_is_not_logged() {
        let (logs, _guard) = capture();
        let svc = RpcLogLayer::new(logger()).layer(service_fn(|_req: Request<()>| async {
            let response = Response::builder()
                .header("grpc-status", "14")
                .body(())
                .unwrap();
            Ok::<_, Infallible>(response)
        }));

        svc.oneshot(request("/grpc.health.v1.Health/Check")).await.unwrap();
        assert!(logs.access_events().is_empty());
    }

    #[test]
    fn logger_reports_severity() {
        let event = RequestEvent::grpc("/a.B/C", Code::Internal, std::time::Duration::ZERO).with_error("x");
        assert_eq!(logger().record(event), Some(Severity::Error));
    }
}
