//! HTTP access logging middleware.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::http::capture::ResponseCapture;
use crate::observability::logging::{RequestEvent, RequestLogger};

/// Log one access event per request, with the response body on failure.
pub async fn access_log(
    State(logger): State<Arc<RequestLogger>>,
    request: Request,
    next: Next,
) -> Response {
    if logger.is_suppressed(request.uri().path()) {
        return next.run(request).await;
    }

    let start = Instant::now();
    let method = request.method().clone();
    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());

    let response = next.run(request).await;
    let (response, capture) = ResponseCapture::record(response).await;

    let mut event = RequestEvent::http(&method, target, capture.status(), start.elapsed());
    if let Some(body) = capture.into_body() {
        event = event.with_body(body);
    }
    logger.record(event);

    response
}
