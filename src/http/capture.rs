//! Response capture for access logging.
//!
//! Wraps a handler's response after it returns: the status is always
//! recorded, the body only when the status is a failure. Bodies that are
//! streamed without a known bound are passed through uncaptured.

use axum::body::{Body, Bytes, HttpBody};
use axum::response::Response;
use http::StatusCode;

/// Largest body buffered for the access log.
pub const MAX_CAPTURED_BODY: usize = 1024 * 1024;

/// Status and (on failure) body of one response.
#[derive(Debug, Clone)]
pub struct ResponseCapture {
    status: StatusCode,
    body: Option<Bytes>,
}

impl Default for ResponseCapture {
    /// A handler that never sets a status answers 200.
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            body: None,
        }
    }
}

impl ResponseCapture {
    /// Record `response`, returning it unchanged alongside the capture.
    pub async fn record(response: Response) -> (Response, Self) {
        let status = response.status();
        if status == StatusCode::OK {
            return (response, Self { status, body: None });
        }

        let bounded = response
            .body()
            .size_hint()
            .upper()
            .is_some_and(|upper| upper <= MAX_CAPTURED_BODY as u64);
        if !bounded {
            return (response, Self { status, body: None });
        }

        let (parts, body) = response.into_parts();
        match axum::body::to_bytes(body, MAX_CAPTURED_BODY).await {
            Ok(bytes) => (
                Response::from_parts(parts, Body::from(bytes.clone())),
                Self {
                    status,
                    body: Some(bytes),
                },
            ),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read error response body");
                (Response::from_parts(parts, Body::empty()), Self { status, body: None })
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    pub fn into_body(self) -> Option<Bytes> {
        self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn failure_body_is_captured_and_preserved() {
        let response = (StatusCode::INTERNAL_SERVER_ERROR, r#"{"msg":"x"}"#).into_response();

        let (response, capture) = ResponseCapture::record(response).await;
        assert_eq!(capture.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(capture.body().unwrap().as_ref(), br#"{"msg":"x"}"#);

        let sent = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(sent.as_ref(), br#"{"msg":"x"}"#);
    }

    #[tokio::test]
    async fn success_body_is_not_captured() {
        let (_, capture) = ResponseCapture::record("hello".into_response()).await;
        assert_eq!(capture.status(), StatusCode::OK);
        assert!(capture.body().is_none());
    }

    #[tokio::test]
    async fn empty_response_defaults_to_ok() {
        let (_, capture) = ResponseCapture::record(().into_response()).await;
        assert_eq!(capture.status(), ResponseCapture::default().status());
    }
}
