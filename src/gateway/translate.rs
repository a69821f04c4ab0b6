//! HTTP/JSON routes translated into gRPC calls.
//!
//! Only the health service is exposed:
//! - `GET /health[?service=name]`
//! - `POST /grpc.health.v1.Health/Check` with `{"service": "name"}`
//!
//! JSON field names are the proto names. Unknown JSON fields and query
//! parameters are ignored.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tonic::transport::Channel;
use tonic::{Code, Status};
use tonic_health::pb::health_check_response::ServingStatus;
use tonic_health::pb::health_client::HealthClient;
use tonic_health::pb::HealthCheckRequest;

use crate::gateway::headers::HeaderMatcher;
use crate::http::request::request_id;
use crate::rpc::status::http_status;

/// Shared state of the gateway handlers.
#[derive(Debug, Clone)]
pub struct GatewayState {
    health: HealthClient<Channel>,
    headers: Arc<HeaderMatcher>,
}

impl GatewayState {
    pub fn new(channel: Channel, headers: HeaderMatcher) -> Self {
        Self {
            health: HealthClient::new(channel),
            headers: Arc::new(headers),
        }
    }
}

/// Gateway routes. Anything unmatched gets a gateway-style 404.
pub fn routes() -> Router<GatewayState> {
    Router::new()
        .route("/health", get(check_health_query))
        .route("/grpc.health.v1.Health/Check", post(check_health_json))
        .fallback(not_found)
}

#[derive(Debug, Default, Deserialize)]
struct HealthCheckParams {
    #[serde(default)]
    service: String,
}

#[derive(Debug, Serialize)]
struct HealthCheckReply {
    status: &'static str,
}

/// Error body returned for failed calls: `{"code", "message", "details"}`.
#[derive(Debug, Serialize)]
pub struct GatewayError {
    #[serde(skip)]
    status: StatusCode,
    code: i32,
    message: String,
    details: Vec<serde_json::Value>,
}

impl GatewayError {
    pub fn new(code: Code, message: impl Into<String>) -> Self {
        Self {
            status: http_status(code),
            code: code as i32,
            message: message.into(),
            details: Vec::new(),
        }
    }
}

impl From<Status> for GatewayError {
    fn from(status: Status) -> Self {
        Self::new(status.code(), status.message())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

async fn check_health_query(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    Query(params): Query<HealthCheckParams>,
) -> Response {
    check(state, &headers, params.service).await
}

async fn check_health_json(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let params = if body.is_empty() {
        HealthCheckParams::default()
    } else {
        match serde_json::from_slice::<HealthCheckParams>(&body) {
            Ok(params) => params,
            Err(e) => return GatewayError::new(Code::InvalidArgument, e.to_string()).into_response(),
        }
    };
    check(state, &headers, params.service).await
}

async fn check(state: GatewayState, headers: &HeaderMap, service: String) -> Response {
    let mut request = tonic::Request::new(HealthCheckRequest { service });
    state.headers.forward(headers, request.metadata_mut());

    tracing::debug!(request_id = request_id(headers).unwrap_or("-"), "Forwarding health check");

    let mut client = state.health;
    match client.check(request).await {
        Ok(reply) => {
            let status = ServingStatus::try_from(reply.into_inner().status)
                .unwrap_or(ServingStatus::Unknown);
            Json(HealthCheckReply {
                status: status.as_str_name(),
            })
            .into_response()
        }
        Err(status) => GatewayError::from(status).into_response(),
    }
}

async fn not_found() -> GatewayError {
    GatewayError::new(Code::NotFound, "Not Found")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tonic::transport::Endpoint;
    use tower::ServiceExt;

    // Nothing listens on port 1, so every upstream call fails.
    fn app() -> Router {
        let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();
        routes().with_state(GatewayState::new(channel, HeaderMatcher::default()))
    }

    async fn json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_is_gateway_404() {
        let response = app()
            .oneshot(Request::builder().uri("/v1/nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json(response).await;
        assert_eq!(body["code"], 5);
        assert_eq!(body["message"], "Not Found");
        assert_eq!(body["details"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn malformed_json_is_invalid_argument() {
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/grpc.health.v1.Health/Check")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["code"], 3);
    }

    #[tokio::test]
    async fn unreachable_upstream_is_server_error() {
        let response = app()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert!(response.status().is_server_error());
        let body = json(response).await;
        assert!(body["code"].as_i64().unwrap() > 0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let params: HealthCheckParams =
            serde_json::from_str(r#"{"service":"shop","extra":true}"#).unwrap();
        assert_eq!(params.service, "shop");
    }

    #[test]
    fn status_maps_to_http() {
        let error = GatewayError::from(Status::unauthenticated("missing token"));
        assert_eq!(error.status, StatusCode::UNAUTHORIZED);
        assert_eq!(error.code, 16);
    }
}
