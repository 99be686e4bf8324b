use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use axum::extract::{Path, Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::managers::SessionHub;
use crate::telemetry::{self, TelemetrySnapshot};

use super::sse;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct RelayHttpState {
    hub: SessionHub,
    token: Option<Arc<String>>,
    started: Instant,
}

impl RelayHttpState {
    /// `token: None` leaves every endpoint open.
    pub fn new(hub: SessionHub, token: Option<String>) -> Self {
        Self {
            hub,
            token: token.map(Arc::new),
            started: Instant::now(),
        }
    }

    fn authorize(
        &self,
        headers: &HeaderMap,
        query_token: Option<&str>,
    ) -> Result<(), HttpServerError> {
        let Some(expected) = self.token.as_deref() else {
            return Ok(());
        };
        // Either credential may carry the token; a stale one does not veto the other
        let matches = |candidate: Option<&str>| candidate == Some(expected.as_str());
        if matches(bearer_token(headers)) || matches(query_token) {
            Ok(())
        } else {
            Err(HttpServerError::Unauthorized)
        }
    }
}

/// Query payload for extracting token from URL.
#[derive(Debug, Default, Deserialize)]
pub struct AuthQuery {
    pub token: Option<String>,
}

/// HTTP error variants mapped to JSON responses.
#[derive(Debug)]
pub enum HttpServerError {
    Unauthorized,
    BadRequest(&'static str),
}

impl IntoResponse for HttpServerError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "missing or invalid token"),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

/// Health endpoint response payload.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_ms: u64,
    pub sessions: usize,
}

/// Per-session listing entry.
#[derive(Debug, Serialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub subscribers: usize,
}

/// Metrics endpoint response payload.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    pub diagnostics: TelemetrySnapshot,
}

/// Build the Axum router with all handlers.
pub fn build_router(state: RelayHttpState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:session_id/gestures", get(gesture_stream_handler))
        .with_state(state)
}

/// Run the HTTP server loop.
pub async fn run_http_server(state: RelayHttpState, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("binding relay HTTP listener")?;
    let router = build_router(state);
    axum::serve(listener, router)
        .await
        .context("serving relay HTTP router")?;
    Ok(())
}

pub async fn health(
    State(state): State<RelayHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<HealthResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    Ok(Json(HealthResponse {
        status: "ok",
        uptime_ms: state.started.elapsed().as_millis() as u64,
        sessions: state.hub.sessions().len(),
    }))
}

pub async fn metrics(
    State(state): State<RelayHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<MetricsResponse>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    Ok(Json(MetricsResponse {
        diagnostics: telemetry::hub().snapshot(),
    }))
}

pub async fn list_sessions(
    State(state): State<RelayHttpState>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<SessionSummary>>, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    let sessions = state
        .hub
        .sessions()
        .into_iter()
        .map(|session_id| SessionSummary {
            subscribers: state.hub.subscriber_count(&session_id),
            session_id,
        })
        .collect();
    Ok(Json(sessions))
}

pub async fn gesture_stream_handler(
    State(state): State<RelayHttpState>,
    Path(session_id): Path<String>,
    Query(query): Query<AuthQuery>,
    headers: HeaderMap,
) -> Result<sse::GestureStream, HttpServerError> {
    state.authorize(&headers, query.token.as_deref())?;

    if session_id.trim().is_empty() {
        return Err(HttpServerError::BadRequest("session id must not be empty"));
    }
    Ok(sse::session_gestures(&state.hub, &session_id))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| raw.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::GestureEvent;
    use crate::emitter::{EventSink, RelayMessage};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use futures::StreamExt;
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    const TOKEN: &str = "relay-token";

    fn make_router(hub: &SessionHub) -> Router {
        build_router(RelayHttpState::new(hub.clone(), Some(TOKEN.to_string())))
    }

    async fn response_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("response body bytes");
        let json = serde_json::from_slice::<Value>(&bytes).expect("JSON body");
        (status, json)
    }

    fn get(uri: String) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn health_requires_token() {
        let hub = SessionHub::new();
        let (status, json) = response_json(
            make_router(&hub)
                .oneshot(get("/health".to_string()))
                .await
                .expect("health call"),
        )
        .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"], "missing or invalid token");
    }

    #[tokio::test]
    async fn health_accepts_bearer_header() {
        let hub = SessionHub::new();
        hub.sender("room-a");
        let request = Request::builder()
            .uri("/health")
            .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .expect("health request");

        let (status, json) =
            response_json(make_router(&hub).oneshot(request).await.expect("health call")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["sessions"], 1);
    }

    #[tokio::test]
    async fn bearer_header_wins_over_stale_query_token() {
        let hub = SessionHub::new();
        let request = Request::builder()
            .uri("/health?token=expired")
            .header(AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .expect("health request");

        let response = make_router(&hub).oneshot(request).await.expect("health call");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn query_token_wins_over_stale_bearer_header() {
        let hub = SessionHub::new();
        let request = Request::builder()
            .uri(format!("/health?token={TOKEN}"))
            .header(AUTHORIZATION, "Bearer expired")
            .body(Body::empty())
            .expect("health request");

        let response = make_router(&hub).oneshot(request).await.expect("health call");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn open_server_needs_no_token() {
        let router = build_router(RelayHttpState::new(SessionHub::new(), None));
        let response = router
            .oneshot(get("/health".to_string()))
            .await
            .expect("health call");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_returns_diagnostics() {
        let hub = SessionHub::new();
        let (status, json) = response_json(
            make_router(&hub)
                .oneshot(get(format!("/metrics?token={TOKEN}")))
                .await
                .expect("metrics call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert!(json["diagnostics"]["recent"].is_array());
    }

    #[tokio::test]
    async fn sessions_lists_subscribers() {
        let hub = SessionHub::new();
        let _rx = hub.subscribe("room-b");
        let (status, json) = response_json(
            make_router(&hub)
                .oneshot(get(format!("/sessions?token={TOKEN}")))
                .await
                .expect("sessions call"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json[0]["session_id"], "room-b");
        assert_eq!(json[0]["subscribers"], 1);
    }

    #[tokio::test]
    async fn gesture_stream_relays_session_messages() {
        let hub = SessionHub::new();
        let response = make_router(&hub)
            .oneshot(get(format!("/sessions/room-c/gestures?token={TOKEN}")))
            .await
            .expect("stream call");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/event-stream"
        );
        assert_eq!(hub.subscriber_count("room-c"), 1);

        hub.sink("room-c")
            .send(&RelayMessage::gesture("room-c", GestureEvent::Grab))
            .expect("publish");

        let mut body = response.into_body().into_data_stream();
        let chunk = tokio::time::timeout(Duration::from_secs(2), body.next())
            .await
            .expect("event before timeout")
            .expect("stream open")
            .expect("chunk");
        let text = String::from_utf8_lossy(&chunk);

        assert!(text.contains("event: gesture"), "chunk was {text}");
        assert!(text.contains(r#""value":"GRAB""#), "chunk was {text}");
        assert!(text.contains(r#""sessionId":"room-c""#), "chunk was {text}");
    }

    #[tokio::test]
    async fn gesture_stream_rejects_bad_token() {
        let hub = SessionHub::new();
        let response = make_router(&hub)
            .oneshot(get("/sessions/room-d/gestures?token=nope".to_string()))
            .await
            .expect("stream call");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(hub.sessions().is_empty());
    }
}
