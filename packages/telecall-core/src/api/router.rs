//! Router construction: wires the health/readiness endpoints and the
//! carrier-facing Media Streams surface onto one axum `Router`.

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::AppState;
use crate::protocol::{http_fallback_handler, ws_handler};
use crate::protocol_constants::MEDIA_STREAM_PATH;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn ready() -> Json<HealthBody> {
    Json(HealthBody { status: "ready" })
}

/// Builds the application router: health/readiness probes plus the
/// WebSocket and HTTP-fallback variants of the Media Streams endpoint,
/// both served on the same path per the outbound interface contract.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route(MEDIA_STREAM_PATH, get(ws_handler).post(http_fallback_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
