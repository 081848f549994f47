//! Shared application state and the HTTP/WebSocket server entry point.

pub mod router;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::session::SessionManager;

/// Shared, cheaply-cloneable handle to the services an HTTP/WebSocket
/// handler needs. Every field is an `Arc`, so cloning `AppState` per
/// request is cheap.
#[derive(Clone)]
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
    /// Root shutdown token; each WebSocket connection derives a child so
    /// the read loop exits promptly when the process is shutting down.
    pub shutdown: CancellationToken,
}

/// Builder for [`AppState`], mirroring the crate's builder convention of
/// per-field setters and a `build()` that panics on a missing required
/// field — acceptable here because a missing field is a wiring bug caught
/// at startup, not a runtime condition.
#[derive(Default)]
pub struct AppStateBuilder {
    session_manager: Option<Arc<SessionManager>>,
    shutdown: Option<CancellationToken>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn session_manager(mut self, session_manager: Arc<SessionManager>) -> Self {
        self.session_manager = Some(session_manager);
        self
    }

    /// Sets the root shutdown token. Defaults to a fresh, never-cancelled
    /// token if never called — fine for tests, but a real server should
    /// share the token returned by `bootstrap_services`.
    #[must_use]
    pub fn shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    /// Builds the `AppState`.
    ///
    /// # Panics
    ///
    /// Panics if `session_manager` was never set.
    #[must_use]
    pub fn build(self) -> AppState {
        AppState {
            session_manager: self.session_manager.expect("session_manager is required"),
            shutdown: self.shutdown.unwrap_or_default(),
        }
    }
}

/// Errors surfaced from the HTTP layer itself (distinct from
/// [`crate::error::TelecallError`], which covers pipeline-internal
/// failures that never reach an HTTP response).
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {0}: {1}")]
    Bind(SocketAddr, std::io::Error),

    #[error("server error: {0}")]
    Serve(std::io::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (
            axum::http::StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

/// Binds and serves the HTTP/WebSocket surface on `addr` until the process
/// is terminated or the listener errors.
pub async fn start_server(state: AppState, addr: SocketAddr) -> Result<(), ServerError> {
    let app = router::create_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|err| ServerError::Bind(addr, err))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(ServerError::Serve)
}
