//! Application bootstrap and dependency wiring.
//!
//! This module is the composition root: the single place where every
//! adapter and service is instantiated and wired together, in dependency
//! order. Stores and the broadcaster have no dependencies of their own, so
//! they're built first; the remote adapters depend on a shared HTTP client;
//! the `Dispatcher` depends on the stores and the broadcaster; and the
//! `SessionManager` depends on everything else.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::dispatch::{
    Broadcaster, Dispatcher, GroupBroadcaster, InMemoryCallStore, InMemoryLocationStore,
    InMemorySummaryStore, InMemoryTranscriptStore,
};
use crate::insights::{HttpInsightsExtractor, InsightsExtractor};
use crate::session::SessionManager;
use crate::transcription::{HttpTranscriptionClient, TranscriptionClient};

/// Errors that can prevent the pipeline from starting up at all.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to construct HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Container for every bootstrapped service, handed to `AppState` (for the
/// HTTP/WebSocket layer) and to whatever shuts the process down.
pub struct BootstrappedServices {
    pub session_manager: Arc<SessionManager>,
    pub dispatcher: Arc<Dispatcher>,
    pub broadcaster: Arc<dyn Broadcaster>,
    /// Root cancellation token. Cancelling it propagates to every
    /// in-flight transcription/insights HTTP call and to every open
    /// WebSocket read loop, for graceful process shutdown.
    pub shutdown: CancellationToken,
}

/// Builds the default `reqwest::Client` shared by both remote adapters.
/// Per-request timeouts are applied at the call site instead of here, since
/// the transcription and insights clients use different timeout floors.
fn create_http_client() -> reqwest::Result<Client> {
    Client::builder().connect_timeout(Duration::from_secs(10)).build()
}

/// Wires every adapter and service from `config`, using the in-memory
/// reference store and broadcaster implementations. A production
/// deployment that needs durable storage or a different push-channel
/// transport constructs `Dispatcher`/`SessionManager` directly with its own
/// trait implementations instead of calling this function.
pub fn bootstrap_services(config: Config) -> Result<BootstrappedServices, BootstrapError> {
    config
        .validate()
        .map_err(BootstrapError::InvalidConfig)?;

    let http = create_http_client()?;

    let call_store = Arc::new(InMemoryCallStore::new());
    let transcript_store = Arc::new(InMemoryTranscriptStore::new());
    let summary_store = Arc::new(InMemorySummaryStore::new());
    let location_store = Arc::new(InMemoryLocationStore::new());
    let broadcaster: Arc<dyn Broadcaster> = Arc::new(GroupBroadcaster::new());

    let dispatcher = Arc::new(Dispatcher::new(
        call_store,
        transcript_store,
        summary_store,
        location_store,
        broadcaster.clone(),
    ));

    let transcription_client: Arc<dyn TranscriptionClient> = Arc::new(HttpTranscriptionClient::new(
        http.clone(),
        config.transcription.clone(),
    ));
    let insights_extractor: Arc<dyn InsightsExtractor> = Arc::new(HttpInsightsExtractor::new(
        http,
        config.insights.clone(),
    ));

    let shutdown = CancellationToken::new();
    let session_manager = Arc::new(SessionManager::with_shutdown_token(
        transcription_client,
        insights_extractor,
        dispatcher.clone(),
        config,
        shutdown.clone(),
    ));

    Ok(BootstrappedServices {
        session_manager,
        dispatcher,
        broadcaster,
        shutdown,
    })
}
