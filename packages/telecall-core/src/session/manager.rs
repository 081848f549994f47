//! `SessionManager`: owns the process-wide stream registry and arbitrates
//! the per-stream lifecycle.
//!
//! Each WebSocket connection (or HTTP fallback request sequence) drives its
//! session's `OnStart`/`OnMedia`/`OnStop` calls from a single task, so a
//! flush awaited in-line here already serializes with that stream's next
//! inbound frame — the `flush_in_flight` marker on `Session` exists to make
//! that invariant explicit and testable, not to add its own locking.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::audio::{is_silent, mulaw_to_wav};
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::insights::InsightsExtractor;
use crate::session::state::{Session, SessionState};
use crate::session::transcript::TranscriptAccumulator;
use crate::transcription::TranscriptionClient;

/// Owns the `streamID → Session` registry and drives the lifecycle
/// described in the component design for session handling.
pub struct SessionManager {
    registry: DashMap<String, Arc<Session>>,
    transcript: TranscriptAccumulator,
    transcription_client: Arc<dyn TranscriptionClient>,
    insights_extractor: Arc<dyn InsightsExtractor>,
    dispatcher: Arc<Dispatcher>,
    config: Config,
    /// Process-wide shutdown token. Every outbound transcription/insights
    /// call races a child of this token so cancelling it on shutdown
    /// aborts in-flight HTTP work instead of waiting out its timeout.
    shutdown: CancellationToken,
}

impl SessionManager {
    /// Constructs a manager with no active sessions, and its own root
    /// shutdown token (see [`SessionManager::with_shutdown_token`] to share
    /// one across the whole process).
    #[must_use]
    pub fn new(
        transcription_client: Arc<dyn TranscriptionClient>,
        insights_extractor: Arc<dyn InsightsExtractor>,
        dispatcher: Arc<Dispatcher>,
        config: Config,
    ) -> Self {
        Self::with_shutdown_token(
            transcription_client,
            insights_extractor,
            dispatcher,
            config,
            CancellationToken::new(),
        )
    }

    /// Constructs a manager whose per-operation cancellation tokens are
    /// children of `shutdown`, so cancelling `shutdown` (e.g. at process
    /// shutdown) propagates to every in-flight transcription/insights call.
    #[must_use]
    pub fn with_shutdown_token(
        transcription_client: Arc<dyn TranscriptionClient>,
        insights_extractor: Arc<dyn InsightsExtractor>,
        dispatcher: Arc<Dispatcher>,
        config: Config,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            registry: DashMap::new(),
            transcript: TranscriptAccumulator::new(),
            transcription_client,
            insights_extractor,
            dispatcher,
            config,
            shutdown,
        }
    }

    /// Number of currently active sessions. Exposed for readiness/metrics.
    #[must_use]
    pub fn active_session_count(&self) -> usize {
        self.registry.len()
    }

    /// Allocates a session for `stream_id` and transitions it to `Active`.
    ///
    /// A second `OnStart` for an already-registered `stream_id` is a no-op
    /// besides a warning log; the existing session is reused.
    pub async fn on_start(&self, stream_id: &str, call_id: &str) {
        if stream_id.is_empty() {
            warn!("OnStart called with empty stream_id, ignoring");
            return;
        }

        if self.registry.contains_key(stream_id) {
            warn!(stream_id, "OnStart called for already-active stream, reusing existing session");
            return;
        }

        let session = Arc::new(Session::new(
            stream_id.to_string(),
            call_id.to_string(),
            self.config.threshold_bytes(),
        ));
        self.registry.insert(stream_id.to_string(), session);

        self.dispatcher.on_stream_started(call_id, stream_id).await;

        if let Some(session) = self.registry.get(stream_id) {
            session.set_state(SessionState::Active).await;
        }
    }

    /// Decodes and appends inbound media to the session's buffer, flushing
    /// when the configured threshold is reached.
    pub async fn on_media(&self, stream_id: &str, base64_payload: &str) {
        if base64_payload.trim().is_empty() {
            return;
        }

        let Some(session) = self.registry.get(stream_id).map(|entry| entry.clone()) else {
            warn!(stream_id, "received media for unknown stream");
            return;
        };

        let decoded = match BASE64.decode(base64_payload) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(stream_id, error = %err, "failed to decode base64 media payload");
                return;
            }
        };

        session.append_audio(&decoded).await;

        if let Some(drained) = session.drain_if_ready().await {
            self.flush(&session, drained, false).await;
        }
    }

    /// Force-drains remaining audio, flushes with `isFinal=true` if
    /// non-empty, runs the final insights pass, and closes the session.
    pub async fn on_stop(&self, stream_id: &str, call_id: &str) {
        let Some(session) = self.registry.get(stream_id).map(|entry| entry.clone()) else {
            info!(stream_id, "stopped");
            return;
        };

        session.set_state(SessionState::Finalizing).await;
        let duration = session.started_at.elapsed();
        info!(stream_id, duration_ms = duration.as_millis() as u64, "stream duration");

        let remaining = session.drain_force().await;
        if !remaining.is_empty() {
            self.flush(&session, remaining, true).await;
        }

        self.dispatcher.on_stream_stopped(call_id, stream_id).await;

        self.finalize(&session).await;

        session.set_state(SessionState::Closed).await;
        self.registry.remove(stream_id);
    }

    /// Drains, VAD-gates, codec-converts, transcribes, and dispatches one
    /// unit of buffered audio.
    async fn flush(&self, session: &Arc<Session>, drained: Vec<u8>, is_final: bool) {
        if !session.begin_flush() {
            warn!(stream_id = %session.stream_id, "flush already in flight, skipping overlapping flush");
            return;
        }
        session.set_state(SessionState::Flushing).await;

        if is_silent(&drained, self.config.silence_threshold) {
            debug!(stream_id = %session.stream_id, "Skipping silent audio chunk");
        } else {
            let wav = mulaw_to_wav(&drained, self.config.sample_rate);

            let ctx = self.shutdown.child_token();
            let result = self
                .transcription_client
                .transcribe(&session.call_id, &session.stream_id, wav, is_final, &ctx)
                .await;

            if let Some(result) = result {
                self.transcript.append(&session.call_id, &result.text);
                let sequence = session.next_sequence().await;
                self.dispatcher
                    .on_transcript(&session.call_id, &session.stream_id, &result, sequence)
                    .await;

                self.run_incremental_insights(&session.call_id).await;
            }
        }

        session.end_flush();
        if session.state().await == SessionState::Flushing {
            session.set_state(SessionState::Active).await;
        }
    }

    /// Best-effort incremental insights pass over the transcript
    /// accumulated so far for this call.
    async fn run_incremental_insights(&self, call_id: &str) {
        let transcript = self.transcript.join(call_id);
        let ctx = self.shutdown.child_token();
        if let Some(insights) = self.insights_extractor.extract(call_id, &transcript, &ctx).await {
            self.dispatcher.on_insights(call_id, &insights).await;
        }
    }

    /// One additional insights pass on the full accumulated transcript.
    async fn finalize(&self, session: &Arc<Session>) {
        let transcript = self.transcript.join(&session.call_id);
        let ctx = self.shutdown.child_token();
        if let Some(insights) = self
            .insights_extractor
            .extract(&session.call_id, &transcript, &ctx)
            .await
        {
            self.dispatcher.on_insights(&session.call_id, &insights).await;
        }
        self.transcript.clear(&session.call_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{
        Broadcaster, CallStore, Dispatcher, InMemoryCallStore, InMemoryLocationStore,
        InMemorySummaryStore, InMemoryTranscriptStore,
    };
    use crate::dispatch::broadcaster::GroupBroadcaster;
    use crate::insights::InsightsResult;
    use crate::transcription::TranscriptionResult;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeTranscriptionClient {
        calls: AtomicUsize,
        response: Option<String>,
    }

    #[async_trait]
    impl TranscriptionClient for FakeTranscriptionClient {
        async fn transcribe(
            &self,
            call_id: &str,
            stream_id: &str,
            _wav: Bytes,
            is_final: bool,
            _ctx: &CancellationToken,
        ) -> Option<TranscriptionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.response.clone().map(|text| TranscriptionResult {
                call_id: call_id.to_string(),
                stream_id: stream_id.to_string(),
                text,
                is_final,
                confidence: None,
                timestamp_utc: chrono::Utc::now(),
            })
        }
    }

    struct NoopInsightsExtractor;

    #[async_trait]
    impl InsightsExtractor for NoopInsightsExtractor {
        async fn extract(
            &self,
            _call_id: &str,
            _transcript: &str,
            _ctx: &CancellationToken,
        ) -> Option<InsightsResult> {
            None
        }
    }

    fn test_manager(
        transcription_calls_response: Option<&str>,
    ) -> (SessionManager, Arc<FakeTranscriptionClient>, Arc<Dispatcher>) {
        let transcription = Arc::new(FakeTranscriptionClient {
            calls: AtomicUsize::new(0),
            response: transcription_calls_response.map(str::to_string),
        });
        let broadcaster = Arc::new(GroupBroadcaster::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(InMemoryCallStore::new()),
            Arc::new(InMemoryTranscriptStore::new()),
            Arc::new(InMemorySummaryStore::new()),
            Arc::new(InMemoryLocationStore::new()),
            broadcaster as Arc<dyn Broadcaster>,
        ));
        let config = Config {
            audio_buffer_seconds: 4.0,
            sample_rate: 8_000,
            silence_threshold: 0.9,
            ..Default::default()
        };
        let manager = SessionManager::new(
            transcription.clone(),
            Arc::new(NoopInsightsExtractor),
            dispatcher.clone(),
            config,
        );
        (manager, transcription, dispatcher)
    }

    #[tokio::test]
    async fn buffered_media_below_threshold_does_not_transcribe() {
        let (manager, transcription, _dispatcher) = test_manager(Some("hello"));
        manager.on_start("s1", "c1").await;
        let payload = BASE64.encode(vec![0x10u8; 16_000]);
        manager.on_media("s1", &payload).await;
        assert_eq!(transcription.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn threshold_crossing_triggers_exactly_one_transcription() {
        let (manager, transcription, _dispatcher) = test_manager(Some("hello"));
        manager.on_start("s1", "c1").await;
        let chunk = BASE64.encode(vec![0x10u8; 16_000]);
        manager.on_media("s1", &chunk).await;
        manager.on_media("s1", &chunk).await;
        assert_eq!(transcription.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_silence_never_transcribes_even_above_threshold() {
        let (manager, transcription, _dispatcher) = test_manager(Some("hello"));
        manager.on_start("s1", "c1").await;
        let silent = BASE64.encode(vec![0xFFu8; 32_001]);
        manager.on_media("s1", &silent).await;
        assert_eq!(transcription.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn media_for_unknown_stream_is_ignored() {
        let (manager, transcription, _dispatcher) = test_manager(Some("hello"));
        let payload = BASE64.encode(vec![0x10u8; 40_000]);
        manager.on_media("s_unknown", &payload).await;
        assert_eq!(transcription.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_on_unknown_stream_does_not_run_finalize_logic() {
        let (manager, transcription, _dispatcher) = test_manager(Some("hello"));
        manager.on_stop("s_unknown", "c_unknown").await;
        assert_eq!(transcription.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_flushes_remaining_audio_below_threshold() {
        let (manager, transcription, _dispatcher) = test_manager(Some("hello"));
        manager.on_start("s1", "c1").await;
        let chunk = BASE64.encode(vec![0x10u8; 4_000]);
        manager.on_media("s1", &chunk).await;
        manager.on_stop("s1", "c1").await;
        assert_eq!(transcription.calls.load(Ordering::SeqCst), 1);
        assert_eq!(manager.active_session_count(), 0);
    }

    #[tokio::test]
    async fn shutdown_token_cancels_in_flight_transcription_child_tokens() {
        let shutdown = CancellationToken::new();
        let transcription = Arc::new(FakeTranscriptionClient {
            calls: AtomicUsize::new(0),
            response: Some("hello".to_string()),
        });
        let broadcaster = Arc::new(GroupBroadcaster::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(InMemoryCallStore::new()),
            Arc::new(InMemoryTranscriptStore::new()),
            Arc::new(InMemorySummaryStore::new()),
            Arc::new(InMemoryLocationStore::new()),
            broadcaster as Arc<dyn Broadcaster>,
        ));
        let manager = SessionManager::with_shutdown_token(
            transcription,
            Arc::new(NoopInsightsExtractor),
            dispatcher,
            Config {
                audio_buffer_seconds: 4.0,
                sample_rate: 8_000,
                ..Default::default()
            },
            shutdown.clone(),
        );

        // child tokens derived from `shutdown` after it is cancelled are
        // born already-cancelled, matching `CancellationToken`'s own
        // parent/child semantics.
        shutdown.cancel();
        let child = shutdown.child_token();
        assert!(child.is_cancelled());
        let _ = manager;
    }
}
