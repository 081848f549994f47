//! WebSocket surface of the Media Streams protocol.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::api::AppState;
use crate::protocol::envelope::StreamFrame;
use crate::session::SessionManager;

/// Upgrades the connection and hands the socket to [`handle_socket`].
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let shutdown = state.shutdown.child_token();
    ws.on_upgrade(move |socket| handle_socket(socket, state.session_manager.clone(), shutdown))
}

/// The stream/call identity bound to this socket. The protocol only sends
/// `streamSid`/`callSid` on the `start` frame (§4.8); every `media`/`stop`
/// frame after it is addressed implicitly to whichever stream `start`
/// registered on this connection.
#[derive(Default)]
struct BoundStream {
    stream_id: Option<String>,
    call_id: Option<String>,
}

/// Reads text frames until the peer closes, an error occurs, or the
/// process starts shutting down, dispatching each parsed envelope to the
/// session manager. A single malformed frame is logged and skipped; it
/// never terminates the connection.
async fn handle_socket(
    mut socket: WebSocket,
    session_manager: std::sync::Arc<SessionManager>,
    shutdown: CancellationToken,
) {
    let mut bound = BoundStream::default();

    loop {
        let message = tokio::select! {
            message = socket.recv() => message,
            () = shutdown.cancelled() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        };

        let Some(message) = message else { break };

        let message = match message {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "websocket read error, closing connection");
                break;
            }
        };

        match message {
            Message::Text(text) => {
                dispatch_frame(&text, &session_manager, &mut bound).await;
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

/// Parses one JSON envelope and dispatches it to the session manager by
/// `event`, matched case-insensitively. `media`/`stop` frames carry no
/// `streamSid`/`callSid` of their own (§4.8) — they're addressed to
/// whichever stream `bound` captured from this socket's `start` frame.
async fn dispatch_frame(text: &str, session_manager: &SessionManager, bound: &mut BoundStream) {
    let frame: StreamFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "failed to parse media stream frame");
            return;
        }
    };

    match frame.event.to_lowercase().as_str() {
        "start" => {
            if let Some(start) = frame.start {
                bound.stream_id = Some(start.stream_sid.clone());
                bound.call_id = Some(start.call_sid.clone());
                session_manager.on_start(&start.stream_sid, &start.call_sid).await;
            } else {
                warn!("start event missing start payload");
            }
        }
        "media" => {
            let Some(stream_id) = bound.stream_id.as_deref() else {
                warn!("media event received before start on this connection");
                return;
            };
            if let Some(media) = frame.media {
                if let Some(payload) = media.payload {
                    session_manager.on_media(stream_id, &payload).await;
                }
            }
        }
        "stop" => {
            let Some(stream_id) = bound.stream_id.as_deref() else {
                warn!("stop event received before start on this connection");
                return;
            };
            let call_id = bound.call_id.as_deref().unwrap_or_default();
            session_manager.on_stop(stream_id, call_id).await;
        }
        other => {
            warn!(event = other, "unknown media stream event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{
        Broadcaster, Dispatcher, GroupBroadcaster, InMemoryCallStore, InMemoryLocationStore,
        InMemorySummaryStore, InMemoryTranscriptStore,
    };
    use crate::insights::{InsightsExtractor, InsightsResult};
    use crate::transcription::{TranscriptionClient, TranscriptionResult};
    use async_trait::async_trait;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTranscriptionClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TranscriptionClient for CountingTranscriptionClient {
        async fn transcribe(
            &self,
            call_id: &str,
            stream_id: &str,
            _wav: Bytes,
            is_final: bool,
            _ctx: &CancellationToken,
        ) -> Option<TranscriptionResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(TranscriptionResult {
                call_id: call_id.to_string(),
                stream_id: stream_id.to_string(),
                text: "hello".to_string(),
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

    fn test_session_manager(calls: Arc<CountingTranscriptionClient>) -> SessionManager {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(InMemoryCallStore::new()),
            Arc::new(InMemoryTranscriptStore::new()),
            Arc::new(InMemorySummaryStore::new()),
            Arc::new(InMemoryLocationStore::new()),
            Arc::new(GroupBroadcaster::new()) as Arc<dyn Broadcaster>,
        ));
        SessionManager::new(
            calls,
            Arc::new(NoopInsightsExtractor),
            dispatcher,
            crate::config::Config {
                audio_buffer_seconds: 4.0,
                sample_rate: 8_000,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn media_and_stop_frames_without_stream_sid_use_the_bound_start_stream() {
        let calls = Arc::new(CountingTranscriptionClient {
            calls: AtomicUsize::new(0),
        });
        let manager = test_session_manager(calls.clone());
        let mut bound = BoundStream::default();

        let start = r#"{"event":"start","start":{"streamSid":"s1","callSid":"c1"}}"#;
        dispatch_frame(start, &manager, &mut bound).await;
        assert_eq!(bound.stream_id.as_deref(), Some("s1"));

        let payload = BASE64.encode(vec![0x10u8; 32_000]);
        let media = format!(r#"{{"event":"media","media":{{"payload":"{payload}"}}}}"#);
        dispatch_frame(&media, &manager, &mut bound).await;
        assert_eq!(calls.calls.load(Ordering::SeqCst), 1);

        let stop = r#"{"event":"stop"}"#;
        dispatch_frame(stop, &manager, &mut bound).await;
        assert_eq!(manager.active_session_count(), 0);
    }

    #[tokio::test]
    async fn media_before_start_is_ignored() {
        let calls = Arc::new(CountingTranscriptionClient {
            calls: AtomicUsize::new(0),
        });
        let manager = test_session_manager(calls.clone());
        let mut bound = BoundStream::default();

        let payload = BASE64.encode(vec![0x10u8; 32_000]);
        let media = format!(r#"{{"event":"media","media":{{"payload":"{payload}"}}}}"#);
        dispatch_frame(&media, &manager, &mut bound).await;
        assert_eq!(calls.calls.load(Ordering::SeqCst), 0);
    }
}
