//! The transcription service adapter.

pub mod http_client;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

pub use http_client::HttpTranscriptionClient;

/// Transport DTO returned by a successful transcription.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptionResult {
    pub call_id: String,
    pub stream_id: String,
    /// Non-empty after trimming.
    pub text: String,
    pub is_final: bool,
    pub confidence: Option<f64>,
    pub timestamp_utc: DateTime<Utc>,
}

/// Capability to transcribe a flushed audio chunk.
///
/// Implementations never raise to the caller: every failure (non-2xx,
/// network error, cancellation, malformed response) is logged and
/// represented as `None`.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    /// Transcribes `wav` for `(call_id, stream_id)`. `call_id` and
    /// `stream_id` must be non-empty — that is an argument-range violation
    /// at the caller's boundary, not something this adapter itself
    /// re-validates. An empty `wav` yields `None`.
    ///
    /// `ctx` is the per-operation cancellation token derived from the
    /// inbound event's transport context; cancelling it must abort the
    /// outbound HTTP call in flight rather than wait out its timeout.
    async fn transcribe(
        &self,
        call_id: &str,
        stream_id: &str,
        wav: Bytes,
        is_final: bool,
        ctx: &CancellationToken,
    ) -> Option<TranscriptionResult>;
}
