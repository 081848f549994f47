//! Persisted and broadcast data shapes produced by the pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transcription::TranscriptionResult;

/// Row key used for every `CallRecord`.
pub const CALL_ROW_KEY: &str = "call";
/// Row key used for every `SummaryRecord`.
pub const SUMMARY_ROW_KEY: &str = "summary";
/// Row key used for every `LocationRecord`.
pub const LOCATION_ROW_KEY: &str = "location";

/// Call metadata tracked across the lifetime of a call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallRecord {
    pub call_id: String,
    pub from: Option<String>,
    pub to: Option<String>,
    pub direction: Option<String>,
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<u64>,
    pub has_active_stream: bool,
    pub stream_id: Option<String>,
}

impl CallRecord {
    /// A freshly-started call record with an active stream.
    #[must_use]
    pub fn started(call_id: &str, stream_id: &str) -> Self {
        Self {
            call_id: call_id.to_string(),
            from: None,
            to: None,
            direction: None,
            status: "in-progress".to_string(),
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            has_active_stream: true,
            stream_id: Some(stream_id.to_string()),
        }
    }
}

/// A single persisted transcript chunk.
///
/// Partition = `callID` (case-normalized); Row = 20-digit zero-padded tick
/// value. `sequence` is the per-session monotonic counter; the row key tick
/// is a separate, wall-clock-derived ordering key used by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptChunk {
    pub result: TranscriptionResult,
    pub sequence: u64,
}

/// End-of-call (or incremental) summary. Upserted at-most-once-per-call;
/// last writer wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryRecord {
    pub call_id: String,
    pub summary: String,
    pub key_findings: Vec<String>,
    pub generated_at_utc: DateTime<Utc>,
}

/// Extracted geographic location. Only ever persisted when a formatted
/// address exists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationRecord {
    pub call_id: String,
    pub raw_text: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub formatted_address: Option<String>,
    pub confidence: f64,
}

/// Computes a 20-digit zero-padded row key from a tick count (100-ns units
/// since a fixed epoch), matching the ordering convention the store uses
/// for `TranscriptChunk` rows.
#[must_use]
pub fn ticks_row_key(ticks: u64) -> String {
    format!("{ticks:020}")
}

/// Converts a timestamp to tick count (100-ns units since the Unix epoch)
/// for use with [`ticks_row_key`]. Saturates to `0` for timestamps at or
/// before the epoch, which never occurs for live call data.
#[must_use]
pub fn ticks_since_epoch(timestamp: DateTime<Utc>) -> u64 {
    let nanos = timestamp.timestamp_nanos_opt().unwrap_or(0).max(0);
    (nanos / 100) as u64
}

/// One push-channel event, tagged by kind, matching the outbound
/// Broadcaster interface's event names.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum PushEvent {
    ReceiveTranscriptUpdate {
        call_id: String,
        text: String,
        is_final: bool,
    },
    ReceiveCallStatusUpdate {
        call_id: String,
        status: String,
    },
    ReceiveSummaryUpdate {
        call_id: String,
        summary: String,
        key_findings: Vec<String>,
    },
    ReceiveLocationUpdate {
        call_id: String,
        latitude: f64,
        longitude: f64,
        address: Option<String>,
    },
}
