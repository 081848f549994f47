//! The fan-out façade: for every produced artifact, persist then broadcast,
//! with each side effect's failure logged and swallowed independently so a
//! failure of one never suppresses the other.

pub mod broadcaster;
pub mod model;
pub mod store;

use std::sync::Arc;

pub use broadcaster::{group_key, Broadcaster, GroupBroadcaster};
pub use model::{CallRecord, LocationRecord, PushEvent, SummaryRecord, TranscriptChunk};
pub use store::{
    CallStore, InMemoryCallStore, InMemoryLocationStore, InMemorySummaryStore,
    InMemoryTranscriptStore, LocationStore, SummaryStore, TranscriptStore,
};

use tracing::warn;

use crate::insights::InsightsResult;
use crate::transcription::TranscriptionResult;

/// Persists and broadcasts every artifact the pipeline produces, per the
/// fan-out table: `OnStart` → call-status events; an accepted flush →
/// transcript update; insights → summary/location updates; `OnStop` →
/// final call-status event.
pub struct Dispatcher {
    calls: Arc<dyn CallStore>,
    transcripts: Arc<dyn TranscriptStore>,
    summaries: Arc<dyn SummaryStore>,
    locations: Arc<dyn LocationStore>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl Dispatcher {
    #[must_use]
    pub fn new(
        calls: Arc<dyn CallStore>,
        transcripts: Arc<dyn TranscriptStore>,
        summaries: Arc<dyn SummaryStore>,
        locations: Arc<dyn LocationStore>,
        broadcaster: Arc<dyn Broadcaster>,
    ) -> Self {
        Self {
            calls,
            transcripts,
            summaries,
            locations,
            broadcaster,
        }
    }

    /// `OnStart`: records the call with an active stream, then emits
    /// `stream_started` (all subscribers) and `in-progress` (all
    /// subscribers, per the fixed status list). Each step's failure is
    /// logged and does not stop the rest from firing.
    pub async fn on_stream_started(&self, call_id: &str, stream_id: &str) {
        if let Err(err) = self.calls.upsert(CallRecord::started(call_id, stream_id)).await {
            warn!(call_id, error = %err, "failed to persist call record on stream start");
        }
        if let Err(err) = self.calls.update_stream(call_id, Some(stream_id), true).await {
            warn!(call_id, error = %err, "failed to update active-stream fields on stream start");
        }

        if let Err(err) = self
            .broadcaster
            .broadcast_call_status_update(call_id, "stream_started")
            .await
        {
            warn!(call_id, error = %err, "failed to broadcast stream_started status");
        }
        if let Err(err) = self
            .broadcaster
            .broadcast_call_status_update(call_id, "in-progress")
            .await
        {
            warn!(call_id, error = %err, "failed to broadcast in-progress status");
        }
    }

    /// `OnStop`: clears the active-stream fields, then emits
    /// `stream_stopped` to the call's own group.
    pub async fn on_stream_stopped(&self, call_id: &str, stream_id: &str) {
        let _ = stream_id;
        if let Err(err) = self.calls.update_stream(call_id, None, false).await {
            warn!(call_id, error = %err, "failed to clear active-stream fields on stream stop");
        }
        if let Err(err) = self
            .broadcaster
            .broadcast_call_status_update(call_id, "stream_stopped")
            .await
        {
            warn!(call_id, error = %err, "failed to broadcast stream_stopped status");
        }
    }

    /// A flush produced accepted text: persist the chunk then broadcast the
    /// transcript update to the call's group. Persistence failure does not
    /// suppress the broadcast, and vice versa.
    pub async fn on_transcript(
        &self,
        call_id: &str,
        stream_id: &str,
        result: &TranscriptionResult,
        sequence: u64,
    ) {
        let _ = stream_id;
        if let Err(err) = self
            .transcripts
            .save(TranscriptChunk {
                result: result.clone(),
                sequence,
            })
            .await
        {
            warn!(call_id, sequence, error = %err, "failed to persist transcript chunk");
        }

        if let Err(err) = self
            .broadcaster
            .broadcast_transcript_update(call_id, &result.text, result.is_final)
            .await
        {
            warn!(call_id, error = %err, "failed to broadcast transcript update");
        }
    }

    /// One insights pass produced a result: persist and broadcast whichever
    /// of summary/location are present, independently. A failure in either
    /// the persistence or broadcast leg of one artifact never suppresses
    /// the other leg or the other artifact.
    pub async fn on_insights(&self, call_id: &str, insights: &InsightsResult) {
        if let Some(summary) = &insights.summary {
            if let Err(err) = self
                .summaries
                .upsert(SummaryRecord {
                    call_id: call_id.to_string(),
                    summary: summary.summary.clone(),
                    key_findings: summary.key_findings.clone(),
                    generated_at_utc: summary.generated_at_utc,
                })
                .await
            {
                warn!(call_id, error = %err, "failed to persist summary record");
            }

            if let Err(err) = self
                .broadcaster
                .broadcast_summary_update(call_id, &summary.summary, &summary.key_findings)
                .await
            {
                warn!(call_id, error = %err, "failed to broadcast summary update");
            }
        }

        if let Some(location) = &insights.location {
            if let Err(err) = self
                .locations
                .upsert(LocationRecord {
                    call_id: call_id.to_string(),
                    raw_text: location.raw_text.clone(),
                    latitude: Some(location.latitude),
                    longitude: Some(location.longitude),
                    formatted_address: Some(location.formatted_address.clone()),
                    confidence: location.confidence,
                })
                .await
            {
                warn!(call_id, error = %err, "failed to persist location record");
            }

            if let Err(err) = self
                .broadcaster
                .broadcast_location_update(
                    call_id,
                    location.latitude,
                    location.longitude,
                    Some(location.formatted_address.as_str()),
                )
                .await
            {
                warn!(call_id, error = %err, "failed to broadcast location update");
            }
        }
    }
}
