//! Persistence store adapters.
//!
//! Each store is a one-method-per-operation capability trait with an
//! in-memory `DashMap`-backed reference implementation, following the
//! primary-map-plus-methods shape used elsewhere in this crate for
//! concurrent keyed registries. Partition = lowercased `callID`; row keys
//! are the fixed strings named in `model.rs` (or, for transcript chunks, a
//! tick-derived key) — see the outbound Stores interface for the full
//! partition/row-key contract.
//!
//! Writes return `TelecallResult<()>` so a failing write can be logged and
//! swallowed independently of whatever else the dispatcher does with the
//! same artifact (see `dispatch::Dispatcher`). These in-memory stores exist
//! so the crate is runnable and testable on its own and never actually
//! fail; a real deployment supplies its own implementations backed by a
//! durable partition store, where writes can fail.

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::dispatch::model::{ticks_row_key, ticks_since_epoch, CallRecord, LocationRecord, SummaryRecord, TranscriptChunk};
use crate::error::TelecallResult;

fn partition_key(call_id: &str) -> String {
    call_id.to_lowercase()
}

/// Call metadata storage.
#[async_trait]
pub trait CallStore: Send + Sync {
    /// Inserts or overwrites the `CallRecord` for `record.call_id`.
    async fn upsert(&self, record: CallRecord) -> TelecallResult<()>;

    /// Read-modify-write: updates the active-stream fields on the call's
    /// existing record. A no-op if no record exists yet.
    async fn update_stream(
        &self,
        call_id: &str,
        stream_id: Option<&str>,
        has_active_stream: bool,
    ) -> TelecallResult<()>;

    /// Fetches the current record for `call_id`, if any.
    async fn get(&self, call_id: &str) -> Option<CallRecord>;
}

/// Transcript chunk storage, ordered by the 20-digit tick row key within a
/// call.
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    /// Persists one transcript chunk.
    async fn save(&self, chunk: TranscriptChunk) -> TelecallResult<()>;

    /// Returns all chunks persisted for `call_id`, ordered by row key.
    async fn list(&self, call_id: &str) -> Vec<TranscriptChunk>;
}

/// End-of-call summary storage.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    /// Inserts or overwrites the summary for `record.call_id`.
    async fn upsert(&self, record: SummaryRecord) -> TelecallResult<()>;

    /// Fetches the current summary for `call_id`, if any.
    async fn get(&self, call_id: &str) -> Option<SummaryRecord>;
}

/// Extracted-location storage.
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Inserts or overwrites the location for `record.call_id`.
    async fn upsert(&self, record: LocationRecord) -> TelecallResult<()>;

    /// Fetches the current location for `call_id`, if any.
    async fn get(&self, call_id: &str) -> Option<LocationRecord>;
}

/// In-memory `CallStore`, keyed by lowercased `callID`.
#[derive(Default)]
pub struct InMemoryCallStore {
    records: DashMap<String, CallRecord>,
}

impl InMemoryCallStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CallStore for InMemoryCallStore {
    async fn upsert(&self, record: CallRecord) -> TelecallResult<()> {
        self.records.insert(partition_key(&record.call_id), record);
        Ok(())
    }

    async fn update_stream(
        &self,
        call_id: &str,
        stream_id: Option<&str>,
        has_active_stream: bool,
    ) -> TelecallResult<()> {
        if let Some(mut entry) = self.records.get_mut(&partition_key(call_id)) {
            entry.has_active_stream = has_active_stream;
            entry.stream_id = stream_id.map(str::to_string);
        }
        Ok(())
    }

    async fn get(&self, call_id: &str) -> Option<CallRecord> {
        self.records.get(&partition_key(call_id)).map(|r| r.clone())
    }
}

/// In-memory `TranscriptStore`, keyed by lowercased `callID`, with chunks
/// ordered within a call by [`ticks_row_key`]. Ticks are derived from each
/// chunk's `timestamp_utc` and bumped past the previous tick for that call
/// when two chunks land in the same 100-ns bucket, so the row key stays
/// strictly increasing.
#[derive(Default)]
pub struct InMemoryTranscriptStore {
    chunks: DashMap<String, BTreeMap<String, TranscriptChunk>>,
    last_ticks: DashMap<String, u64>,
}

impl InMemoryTranscriptStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscriptStore for InMemoryTranscriptStore {
    async fn save(&self, chunk: TranscriptChunk) -> TelecallResult<()> {
        let partition = partition_key(&chunk.result.call_id);
        let mut ticks = ticks_since_epoch(chunk.result.timestamp_utc);

        let mut last = self.last_ticks.entry(partition.clone()).or_insert(0);
        if ticks <= *last {
            ticks = *last + 1;
        }
        *last = ticks;
        drop(last);

        self.chunks
            .entry(partition)
            .or_default()
            .insert(ticks_row_key(ticks), chunk);
        Ok(())
    }

    async fn list(&self, call_id: &str) -> Vec<TranscriptChunk> {
        self.chunks
            .get(&partition_key(call_id))
            .map(|entry| entry.values().cloned().collect())
            .unwrap_or_default()
    }
}

/// In-memory `SummaryStore`, keyed by lowercased `callID`.
#[derive(Default)]
pub struct InMemorySummaryStore {
    records: DashMap<String, SummaryRecord>,
}

impl InMemorySummaryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SummaryStore for InMemorySummaryStore {
    async fn upsert(&self, record: SummaryRecord) -> TelecallResult<()> {
        self.records.insert(partition_key(&record.call_id), record);
        Ok(())
    }

    async fn get(&self, call_id: &str) -> Option<SummaryRecord> {
        self.records.get(&partition_key(call_id)).map(|r| r.clone())
    }
}

/// In-memory `LocationStore`, keyed by lowercased `callID`.
#[derive(Default)]
pub struct InMemoryLocationStore {
    records: DashMap<String, LocationRecord>,
}

impl InMemoryLocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn upsert(&self, record: LocationRecord) -> TelecallResult<()> {
        self.records.insert(partition_key(&record.call_id), record);
        Ok(())
    }

    async fn get(&self, call_id: &str) -> Option<LocationRecord> {
        self.records.get(&partition_key(call_id)).map(|r| r.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcription::TranscriptionResult;
    use chrono::{Duration, Utc};

    fn sample_chunk(call_id: &str, sequence: u64) -> TranscriptChunk {
        TranscriptChunk {
            result: TranscriptionResult {
                call_id: call_id.to_string(),
                stream_id: "s1".to_string(),
                text: "hello".to_string(),
                is_final: false,
                confidence: None,
                timestamp_utc: Utc::now() + Duration::microseconds(sequence as i64),
            },
            sequence,
        }
    }

    #[tokio::test]
    async fn call_store_partitions_case_insensitively() {
        let store = InMemoryCallStore::new();
        store.upsert(CallRecord::started("CALL-1", "s1")).await.unwrap();
        assert!(store.get("call-1").await.is_some());
    }

    #[tokio::test]
    async fn update_stream_is_noop_without_existing_record() {
        let store = InMemoryCallStore::new();
        store.update_stream("unknown", None, false).await.unwrap();
        assert!(store.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn update_stream_clears_active_flag() {
        let store = InMemoryCallStore::new();
        store.upsert(CallRecord::started("c1", "s1")).await.unwrap();
        store.update_stream("c1", None, false).await.unwrap();
        let record = store.get("c1").await.expect("record exists");
        assert!(!record.has_active_stream);
        assert!(record.stream_id.is_none());
    }

    #[tokio::test]
    async fn transcript_store_orders_by_tick_row_key() {
        let store = InMemoryTranscriptStore::new();
        store.save(sample_chunk("c1", 0)).await.unwrap();
        store.save(sample_chunk("c1", 1)).await.unwrap();
        let chunks = store.list("c1").await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[1].sequence, 1);
    }

    #[tokio::test]
    async fn transcript_store_keeps_row_keys_strictly_increasing_on_tick_collision() {
        let store = InMemoryTranscriptStore::new();
        let timestamp = Utc::now();
        let mut first = sample_chunk("c1", 0);
        first.result.timestamp_utc = timestamp;
        let mut second = sample_chunk("c1", 1);
        second.result.timestamp_utc = timestamp;

        store.save(first).await.unwrap();
        store.save(second).await.unwrap();

        let chunks = store.list("c1").await;
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].sequence, 0);
        assert_eq!(chunks[1].sequence, 1);
    }

    #[tokio::test]
    async fn summary_store_upsert_overwrites() {
        let store = InMemorySummaryStore::new();
        store
            .upsert(SummaryRecord {
                call_id: "c1".into(),
                summary: "first".into(),
                key_findings: vec![],
                generated_at_utc: Utc::now(),
            })
            .await
            .unwrap();
        store
            .upsert(SummaryRecord {
                call_id: "c1".into(),
                summary: "second".into(),
                key_findings: vec![],
                generated_at_utc: Utc::now(),
            })
            .await
            .unwrap();
        let record = store.get("c1").await.expect("record exists");
        assert_eq!(record.summary, "second");
    }
}
