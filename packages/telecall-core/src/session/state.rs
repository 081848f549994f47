//! The `Session` entity: per-stream state driving the pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tokio::sync::Mutex;

use crate::audio::AudioBuffer;

/// Lifecycle states a `Session` moves through. See the state table in the
/// session manager's module docs for the full transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initializing,
    Active,
    Flushing,
    Finalizing,
    Closed,
}

/// Fields mutated only by the task currently driving this session's
/// ingestion pipeline, guarded by a single lock.
struct SessionInner {
    audio: AudioBuffer,
    sequence: u64,
    state: SessionState,
}

/// The central in-memory entity, one per `streamID`.
pub struct Session {
    /// Carrier-assigned stream identifier. Immutable.
    pub stream_id: String,
    /// Carrier-assigned call identifier. Immutable.
    pub call_id: String,
    /// Monotonic timestamp captured at `OnStart`.
    pub started_at: Instant,
    /// Marker for "at most one flush in flight" — read from other tasks
    /// without needing the full inner lock.
    flush_in_flight: AtomicBool,
    inner: Mutex<SessionInner>,
}

impl Session {
    /// Creates a new session in the `Initializing` state.
    #[must_use]
    pub fn new(stream_id: String, call_id: String, threshold_bytes: usize) -> Self {
        Self {
            stream_id,
            call_id,
            started_at: Instant::now(),
            flush_in_flight: AtomicBool::new(false),
            inner: Mutex::new(SessionInner {
                audio: AudioBuffer::new(threshold_bytes),
                sequence: 0,
                state: SessionState::Initializing,
            }),
        }
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// Transitions to a new lifecycle state.
    pub async fn set_state(&self, state: SessionState) {
        self.inner.lock().await.state = state;
    }

    /// Appends a chunk of decoded-from-base64 μ-law bytes to the buffer.
    pub async fn append_audio(&self, chunk: &[u8]) {
        self.inner.lock().await.audio.append(chunk);
    }

    /// Drains the buffer iff it has reached threshold.
    pub async fn drain_if_ready(&self) -> Option<Vec<u8>> {
        self.inner.lock().await.audio.drain_if_ready()
    }

    /// Drains all remaining buffered audio unconditionally.
    pub async fn drain_force(&self) -> Vec<u8> {
        self.inner.lock().await.audio.drain_force()
    }

    /// Allocates and returns the next `sequence` value for a persisted
    /// transcript chunk. Strictly increasing per session.
    pub async fn next_sequence(&self) -> u64 {
        let mut inner = self.inner.lock().await;
        let seq = inner.sequence;
        inner.sequence += 1;
        seq
    }

    /// Whether a flush is currently in flight for this stream.
    pub fn is_flush_in_flight(&self) -> bool {
        self.flush_in_flight.load(Ordering::SeqCst)
    }

    /// Marks a flush as started. Returns `false` (and does not mark) if one
    /// is already in flight — callers should not observe this in practice
    /// since flushes are serialized by the manager's per-stream gate, but it
    /// guards against misuse.
    pub fn begin_flush(&self) -> bool {
        self.flush_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Marks the in-flight flush as complete.
    pub fn end_flush(&self) {
        self.flush_in_flight.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sequence_is_strictly_increasing() {
        let session = Session::new("s1".into(), "c1".into(), 100);
        assert_eq!(session.next_sequence().await, 0);
        assert_eq!(session.next_sequence().await, 1);
        assert_eq!(session.next_sequence().await, 2);
    }

    #[tokio::test]
    async fn flush_in_flight_marker_is_exclusive() {
        let session = Session::new("s1".into(), "c1".into(), 100);
        assert!(session.begin_flush());
        assert!(!session.begin_flush());
        session.end_flush();
        assert!(session.begin_flush());
    }

    #[tokio::test]
    async fn state_transitions_are_observable() {
        let session = Session::new("s1".into(), "c1".into(), 100);
        assert_eq!(session.state().await, SessionState::Initializing);
        session.set_state(SessionState::Active).await;
        assert_eq!(session.state().await, SessionState::Active);
    }
}
