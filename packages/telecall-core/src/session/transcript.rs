//! Per-CallID ordered transcript accumulation.

use dashmap::DashMap;
use parking_lot::Mutex;

/// Accumulates accepted transcript segments per `callID` across however
/// many streams contribute to that call, and joins them on demand for the
/// insights passes.
#[derive(Default)]
pub struct TranscriptAccumulator {
    entries: DashMap<String, Mutex<Vec<String>>>,
}

impl TranscriptAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` to the sequence accumulated for `call_id`.
    pub fn append(&self, call_id: &str, text: &str) {
        self.entries
            .entry(call_id.to_string())
            .or_default()
            .lock()
            .push(text.to_string());
    }

    /// Joins the accumulated segments for `call_id` with a single space.
    /// Returns an empty string if nothing has been accumulated yet.
    #[must_use]
    pub fn join(&self, call_id: &str) -> String {
        self.entries
            .get(call_id)
            .map(|segments| segments.lock().join(" "))
            .unwrap_or_default()
    }

    /// Releases the accumulated transcript for `call_id`. Called once
    /// Finalize completes for that call.
    pub fn clear(&self, call_id: &str) {
        self.entries.remove(call_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_concatenates_in_append_order() {
        let accumulator = TranscriptAccumulator::new();
        accumulator.append("c1", "hello");
        accumulator.append("c1", "world");
        assert_eq!(accumulator.join("c1"), "hello world");
    }

    #[test]
    fn join_on_unknown_call_is_empty() {
        let accumulator = TranscriptAccumulator::new();
        assert_eq!(accumulator.join("unknown"), "");
    }

    #[test]
    fn clear_removes_accumulated_state() {
        let accumulator = TranscriptAccumulator::new();
        accumulator.append("c1", "hello");
        accumulator.clear("c1");
        assert_eq!(accumulator.join("c1"), "");
    }

    #[test]
    fn separate_calls_do_not_interfere() {
        let accumulator = TranscriptAccumulator::new();
        accumulator.append("c1", "one");
        accumulator.append("c2", "two");
        assert_eq!(accumulator.join("c1"), "one");
        assert_eq!(accumulator.join("c2"), "two");
    }
}
