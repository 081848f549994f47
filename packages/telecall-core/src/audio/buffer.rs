//! Per-session audio buffer.
//!
//! A plain append-and-drain byte container. It does not know about VAD,
//! codecs, or locking — callers (the `Session`) guard it with their own
//! single-writer discipline.

/// A length-bounded accumulator of μ-law bytes for one session.
#[derive(Debug, Default, Clone)]
pub struct AudioBuffer {
    bytes: Vec<u8>,
    threshold_bytes: usize,
}

impl AudioBuffer {
    /// Creates an empty buffer that drains once it holds `threshold_bytes`.
    #[must_use]
    pub fn new(threshold_bytes: usize) -> Self {
        Self {
            bytes: Vec::new(),
            threshold_bytes,
        }
    }

    /// Appends a chunk of raw μ-law bytes to the buffer.
    pub fn append(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Number of bytes currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the buffer holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Drains and returns the full buffered content iff it has reached the
    /// configured threshold; otherwise leaves the buffer untouched.
    pub fn drain_if_ready(&mut self) -> Option<Vec<u8>> {
        if self.bytes.len() >= self.threshold_bytes {
            Some(std::mem::take(&mut self.bytes))
        } else {
            None
        }
    }

    /// Drains and returns all remaining content unconditionally, even if
    /// below threshold. Used on stream stop.
    pub fn drain_force(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drain_if_ready_is_none_below_threshold() {
        let mut buffer = AudioBuffer::new(100);
        buffer.append(&[0u8; 50]);
        assert!(buffer.drain_if_ready().is_none());
        assert_eq!(buffer.len(), 50);
    }

    #[test]
    fn drain_if_ready_empties_buffer_at_threshold() {
        let mut buffer = AudioBuffer::new(32_000);
        buffer.append(&vec![0u8; 16_000]);
        assert!(buffer.drain_if_ready().is_none());
        buffer.append(&vec![0u8; 16_000]);
        let drained = buffer.drain_if_ready().expect("threshold reached");
        assert_eq!(drained.len(), 32_000);
        assert!(buffer.is_empty());
    }

    #[test]
    fn drain_force_yields_partial_content() {
        let mut buffer = AudioBuffer::new(32_000);
        buffer.append(&vec![7u8; 4_000]);
        let drained = buffer.drain_force();
        assert_eq!(drained.len(), 4_000);
        assert!(buffer.is_empty());
    }

    #[test]
    fn drain_force_on_empty_buffer_yields_empty_vec() {
        let mut buffer = AudioBuffer::new(100);
        assert!(buffer.drain_force().is_empty());
    }
}
