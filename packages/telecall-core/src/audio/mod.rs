//! Audio decoding, framing, and voice-activity detection.

pub mod buffer;
pub mod codec;
pub mod vad;

pub use buffer::AudioBuffer;
pub use codec::{decode_mulaw_sample, decode_mulaw_to_pcm16, encode_mulaw_sample, encode_wav, mulaw_to_wav};
pub use vad::is_silent;
