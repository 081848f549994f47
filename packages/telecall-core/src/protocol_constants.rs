//! Named constants for the media session pipeline.
//!
//! Grouped by concern, following the same banner-comment convention
//! regardless of which concern's values happen to be fixed by an external
//! protocol (audio format, HTTP paths) versus merely defaulted and tunable
//! (buffer sizes, thresholds) — see `config.rs` for where the tunable ones
//! are actually read from.

// ─────────────────────────────────────────────────────────────────────────────
// Audio Format
// ─────────────────────────────────────────────────────────────────────────────

/// Default sample rate (Hz) for decoded PCM16 audio and the WAV container.
///
/// 8 kHz is the standard rate for G.711 telephony audio.
pub const DEFAULT_SAMPLE_RATE: u32 = 8_000;

/// Minimum configurable sample rate.
pub const MIN_SAMPLE_RATE: u32 = 8_000;

/// Maximum configurable sample rate.
pub const MAX_SAMPLE_RATE: u32 = 48_000;

/// Bits per decoded PCM sample. The codec always produces 16-bit linear PCM.
pub const PCM_BITS_PER_SAMPLE: u16 = 16;

/// Output channel count. Telephony audio is always monaural.
pub const PCM_CHANNELS: u16 = 1;

/// WAV `fmt ` subchunk's `audioFormat` tag for uncompressed PCM.
pub const WAV_AUDIO_FORMAT_PCM: u16 = 1;

// ─────────────────────────────────────────────────────────────────────────────
// Voice Activity Detection
// ─────────────────────────────────────────────────────────────────────────────

/// First canonical G.711 μ-law silence byte.
pub const MULAW_SILENCE_BYTE_FF: u8 = 0xFF;

/// Second canonical G.711 μ-law silence byte.
pub const MULAW_SILENCE_BYTE_7F: u8 = 0x7F;

/// Default fraction of silent samples required to classify a chunk as silent.
pub const DEFAULT_SILENCE_THRESHOLD: f64 = 0.9;

/// Minimum configurable silence threshold.
pub const MIN_SILENCE_THRESHOLD: f64 = 0.0;

/// Maximum configurable silence threshold.
pub const MAX_SILENCE_THRESHOLD: f64 = 1.0;

// ─────────────────────────────────────────────────────────────────────────────
// Audio Buffer
// ─────────────────────────────────────────────────────────────────────────────

/// Default buffering window before a flush is triggered, in seconds.
pub const DEFAULT_AUDIO_BUFFER_SECONDS: f64 = 4.0;

/// Minimum configurable buffering window, in seconds.
pub const MIN_AUDIO_BUFFER_SECONDS: f64 = 0.5;

/// Maximum configurable buffering window, in seconds.
pub const MAX_AUDIO_BUFFER_SECONDS: f64 = 10.0;

// ─────────────────────────────────────────────────────────────────────────────
// Remote Adapter Timeouts
// ─────────────────────────────────────────────────────────────────────────────

/// Default per-request timeout for the transcription service, in seconds.
pub const DEFAULT_TRANSCRIPTION_TIMEOUT_SECONDS: u64 = 60;

/// Floor applied to the insights service timeout regardless of configuration.
pub const MIN_INSIGHTS_TIMEOUT_SECONDS: u64 = 90;

/// Model name prefix that triggers the "extended reasoning" request shape,
/// which omits `temperature` from the request body.
pub const EXTENDED_REASONING_MODEL_PREFIX: &str = "gpt-5";

// ─────────────────────────────────────────────────────────────────────────────
// Protocol
// ─────────────────────────────────────────────────────────────────────────────

/// Path the carrier's Media Streams WebSocket and HTTP fallback are served on.
pub const MEDIA_STREAM_PATH: &str = "/api/twilio/media-stream";

/// Subscriber-group key prefix; the full key is `{GROUP_KEY_PREFIX}{callID}`.
pub const GROUP_KEY_PREFIX: &str = "call_";

/// Call-status values broadcast to every subscriber instead of just the
/// call's own group. Matched case-insensitively.
pub const ALL_SUBSCRIBER_CALL_STATUSES: &[&str] =
    &["ringing", "stream_started", "in-progress", "initiated"];

/// Capacity of the broadcast channels backing each subscriber group and the
/// all-subscribers channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;
