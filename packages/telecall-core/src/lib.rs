//! Telecall Core - the media session pipeline library.
//!
//! This crate ingests live telephony audio from a carrier-side Media Streams
//! bridge, transcribes it incrementally against a cloud speech API, extracts
//! structured insights (running transcript, end-of-call summary, geographic
//! location), and fans the results out to a real-time push channel and a
//! persistence layer. It is designed to be embedded in a standalone server
//! binary; this crate never touches the filesystem, environment, or process
//! arguments directly — see `telecall-server` for that.
//!
//! # Architecture
//!
//! - [`config`]: pipeline configuration and validation
//! - [`error`]: centralized error types
//! - [`audio`]: μ-law decoding, WAV framing, voice activity detection, and
//!   the per-session audio buffer
//! - [`session`]: the per-stream state machine (`SessionManager`) and its
//!   registry
//! - [`transcription`]: the transcription service adapter
//! - [`insights`]: the insights extraction adapter
//! - [`dispatch`]: persistence stores, the push-channel broadcaster, and the
//!   `Dispatcher` façade tying them together
//! - [`protocol`]: the carrier-facing WebSocket and HTTP-fallback surfaces
//! - [`api`]: shared application state and the axum server entry point
//! - [`bootstrap`]: composition root wiring every adapter and service
//!
//! # Abstraction Traits
//!
//! Every collaborator the pipeline does not own outright is injected through
//! a trait so the pipeline itself can be exercised with fakes:
//!
//! - [`TranscriptionClient`](transcription::TranscriptionClient)
//! - [`InsightsExtractor`](insights::InsightsExtractor)
//! - [`CallStore`], [`TranscriptStore`], [`SummaryStore`], [`LocationStore`]
//!   (dispatch::store)
//! - [`Broadcaster`](dispatch::Broadcaster)

#![warn(clippy::all)]

pub mod api;
pub mod audio;
pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod insights;
pub mod protocol;
pub mod protocol_constants;
pub mod session;
pub mod transcription;

pub use audio::{codec, decode_mulaw_to_pcm16, encode_wav, is_silent, AudioBuffer};
pub use bootstrap::{bootstrap_services, BootstrappedServices};
pub use config::{Config, InsightsConfig, TranscriptionConfig};
pub use dispatch::{
    Broadcaster, CallRecord, CallStore, Dispatcher, GroupBroadcaster, InMemoryCallStore,
    InMemoryLocationStore, InMemorySummaryStore, InMemoryTranscriptStore, LocationRecord,
    LocationStore, PushEvent, SummaryRecord, SummaryStore, TranscriptChunk, TranscriptStore,
};
pub use error::{ErrorCode, TelecallError, TelecallResult};
pub use insights::{HttpInsightsExtractor, InsightsExtractor, InsightsResult};
pub use protocol::MediaStreamUrl;
pub use session::{Session, SessionManager, SessionState};
pub use transcription::{HttpTranscriptionClient, TranscriptionClient, TranscriptionResult};

pub use api::{start_server, AppState, AppStateBuilder, ServerError};
