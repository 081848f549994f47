//! The per-stream session state machine.

pub mod manager;
pub mod state;
pub mod transcript;

pub use manager::SessionManager;
pub use state::{Session, SessionState};
pub use transcript::TranscriptAccumulator;
