//! Wire shapes for the carrier's Media Streams protocol.

use serde::Deserialize;

/// One JSON frame from the carrier WebSocket. `event` is matched
/// case-insensitively by the reader, not by serde itself, since carriers
/// are not guaranteed to send a consistent case.
#[derive(Debug, Deserialize)]
pub struct StreamFrame {
    pub event: String,
    #[serde(default)]
    pub start: Option<StartPayload>,
    #[serde(default)]
    pub media: Option<MediaPayload>,
}

#[derive(Debug, Deserialize)]
pub struct StartPayload {
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "callSid")]
    pub call_sid: String,
}

#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    #[serde(default)]
    pub payload: Option<String>,
}

/// The HTTP form-encoded fallback's fields, for carriers that cannot
/// establish a WebSocket connection.
#[derive(Debug, Deserialize)]
pub struct MediaStreamForm {
    #[serde(rename = "StreamSid", default)]
    pub stream_sid: String,
    #[serde(rename = "CallSid", default)]
    pub call_sid: String,
    #[serde(rename = "Event", default)]
    pub event: String,
    #[serde(rename = "MediaPayload", default)]
    pub media_payload: Option<String>,
}
