//! The carrier-facing Media Streams protocol: WebSocket, HTTP fallback,
//! and the URL builder a webhook handler uses to advertise the stream.

pub mod envelope;
pub mod http_fallback;
pub mod ws;

pub use envelope::{MediaStreamForm, StreamFrame};
pub use http_fallback::http_fallback_handler;
pub use ws::ws_handler;

use crate::protocol_constants::MEDIA_STREAM_PATH;

/// Derives the carrier-facing media stream URL from a configured
/// `webhookBaseURL`, swapping `https→wss` / `http→ws` and appending the
/// fixed media stream path. Not called by the pipeline itself — it exists
/// for an (out-of-scope) `CallWebhookHandler` to hand back in a TwiML
/// `<Stream>` response.
pub struct MediaStreamUrl;

impl MediaStreamUrl {
    /// Builds the `wss://`/`ws://` URL a carrier should stream audio to,
    /// given the configured `webhookBaseURL`. Returns `None` if the base
    /// URL's scheme is neither `http` nor `https`.
    #[must_use]
    pub fn from_webhook_base(webhook_base_url: &str) -> Option<String> {
        let (scheme, rest) = webhook_base_url.split_once("://")?;
        let ws_scheme = match scheme {
            "https" => "wss",
            "http" => "ws",
            _ => return None,
        };
        let rest = rest.trim_end_matches('/');
        Some(format!("{ws_scheme}://{rest}{MEDIA_STREAM_PATH}"))
    }
}
