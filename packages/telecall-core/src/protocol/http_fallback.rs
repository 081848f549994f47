//! HTTP form-encoded fallback for carriers that do not use WebSocket.
//!
//! Always returns 200, even when internal handling fails, so the carrier
//! does not retry the request as a failure.

use axum::extract::{Form, State};
use axum::http::StatusCode;

use crate::api::AppState;
use crate::protocol::envelope::MediaStreamForm;

pub async fn http_fallback_handler(
    State(state): State<AppState>,
    Form(form): Form<MediaStreamForm>,
) -> StatusCode {
    match form.event.to_lowercase().as_str() {
        "start" => {
            state
                .session_manager
                .on_start(&form.stream_sid, &form.call_sid)
                .await;
        }
        "media" => {
            if let Some(payload) = form.media_payload {
                state.session_manager.on_media(&form.stream_sid, &payload).await;
            }
        }
        "stop" => {
            state
                .session_manager
                .on_stop(&form.stream_sid, &form.call_sid)
                .await;
        }
        other => {
            tracing::warn!(event = other, "unknown media stream form event");
        }
    }

    StatusCode::OK
}
