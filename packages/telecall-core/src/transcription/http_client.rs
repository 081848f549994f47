//! HTTP multipart implementation of [`TranscriptionClient`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::TranscriptionConfig;
use crate::error::TelecallError;
use crate::transcription::{TranscriptionClient, TranscriptionResult};

/// Errors internal to the HTTP transcription adapter. Never escapes
/// [`HttpTranscriptionClient::transcribe`] — it is logged and converted to
/// `None` at the boundary, per the adapter's failure policy.
#[derive(Debug, Error)]
enum TranscriptionAdapterError {
    #[error("transcription request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transcription service returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("transcription request cancelled")]
    Cancelled,
}

impl TranscriptionAdapterError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Http(err) => !err.is_decode(),
            Self::HttpStatus { .. } | Self::Cancelled => true,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponseBody {
    text: String,
    confidence: Option<f64>,
}

/// Calls a transcription service over HTTP POST multipart/form-data with
/// Bearer auth, per the outbound transcription interface.
pub struct HttpTranscriptionClient {
    http: Client,
    config: TranscriptionConfig,
}

impl HttpTranscriptionClient {
    /// Builds a client around a shared `reqwest::Client` and the
    /// transcription settings from configuration.
    #[must_use]
    pub fn new(http: Client, config: TranscriptionConfig) -> Self {
        Self { http, config }
    }

    async fn transcribe_inner(
        &self,
        wav: Bytes,
        ctx: &CancellationToken,
    ) -> Result<Option<TranscriptionResponseBody>, TranscriptionAdapterError> {
        let file_part = Part::bytes(wav.to_vec())
            .file_name("audio.wav")
            .mime_str("audio/wav")
            .expect("audio/wav is a valid MIME type");

        let form = Form::new()
            .part("file", file_part)
            .text("model", self.config.model.clone())
            .text("temperature", self.config.temperature.to_string());

        let request = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .multipart(form)
            .send();

        let response = tokio::select! {
            result = request => result?,
            () = ctx.cancelled() => return Err(TranscriptionAdapterError::Cancelled),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscriptionAdapterError::HttpStatus { status, body });
        }

        let body: TranscriptionResponseBody = response.json().await?;
        Ok(Some(body))
    }
}

#[async_trait]
impl TranscriptionClient for HttpTranscriptionClient {
    async fn transcribe(
        &self,
        call_id: &str,
        stream_id: &str,
        wav: Bytes,
        is_final: bool,
        ctx: &CancellationToken,
    ) -> Option<TranscriptionResult> {
        if call_id.is_empty() || stream_id.is_empty() {
            let err = TelecallError::InvalidArgument(
                "transcribe called with empty call_id or stream_id".to_string(),
            );
            panic!("{err}");
        }
        if wav.is_empty() {
            return None;
        }

        match self.transcribe_inner(wav, ctx).await {
            Ok(Some(body)) => {
                let text = body.text.trim();
                if text.is_empty() {
                    return None;
                }
                Some(TranscriptionResult {
                    call_id: call_id.to_string(),
                    stream_id: stream_id.to_string(),
                    text: text.to_string(),
                    is_final,
                    confidence: body.confidence,
                    timestamp_utc: Utc::now(),
                })
            }
            Ok(None) => None,
            Err(err) => {
                if err.is_transient() {
                    warn!(call_id, stream_id, error = %err, "transcription request failed, dropping flush");
                } else {
                    error!(call_id, stream_id, error = %err, "transcription response could not be parsed");
                }
                None
            }
        }
    }
}
