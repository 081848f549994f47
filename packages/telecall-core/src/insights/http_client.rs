//! HTTP chat-completion implementation of [`InsightsExtractor`].

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use crate::config::InsightsConfig;
use crate::insights::{InsightsExtractor, InsightsResult, LocationInsight, SummaryInsight};
use crate::protocol_constants::EXTENDED_REASONING_MODEL_PREFIX;

const SYSTEM_DIRECTIVE: &str =
    "Extract location, summary, and key_findings from the following call transcript. \
     Respond with a JSON object: {\"location\": {\"address\": string, \"latitude\": number, \
     \"longitude\": number, \"confidence\": number} | null, \"summary\": string | null, \
     \"key_findings\": string[] | null}.";

/// Which request shape to build, keyed by model name prefix rather than
/// inheritance — some model families (`gpt-5*`) reject a `temperature`
/// field entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModelFamily {
    Standard,
    ExtendedReasoning,
}

impl ModelFamily {
    fn for_model(model: &str) -> Self {
        if model.starts_with(EXTENDED_REASONING_MODEL_PREFIX) {
            Self::ExtendedReasoning
        } else {
            Self::Standard
        }
    }
}

#[derive(Debug, Error)]
enum InsightsAdapterError {
    #[error("insights request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("insights service returned {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("malformed insights response: {0}")]
    MalformedResponse(String),

    #[error("insights request cancelled")]
    Cancelled,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: ResponseFormat<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct ParsedInsightsBody {
    location: Option<ParsedLocation>,
    summary: Option<String>,
    key_findings: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ParsedLocation {
    address: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    confidence: Option<f64>,
}

/// Calls a chat-completion-style insights service over HTTP POST with
/// Bearer auth, per the outbound insights interface.
pub struct HttpInsightsExtractor {
    http: Client,
    config: InsightsConfig,
}

impl HttpInsightsExtractor {
    /// Builds an extractor around a shared `reqwest::Client` and the
    /// insights settings from configuration.
    #[must_use]
    pub fn new(http: Client, config: InsightsConfig) -> Self {
        Self { http, config }
    }

    fn build_request<'a>(&self, model: &'a str, transcript: &'a str) -> ChatCompletionRequest<'a> {
        let family = ModelFamily::for_model(model);
        let temperature = match family {
            ModelFamily::Standard => Some(0.2),
            ModelFamily::ExtendedReasoning => None,
        };

        ChatCompletionRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_DIRECTIVE,
                },
                ChatMessage {
                    role: "user",
                    content: transcript,
                },
            ],
            response_format: ResponseFormat { kind: "json_object" },
            temperature,
        }
    }

    async fn extract_inner(
        &self,
        transcript: &str,
        ctx: &CancellationToken,
    ) -> Result<ParsedInsightsBody, InsightsAdapterError> {
        let model = self.config.default_model.clone();
        let request = self.build_request(&model, transcript);

        let send = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.effective_timeout_seconds()))
            .json(&request)
            .send();

        let response = tokio::select! {
            result = send => result?,
            () = ctx.cancelled() => return Err(InsightsAdapterError::Cancelled),
        };

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(InsightsAdapterError::HttpStatus { status, body });
        }

        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .ok_or_else(|| InsightsAdapterError::MalformedResponse("no choices in response".into()))?;

        let raw: Value = serde_json::from_str(content)
            .map_err(|err| InsightsAdapterError::MalformedResponse(err.to_string()))?;
        let parsed: ParsedInsightsBody = serde_json::from_value(raw)
            .map_err(|err| InsightsAdapterError::MalformedResponse(err.to_string()))?;

        Ok(parsed)
    }
}

#[async_trait]
impl InsightsExtractor for HttpInsightsExtractor {
    async fn extract(
        &self,
        call_id: &str,
        transcript: &str,
        ctx: &CancellationToken,
    ) -> Option<InsightsResult> {
        if transcript.trim().is_empty() {
            return None;
        }

        match self.extract_inner(transcript, ctx).await {
            Ok(parsed) => Some(build_insights_result(parsed)),
            Err(InsightsAdapterError::MalformedResponse(reason)) => {
                error!(call_id, reason, "insights response could not be parsed");
                None
            }
            Err(err) => {
                warn!(call_id, error = %err, "insights request failed");
                None
            }
        }
    }
}

fn build_insights_result(parsed: ParsedInsightsBody) -> InsightsResult {
    let summary = parsed.summary.filter(|s| !s.trim().is_empty()).map(|summary| {
        SummaryInsight {
            summary,
            key_findings: parsed.key_findings.clone().unwrap_or_default(),
            generated_at_utc: Utc::now(),
        }
    });

    let location = parsed.location.and_then(|loc| {
        let address = loc.address.filter(|a| !a.trim().is_empty())?;
        let (latitude, longitude) = (loc.latitude?, loc.longitude?);
        Some(LocationInsight {
            raw_text: Some(address.clone()),
            latitude,
            longitude,
            formatted_address: address,
            confidence: loc.confidence.unwrap_or(0.0),
        })
    });

    InsightsResult { summary, location }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gpt5_models_omit_temperature() {
        assert_eq!(ModelFamily::for_model("gpt-5"), ModelFamily::ExtendedReasoning);
        assert_eq!(ModelFamily::for_model("gpt-5-mini"), ModelFamily::ExtendedReasoning);
        assert_eq!(ModelFamily::for_model("gpt-4o"), ModelFamily::Standard);
    }

    #[test]
    fn summary_absent_when_field_is_empty_string() {
        let parsed = ParsedInsightsBody {
            location: None,
            summary: Some("   ".to_string()),
            key_findings: None,
        };
        let result = build_insights_result(parsed);
        assert!(result.summary.is_none());
    }

    #[test]
    fn location_requires_address_and_both_coordinates() {
        let parsed = ParsedInsightsBody {
            location: Some(ParsedLocation {
                address: Some("1 Main St".into()),
                latitude: Some(37.0),
                longitude: None,
                confidence: None,
            }),
            summary: None,
            key_findings: None,
        };
        let result = build_insights_result(parsed);
        assert!(result.location.is_none());
    }

    #[test]
    fn location_confidence_defaults_to_zero() {
        let parsed = ParsedInsightsBody {
            location: Some(ParsedLocation {
                address: Some("1 Main St".into()),
                latitude: Some(37.0),
                longitude: Some(-122.0),
                confidence: None,
            }),
            summary: None,
            key_findings: None,
        };
        let result = build_insights_result(parsed);
        let location = result.location.expect("location should be present");
        assert_eq!(location.confidence, 0.0);
    }
}
