//! Pipeline configuration.
//!
//! `Config` is the typed, validated configuration surface for the media
//! session pipeline. The binary crate is responsible for loading this from
//! YAML and environment variables; this crate only validates the result.

use serde::{Deserialize, Serialize};

use crate::protocol_constants::{
    DEFAULT_AUDIO_BUFFER_SECONDS, DEFAULT_SAMPLE_RATE, DEFAULT_SILENCE_THRESHOLD,
    DEFAULT_TRANSCRIPTION_TIMEOUT_SECONDS, MAX_AUDIO_BUFFER_SECONDS, MAX_SAMPLE_RATE,
    MAX_SILENCE_THRESHOLD, MIN_AUDIO_BUFFER_SECONDS, MIN_INSIGHTS_TIMEOUT_SECONDS,
    MIN_SAMPLE_RATE, MIN_SILENCE_THRESHOLD,
};

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds of buffered audio before a flush is triggered.
    /// Range `[0.5, 10.0]`. Default `4.0`.
    pub audio_buffer_seconds: f64,

    /// Fraction of silent samples required to classify a chunk as silent.
    /// Range `[0.0, 1.0]`. Default `0.9`.
    pub silence_threshold: f64,

    /// Sample rate (Hz) used for the decoded PCM16/WAV output.
    /// Range `[8000, 48000]`. Default `8000`.
    pub sample_rate: u32,

    /// Transcription service settings.
    pub transcription: TranscriptionConfig,

    /// Insights service settings.
    pub insights: InsightsConfig,

    /// Base URL used to derive the carrier-facing media stream URL
    /// (`https`→`wss`, `http`→`ws`, suffixed with the media stream path).
    pub webhook_base_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            audio_buffer_seconds: DEFAULT_AUDIO_BUFFER_SECONDS,
            silence_threshold: DEFAULT_SILENCE_THRESHOLD,
            sample_rate: DEFAULT_SAMPLE_RATE,
            transcription: TranscriptionConfig::default(),
            insights: InsightsConfig::default(),
            webhook_base_url: None,
        }
    }
}

impl Config {
    /// Number of bytes of μ-law audio that must accumulate before a flush,
    /// derived from `audio_buffer_seconds` at the configured sample rate
    /// (one byte per sample for 8-bit μ-law).
    #[must_use]
    pub fn threshold_bytes(&self) -> usize {
        (self.audio_buffer_seconds * self.sample_rate as f64).round() as usize
    }

    /// Validates the configuration, returning a human-readable error for the
    /// first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if !(MIN_AUDIO_BUFFER_SECONDS..=MAX_AUDIO_BUFFER_SECONDS)
            .contains(&self.audio_buffer_seconds)
        {
            return Err(format!(
                "audio_buffer_seconds must be in [{MIN_AUDIO_BUFFER_SECONDS}, {MAX_AUDIO_BUFFER_SECONDS}], got {}",
                self.audio_buffer_seconds
            ));
        }
        if !(MIN_SILENCE_THRESHOLD..=MAX_SILENCE_THRESHOLD).contains(&self.silence_threshold) {
            return Err(format!(
                "silence_threshold must be in [{MIN_SILENCE_THRESHOLD}, {MAX_SILENCE_THRESHOLD}], got {}",
                self.silence_threshold
            ));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(format!(
                "sample_rate must be in [{MIN_SAMPLE_RATE}, {MAX_SAMPLE_RATE}], got {}",
                self.sample_rate
            ));
        }
        self.transcription.validate()?;
        self.insights.validate()?;
        Ok(())
    }
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    /// Bearer token used to authenticate against the transcription service.
    pub api_key: String,

    /// Base endpoint the transcription request is POSTed to.
    pub endpoint: String,

    /// Model name sent as the `model` multipart field.
    pub model: String,

    /// Sampling temperature sent as the `temperature` multipart field.
    pub temperature: f64,

    /// Per-request timeout in seconds. Default `60`.
    pub timeout_seconds: u64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            model: "whisper-1".to_string(),
            temperature: 0.0,
            timeout_seconds: DEFAULT_TRANSCRIPTION_TIMEOUT_SECONDS,
        }
    }
}

impl TranscriptionConfig {
    fn validate(&self) -> Result<(), String> {
        if self.timeout_seconds == 0 {
            return Err("transcription.timeout_seconds must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Insights extraction service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightsConfig {
    /// Bearer token used to authenticate against the insights service.
    pub api_key: String,

    /// Base endpoint the chat-completion request is POSTed to.
    pub endpoint: String,

    /// Model used for incremental and final passes unless overridden.
    pub default_model: String,

    /// Optional model override dedicated to summary generation.
    pub summary_model: Option<String>,

    /// Optional model override dedicated to location extraction.
    pub location_model: Option<String>,

    /// Configured timeout in seconds; the effective timeout is
    /// `max(timeout_seconds, MIN_INSIGHTS_TIMEOUT_SECONDS)`.
    pub timeout_seconds: u64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: String::new(),
            default_model: "gpt-4o-mini".to_string(),
            summary_model: None,
            location_model: None,
            timeout_seconds: MIN_INSIGHTS_TIMEOUT_SECONDS,
        }
    }
}

impl InsightsConfig {
    /// The effective request timeout, floored at
    /// [`MIN_INSIGHTS_TIMEOUT_SECONDS`] regardless of configuration.
    #[must_use]
    pub fn effective_timeout_seconds(&self) -> u64 {
        self.timeout_seconds.max(MIN_INSIGHTS_TIMEOUT_SECONDS)
    }

    fn validate(&self) -> Result<(), String> {
        if self.default_model.trim().is_empty() {
            return Err("insights.default_model must not be empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        Config::default().validate().expect("default config must validate");
    }

    #[test]
    fn threshold_bytes_matches_spec_example() {
        let config = Config {
            audio_buffer_seconds: 4.0,
            sample_rate: 8_000,
            ..Default::default()
        };
        assert_eq!(config.threshold_bytes(), 32_000);
    }

    #[test]
    fn rejects_out_of_range_audio_buffer_seconds() {
        let config = Config {
            audio_buffer_seconds: 20.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_silence_threshold() {
        let config = Config {
            silence_threshold: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn insights_timeout_is_floored_at_90_seconds() {
        let config = InsightsConfig {
            timeout_seconds: 5,
            ..Default::default()
        };
        assert_eq!(config.effective_timeout_seconds(), 90);
    }
}
