//! Server configuration.
//!
//! Supports loading from YAML files with environment variable overrides,
//! mirroring `telecall_core::Config`'s own fields but adding the
//! server-only settings (bind address) that the library crate has no
//! business knowing about.

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Server configuration loaded from YAML with environment overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the HTTP/WebSocket listener to.
    /// Override: `TELECALL_BIND_ADDR`
    pub bind_addr: IpAddr,

    /// Port to bind the HTTP/WebSocket listener to.
    /// Override: `TELECALL_BIND_PORT`
    pub bind_port: u16,

    /// Seconds of buffered audio before a flush is triggered.
    pub audio_buffer_seconds: f64,

    /// Fraction of silent samples required to classify a chunk as silent.
    pub silence_threshold: f64,

    /// Sample rate (Hz) used for the decoded PCM16/WAV output.
    pub sample_rate: u32,

    /// Base URL this server is reachable at, used to derive the
    /// carrier-facing media stream URL.
    /// Override: `TELECALL_WEBHOOK_BASE_URL`
    pub webhook_base_url: Option<String>,

    /// Transcription service settings.
    pub transcription: TranscriptionSection,

    /// Insights extraction service settings.
    pub insights: InsightsSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranscriptionSection {
    /// Override: `TELECALL_TRANSCRIPTION_API_KEY`
    pub api_key: String,
    pub endpoint: String,
    pub model: String,
    pub temperature: f64,
    pub timeout_seconds: u64,
}

impl Default for TranscriptionSection {
    fn default() -> Self {
        let core = telecall_core::TranscriptionConfig::default();
        Self {
            api_key: core.api_key,
            endpoint: core.endpoint,
            model: core.model,
            temperature: core.temperature,
            timeout_seconds: core.timeout_seconds,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InsightsSection {
    /// Override: `TELECALL_INSIGHTS_API_KEY`
    pub api_key: String,
    pub endpoint: String,
    pub default_model: String,
    pub summary_model: Option<String>,
    pub location_model: Option<String>,
    pub timeout_seconds: u64,
}

impl Default for InsightsSection {
    fn default() -> Self {
        let core = telecall_core::InsightsConfig::default();
        Self {
            api_key: core.api_key,
            endpoint: core.endpoint,
            default_model: core.default_model,
            summary_model: core.summary_model,
            location_model: core.location_model,
            timeout_seconds: core.timeout_seconds,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            bind_port: 8080,
            audio_buffer_seconds: 4.0,
            silence_threshold: 0.9,
            sample_rate: 8_000,
            webhook_base_url: None,
            transcription: TranscriptionSection::default(),
            insights: InsightsSection::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("TELECALL_BIND_ADDR") {
            if let Ok(addr) = val.parse() {
                self.bind_addr = addr;
            }
        }

        if let Ok(val) = std::env::var("TELECALL_BIND_PORT") {
            if let Ok(port) = val.parse() {
                self.bind_port = port;
            }
        }

        if let Ok(val) = std::env::var("TELECALL_WEBHOOK_BASE_URL") {
            self.webhook_base_url = Some(val);
        }

        if let Ok(val) = std::env::var("TELECALL_TRANSCRIPTION_API_KEY") {
            self.transcription.api_key = val;
        }

        if let Ok(val) = std::env::var("TELECALL_INSIGHTS_API_KEY") {
            self.insights.api_key = val;
        }
    }

    /// Converts to telecall-core's `Config` type.
    pub fn to_core_config(&self) -> telecall_core::Config {
        telecall_core::Config {
            audio_buffer_seconds: self.audio_buffer_seconds,
            silence_threshold: self.silence_threshold,
            sample_rate: self.sample_rate,
            webhook_base_url: self.webhook_base_url.clone(),
            transcription: telecall_core::TranscriptionConfig {
                api_key: self.transcription.api_key.clone(),
                endpoint: self.transcription.endpoint.clone(),
                model: self.transcription.model.clone(),
                temperature: self.transcription.temperature,
                timeout_seconds: self.transcription.timeout_seconds,
            },
            insights: telecall_core::InsightsConfig {
                api_key: self.insights.api_key.clone(),
                endpoint: self.insights.endpoint.clone(),
                default_model: self.insights.default_model.clone(),
                summary_model: self.insights.summary_model.clone(),
                location_model: self.insights.location_model.clone(),
                timeout_seconds: self.insights.timeout_seconds,
            },
        }
    }
}
