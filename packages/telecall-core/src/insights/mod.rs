//! The insights extraction adapter.

pub mod http_client;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

pub use http_client::HttpInsightsExtractor;

/// A candidate summary produced by one insights pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryInsight {
    pub summary: String,
    pub key_findings: Vec<String>,
    pub generated_at_utc: DateTime<Utc>,
}

/// A candidate location produced by one insights pass. Only constructed
/// when a formatted address and both coordinates are present.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationInsight {
    pub raw_text: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub formatted_address: String,
    pub confidence: f64,
}

/// The combined result of one insights pass. Either field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsightsResult {
    pub summary: Option<SummaryInsight>,
    pub location: Option<LocationInsight>,
}

/// Capability to extract structured insights from an accumulated
/// transcript. Implementations never raise to the caller — every failure
/// is logged and represented as `None`.
#[async_trait]
pub trait InsightsExtractor: Send + Sync {
    /// Extracts insights from `transcript` for `call_id`. An empty or
    /// whitespace-only transcript returns `None` without a remote call.
    ///
    /// `ctx` is the per-operation cancellation token; cancelling it aborts
    /// the outbound HTTP call rather than waiting out its (long) timeout.
    async fn extract(
        &self,
        call_id: &str,
        transcript: &str,
        ctx: &CancellationToken,
    ) -> Option<InsightsResult>;
}
