//! Response models for the Yahoo Finance JSON endpoints we call directly.

use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Search endpoint (news listing)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct YahooSearchResponse {
    #[serde(default)]
    pub news: Vec<YahooNewsItem>,
}

#[derive(Debug, Deserialize)]
pub struct YahooNewsItem {
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub link: Option<String>,

    #[serde(default)]
    pub publisher: Option<String>,

    /// Unix seconds.
    #[serde(default, rename = "providerPublishTime")]
    pub provider_publish_time: Option<i64>,
}

// ============================================================================
// quoteSummary endpoint (financial statements)
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    pub quote_summary: YahooQuoteSummary,
}

#[derive(Debug, Deserialize)]
pub struct YahooQuoteSummary {
    #[serde(default)]
    pub result: Vec<Value>,
}
