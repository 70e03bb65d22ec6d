//! Adapter capabilities and pacing configuration.

use std::time::Duration;

/// Describes what a source adapter can do.
///
/// Used by callers to route record kinds to an eligible adapter instead of
/// probing with requests that would fail.
#[derive(Clone, Debug)]
pub struct AdapterCapabilities {
    /// Daily price history fetching.
    pub price_history: bool,

    /// News listing and per-article body fetching.
    pub news: bool,

    /// Financial statement fetching.
    pub financials: bool,
}

/// Pacing configuration for a provider.
///
/// The adapter declares its limits; enforcement between per-item fetches
/// lives in the collection orchestrator.
#[derive(Clone, Debug)]
pub struct RateLimit {
    /// Maximum requests allowed per minute.
    pub requests_per_minute: u32,

    /// Minimum interval between consecutive per-item fetches.
    pub min_delay: Duration,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            min_delay: Duration::from_millis(200),
        }
    }
}
