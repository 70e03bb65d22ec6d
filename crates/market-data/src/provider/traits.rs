//! Source adapter trait definition.
//!
//! This module defines the core `SourceAdapter` trait that all external
//! data sources implement.

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::FetchError;
use crate::models::{Market, NewsArticleRef, PriceBar, RawFinancials, Symbol};

use super::capabilities::{AdapterCapabilities, RateLimit};

/// Trait for external data sources.
///
/// Implement this trait to add support for a new provider; shared code
/// never branches on provider identity. Adapters perform network I/O only:
/// no caching, no retry, no pacing - those policies live in the collection
/// orchestrator. Every network call made by an adapter must carry a
/// request timeout.
///
/// Operations an adapter does not support return
/// [`FetchError::NotSupported`] via the default implementations.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Unique identifier for this adapter, also the `source` segment of
    /// request paths and cache keys (e.g., "yahoo", "naver").
    fn id(&self) -> &'static str;

    /// The market convention this adapter binds to. A symbol from another
    /// market is a caller error ([`FetchError::InvalidSymbol`]).
    fn market(&self) -> Market;

    /// Describes what this adapter can do.
    fn capabilities(&self) -> AdapterCapabilities;

    /// Pacing limits the orchestrator enforces between per-item fetches.
    fn rate_limit(&self) -> RateLimit {
        RateLimit::default()
    }

    /// Check a symbol against this adapter's market convention.
    fn check_symbol(&self, symbol: &Symbol) -> Result<(), FetchError> {
        if symbol.market() == self.market() {
            Ok(())
        } else {
            Err(FetchError::InvalidSymbol(symbol.code().to_string()))
        }
    }

    /// Fetch daily price bars for the date range (inclusive).
    ///
    /// Returns provider-native bars; ordering and deduplication are the
    /// normalizer's job.
    async fn fetch_price_history(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, FetchError> {
        let _ = (symbol, start, end);
        Err(FetchError::NotSupported {
            operation: "price_history".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Current market capitalization in the listing currency.
    ///
    /// `Ok(None)` when the provider has no figure; callers treat that as
    /// an absent value, not an error.
    async fn fetch_market_cap(&self, symbol: &Symbol) -> Result<Option<Decimal>, FetchError> {
        let _ = symbol;
        Ok(None)
    }

    /// List recent news articles for the symbol, newest first, at most
    /// `limit` items.
    async fn list_news(
        &self,
        symbol: &Symbol,
        limit: usize,
    ) -> Result<Vec<NewsArticleRef>, FetchError> {
        let _ = (symbol, limit);
        Err(FetchError::NotSupported {
            operation: "list_news".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch the body text for one listed article.
    ///
    /// `Ok(None)` means the page was reachable but had no extractable
    /// text; the item still counts as collected with a null body.
    async fn fetch_article_body(
        &self,
        article: &NewsArticleRef,
    ) -> Result<Option<String>, FetchError> {
        let _ = article;
        Err(FetchError::NotSupported {
            operation: "article_body".to_string(),
            provider: self.id().to_string(),
        })
    }

    /// Fetch financial statements for the symbol.
    async fn fetch_financials(&self, symbol: &Symbol) -> Result<RawFinancials, FetchError> {
        let _ = symbol;
        Err(FetchError::NotSupported {
            operation: "financials".to_string(),
            provider: self.id().to_string(),
        })
    }
}
