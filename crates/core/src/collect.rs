//! Collection orchestrator.
//!
//! Drives one collection run against one adapter: cache check, listing,
//! paced per-item fetches with retry, normalization, one batch write,
//! terminal event. Failure handling follows the fetch classification:
//! format errors surface immediately, transient errors retry then tally,
//! a permanent listing failure aborts the run, permanent per-item
//! failures are tallied and the run continues.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use log::{info, warn};
use serde_json::json;

use stockscope_market_data::{
    FetchClass, FetchError, NormalizedRecord, PriceSeries, Symbol, normalize,
    provider::SourceAdapter,
};
use stockscope_store::CacheStore;

use crate::errors::CoreError;
use crate::events::{ProgressEvent, ProgressSink};
use crate::flight::FlightGuard;
use crate::pacer::Pacer;

/// Retries after the first attempt, for transient failures only.
const MAX_RETRIES: u32 = 2;

/// First backoff; doubles per retry.
const INITIAL_BACKOFF: Duration = Duration::from_millis(250);

/// Orchestrates collection runs for one adapter.
///
/// Full runs hold the single-flight permit for their cache key across
/// the cache check, fetch and write, so identical concurrent runs
/// serialize and the later one is served from the cache.
pub struct Collector {
    adapter: Arc<dyn SourceAdapter>,
    store: CacheStore,
    flight: FlightGuard,
}

impl Collector {
    pub fn new(adapter: Arc<dyn SourceAdapter>, store: CacheStore, flight: FlightGuard) -> Self {
        Self {
            adapter,
            store,
            flight,
        }
    }

    pub fn adapter(&self) -> &Arc<dyn SourceAdapter> {
        &self.adapter
    }

    // ========================================================================
    // Full runs (cache check + gather + save + terminal event)
    // ========================================================================

    /// Run a price collection. Emits progress and exactly one terminal
    /// event unless the consumer cancels.
    pub async fn run_prices(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
        sink: &ProgressSink,
    ) {
        let key = stockscope_market_data::CacheKey::prices(self.adapter.id(), symbol, start, end);
        let _permit = self.flight.acquire(&key).await;

        if !force {
            match self.store.get(&key).await {
                Ok(Some(record)) => {
                    sink.finish(ProgressEvent::result(
                        json!({"saved": record.len(), "from_cache": true}),
                    ))
                    .await;
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    sink.finish(ProgressEvent::error(format!("Cache read failed: {}", e)))
                        .await;
                    return;
                }
            }
        }

        let series = match self.gather_prices(symbol, start, end, sink).await {
            Ok(series) => series,
            Err(CoreError::Cancelled) => return,
            Err(e) => {
                sink.finish(ProgressEvent::error(format!("Price fetch failed: {}", e)))
                    .await;
                return;
            }
        };

        let saved = series.bars.len();
        if self
            .save(&key, NormalizedRecord::Prices(series), sink)
            .await
            .is_err()
        {
            return;
        }
        sink.finish(ProgressEvent::result(json!({"saved": saved}))).await;
    }

    /// Run a news collection: listing, paced per-article body fetches,
    /// one batch write.
    pub async fn run_news(
        &self,
        symbol: &Symbol,
        period_days: u32,
        limit: usize,
        force: bool,
        sink: &ProgressSink,
    ) {
        let key = stockscope_market_data::CacheKey::news(self.adapter.id(), symbol, period_days);
        let _permit = self.flight.acquire(&key).await;

        if !force {
            match self.store.get(&key).await {
                Ok(Some(record)) => {
                    sink.finish(ProgressEvent::result(
                        json!({"saved": record.len(), "from_cache": true}),
                    ))
                    .await;
                    return;
                }
                Ok(None) => {}
                Err(e) => {
                    sink.finish(ProgressEvent::error(format!("Cache read failed: {}", e)))
                        .await;
                    return;
                }
            }
        }

        let (articles, failed) = match self.gather_news(symbol, limit, sink).await {
            Ok(outcome) => outcome,
            Err(CoreError::Cancelled) => return,
            Err(e) => {
                sink.finish(ProgressEvent::error(format!("News listing failed: {}", e)))
                    .await;
                return;
            }
        };

        let saved = articles.len();
        if self
            .save(&key, NormalizedRecord::News(articles), sink)
            .await
            .is_err()
        {
            return;
        }
        sink.finish(ProgressEvent::result(json!({"saved": saved, "failed": failed})))
            .await;
    }

    // ========================================================================
    // Gather phases (shared with the processing pipeline)
    // ========================================================================

    /// Fetch and normalize a price series, emitting fetch progress.
    pub(crate) async fn gather_prices(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        sink: &ProgressSink,
    ) -> Result<PriceSeries, CoreError> {
        if sink.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        sink.emit(ProgressEvent::step("fetch", 0, 1));
        let bars = retry_transient(|| self.adapter.fetch_price_history(symbol, start, end)).await?;
        sink.emit(ProgressEvent::step("fetch", 1, 1));

        info!(
            "Fetched {} price bars for {} from {}",
            bars.len(),
            symbol.code(),
            self.adapter.id()
        );
        Ok(normalize::price_series(self.adapter.id(), symbol.code(), bars))
    }

    /// List articles and fetch their bodies. Returns the normalized batch
    /// and how many items failed.
    pub(crate) async fn gather_news(
        &self,
        symbol: &Symbol,
        limit: usize,
        sink: &ProgressSink,
    ) -> Result<(Vec<stockscope_market_data::NewsArticle>, usize), CoreError> {
        if sink.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        sink.emit(ProgressEvent::status("listing", "start"));
        let refs = retry_transient(|| self.adapter.list_news(symbol, limit)).await?;
        let total = refs.len();
        sink.emit(ProgressEvent::step("listing", total, total));

        let mut pacer = Pacer::new(self.adapter.rate_limit().min_delay);
        let mut kept = Vec::with_capacity(total);
        let mut bodies = Vec::with_capacity(total);
        let mut failed = 0usize;

        for (i, article) in refs.into_iter().enumerate() {
            if sink.is_cancelled() {
                return Err(CoreError::Cancelled);
            }
            pacer.wait().await;
            sink.emit(ProgressEvent::step("scraping", i + 1, total));

            match retry_transient(|| self.adapter.fetch_article_body(&article)).await {
                Ok(body) => {
                    kept.push(article);
                    bodies.push(body);
                }
                Err(e) => {
                    warn!("Dropping article '{}': {}", article.link, e);
                    failed += 1;
                }
            }
        }

        Ok((normalize::news_batch(kept, bodies), failed))
    }

    async fn save(
        &self,
        key: &stockscope_market_data::CacheKey,
        record: NormalizedRecord,
        sink: &ProgressSink,
    ) -> Result<(), ()> {
        sink.emit(ProgressEvent::status("saving", "saving to cache"));
        if let Err(e) = self.store.put(key, &record).await {
            sink.finish(ProgressEvent::error(format!("Cache write failed: {}", e)))
                .await;
            return Err(());
        }
        Ok(())
    }
}

/// Run `op`, retrying transient failures with doubling backoff. Format
/// and permanent failures return immediately.
async fn retry_transient<T, F, Fut>(mut op: F) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.class() == FetchClass::Transient && attempt < MAX_RETRIES => {
                attempt += 1;
                warn!("Transient failure (attempt {}): {}", attempt, e);
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> FetchError {
        FetchError::Timeout {
            provider: "mock".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_retry_then_succeed() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(transient())
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(transient())
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1 + MAX_RETRIES);
    }

    #[tokio::test]
    async fn permanent_failures_never_retry() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(FetchError::SymbolNotFound {
                symbol: "NOPE".to_string(),
                provider: "mock".to_string(),
            })
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
