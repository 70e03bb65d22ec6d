//! Processing pipeline: ensure cached data, then hand it to the analysis
//! collaborator and emit the combined terminal event.
//!
//! A collaborator failure is terminal for the run but never discards the
//! cached data; a retry analyzes for free.

use std::sync::Arc;

use chrono::NaiveDate;
use log::warn;
use num_traits::ToPrimitive;
use serde_json::{Value, json};

use stockscope_analysis::{AnalysisService, AnalysisTask};
use stockscope_market_data::{
    CacheKey, FinancialStatement, NormalizedRecord, PriceSeries, Symbol,
    provider::SourceAdapter,
};
use stockscope_store::CacheStore;

use crate::collect::Collector;
use crate::errors::CoreError;
use crate::events::{ProgressEvent, ProgressSink};
use crate::flight::FlightGuard;
use crate::policy;

pub struct Pipeline {
    store: CacheStore,
    analysis: Arc<dyn AnalysisService>,
    flight: FlightGuard,
}

impl Pipeline {
    /// `flight` is the app-wide guard, shared with the collectors so
    /// collect and process runs for one key serialize with each other.
    pub fn new(store: CacheStore, analysis: Arc<dyn AnalysisService>, flight: FlightGuard) -> Self {
        Self {
            store,
            analysis,
            flight,
        }
    }

    /// Process a price request: cached-or-collected series, market
    /// summary payload, analysis, `final` event.
    pub async fn process_prices(
        &self,
        collector: &Collector,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
        force: bool,
        sink: &ProgressSink,
    ) {
        let key = CacheKey::prices(collector.adapter().id(), symbol, start, end);
        let _guard = self.flight.acquire(&key).await;

        let resolved = policy::resolve(&self.store, &key, force, || async {
            collector
                .gather_prices(symbol, start, end, sink)
                .await
                .map(NormalizedRecord::Prices)
        })
        .await;

        let record = match resolved {
            Ok((record, _)) => record,
            Err(CoreError::Cancelled) => return,
            Err(e) => {
                sink.finish(ProgressEvent::error(format!("Price data unavailable: {}", e)))
                    .await;
                return;
            }
        };

        let NormalizedRecord::Prices(series) = record else {
            sink.finish(ProgressEvent::error("Cached record has unexpected kind"))
                .await;
            return;
        };

        // Market cap is a live lookup, never cached with the series;
        // providers without one leave it null.
        let market_cap = match collector.adapter().fetch_market_cap(symbol).await {
            Ok(Some(cap)) => json!(cap.to_f64().unwrap_or(0.0)),
            Ok(None) => Value::Null,
            Err(e) => {
                warn!("Market cap lookup failed for {}: {}", symbol.code(), e);
                Value::Null
            }
        };

        let payload = market_summary(symbol, &series, market_cap);
        self.analyze_and_finish(AnalysisTask::Market, payload, sink).await;
    }

    /// Process a news request: cached-or-collected article batch,
    /// analysis, `final` event.
    pub async fn process_news(
        &self,
        collector: &Collector,
        symbol: &Symbol,
        period_days: u32,
        limit: usize,
        force: bool,
        sink: &ProgressSink,
    ) {
        let key = CacheKey::news(collector.adapter().id(), symbol, period_days);
        let _guard = self.flight.acquire(&key).await;

        let resolved = policy::resolve(&self.store, &key, force, || async {
            collector
                .gather_news(symbol, limit, sink)
                .await
                .map(|(articles, _)| NormalizedRecord::News(articles))
        })
        .await;

        let record = match resolved {
            Ok((record, _)) => record,
            Err(CoreError::Cancelled) => return,
            Err(e) => {
                sink.finish(ProgressEvent::error(format!("News data unavailable: {}", e)))
                    .await;
                return;
            }
        };

        let NormalizedRecord::News(articles) = record else {
            sink.finish(ProgressEvent::error("Cached record has unexpected kind"))
                .await;
            return;
        };
        let payload = json!(articles);
        self.analyze_and_finish(AnalysisTask::News, payload, sink).await;
    }

    /// Synchronous fundamentals path: no stream, single-flight plus
    /// cache-or-fetch, returns the statement directly.
    pub async fn fundamentals(
        &self,
        adapter: Arc<dyn SourceAdapter>,
        symbol: &Symbol,
        force: bool,
    ) -> Result<FinancialStatement, CoreError> {
        let key = CacheKey::fundamentals(adapter.id(), symbol);
        let _guard = self.flight.acquire(&key).await;

        let (record, _) = policy::resolve(&self.store, &key, force, || async {
            let raw = adapter.fetch_financials(symbol).await?;
            Ok(NormalizedRecord::Financials(
                stockscope_market_data::normalize::financials(raw),
            ))
        })
        .await?;

        match record {
            NormalizedRecord::Financials(statement) => Ok(statement),
            _ => Err(CoreError::KindMismatch {
                key: key.storage_key(),
            }),
        }
    }

    async fn analyze_and_finish(&self, task: AnalysisTask, payload: Value, sink: &ProgressSink) {
        sink.emit(ProgressEvent::status("analysis", "start"));
        match self.analysis.analyze(task, &payload).await {
            Ok(analysis) => {
                sink.finish(ProgressEvent::Final {
                    result: payload,
                    analysis,
                })
                .await;
            }
            Err(e) => {
                warn!("Analysis failed for {} task: {}", task.name(), e);
                sink.finish(ProgressEvent::error(format!("Analysis failed: {}", e)))
                    .await;
            }
        }
    }
}

/// Summarize a price series for analysis: latest close and volume with
/// day-over-day change percent, market cap, plus full histories.
fn market_summary(symbol: &Symbol, series: &PriceSeries, market_cap: Value) -> Value {
    let latest = series.latest();
    let previous = series.previous().or(latest);

    let (price, price_change) = match (latest, previous) {
        (Some(l), Some(p)) => (
            l.price.to_f64().unwrap_or(0.0),
            change_percent(l.price.to_f64().unwrap_or(0.0), p.price.to_f64().unwrap_or(0.0)),
        ),
        _ => (0.0, 0.0),
    };
    let (volume, volume_change) = match (latest, previous) {
        (Some(l), Some(p)) => (l.volume, change_percent(l.volume as f64, p.volume as f64)),
        _ => (0, 0.0),
    };

    json!({
        "name": symbol.code(),
        "source": series.source,
        "currentPrice": {"value": price, "changePercent": price_change},
        "volume": {"value": volume, "changePercent": volume_change},
        "marketCap": market_cap,
        "priceHistory": series.bars.iter().map(|b| {
            json!({"date": b.date.to_string(), "price": b.price.to_f64().unwrap_or(0.0)})
        }).collect::<Vec<_>>(),
        "volumeHistory": series.bars.iter().map(|b| {
            json!({"date": b.date.to_string(), "volume": b.volume})
        }).collect::<Vec<_>>(),
    })
}

fn change_percent(latest: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    ((latest - previous) / previous * 100.0 * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use stockscope_market_data::PriceBar;

    fn bar(day: u32, price: i64, volume: u64) -> PriceBar {
        PriceBar {
            date: chrono::NaiveDate::from_ymd_opt(2025, 8, day).unwrap(),
            price: Decimal::from(price),
            volume,
        }
    }

    #[test]
    fn summary_reports_day_over_day_change() {
        let symbol = Symbol::parse("005930").unwrap();
        let series = PriceSeries {
            symbol: "005930".to_string(),
            source: "naver".to_string(),
            bars: vec![bar(25, 100, 1000), bar(26, 110, 500)],
        };

        let summary = market_summary(&symbol, &series, Value::Null);
        assert_eq!(summary["currentPrice"]["value"], 110.0);
        assert_eq!(summary["currentPrice"]["changePercent"], 10.0);
        assert_eq!(summary["volume"]["value"], 500);
        assert_eq!(summary["volume"]["changePercent"], -50.0);
        assert_eq!(summary["priceHistory"].as_array().unwrap().len(), 2);
        assert!(summary["marketCap"].is_null());
    }

    #[test]
    fn market_cap_passes_through_when_available() {
        let symbol = Symbol::parse("005930").unwrap();
        let series = PriceSeries {
            symbol: "005930".to_string(),
            source: "naver".to_string(),
            bars: vec![bar(26, 100, 1000)],
        };

        let summary = market_summary(&symbol, &series, json!(412_263_900_000_000.0));
        assert_eq!(summary["marketCap"], 412_263_900_000_000.0);
    }

    #[test]
    fn single_bar_series_has_zero_change() {
        let symbol = Symbol::parse("005930").unwrap();
        let series = PriceSeries {
            symbol: "005930".to_string(),
            source: "naver".to_string(),
            bars: vec![bar(26, 100, 1000)],
        };

        let summary = market_summary(&symbol, &series, Value::Null);
        assert_eq!(summary["currentPrice"]["changePercent"], 0.0);
    }

    #[test]
    fn empty_series_summarizes_to_zeroes() {
        let symbol = Symbol::parse("005930").unwrap();
        let series = PriceSeries {
            symbol: "005930".to_string(),
            source: "naver".to_string(),
            bars: vec![],
        };

        let summary = market_summary(&symbol, &series, Value::Null);
        assert_eq!(summary["currentPrice"]["value"], 0.0);
        assert_eq!(summary["priceHistory"].as_array().unwrap().len(), 0);
    }
}
