use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::financials::FinancialStatement;
use super::news::NewsArticle;
use super::price::PriceSeries;
use super::symbol::Symbol;

/// Tagged union of all normalized record kinds.
///
/// This is the cache payload: downstream consumers are provider-agnostic
/// and only ever see this shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NormalizedRecord {
    Prices(PriceSeries),
    /// One collection batch of articles for a (source, symbol, period) key.
    News(Vec<NewsArticle>),
    Financials(FinancialStatement),
}

impl NormalizedRecord {
    /// Number of items the record carries, reported as `saved` in the
    /// terminal result of a collection run.
    pub fn len(&self) -> usize {
        match self {
            Self::Prices(series) => series.bars.len(),
            Self::News(articles) => articles.len(),
            Self::Financials(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Cache key: (provider, symbol, period-or-kind).
///
/// At most one cache entry exists per key; writers overwrite atomically
/// and last write wins.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub source: String,
    pub symbol: String,
    pub kind: String,
}

impl CacheKey {
    pub fn prices(source: &str, symbol: &Symbol, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            source: source.to_string(),
            symbol: symbol.code().to_string(),
            kind: format!("prices:{}:{}", start, end),
        }
    }

    pub fn news(source: &str, symbol: &Symbol, period_days: u32) -> Self {
        Self {
            source: source.to_string(),
            symbol: symbol.code().to_string(),
            kind: format!("news:{}", period_days),
        }
    }

    pub fn fundamentals(source: &str, symbol: &Symbol) -> Self {
        Self {
            source: source.to_string(),
            symbol: symbol.code().to_string(),
            kind: "fundamentals".to_string(),
        }
    }

    /// Stable primary-key form used by the store and the single-flight
    /// guard.
    pub fn storage_key(&self) -> String {
        format!("{}:{}:{}", self.source, self.symbol, self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Symbol;

    #[test]
    fn storage_key_is_stable() {
        let symbol = Symbol::parse("AAPL").unwrap();
        let start = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 8, 26).unwrap();
        let key = CacheKey::prices("yahoo", &symbol, start, end);
        assert_eq!(key.storage_key(), "yahoo:AAPL:prices:2026-07-27:2026-08-26");
    }

    #[test]
    fn identical_parameters_produce_identical_keys() {
        let symbol = Symbol::parse("005930").unwrap();
        let a = CacheKey::news("naver", &symbol, 7);
        let b = CacheKey::news("naver", &symbol, 7);
        assert_eq!(a, b);
        assert_ne!(a, CacheKey::news("naver", &symbol, 0));
    }
}
