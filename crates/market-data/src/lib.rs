//! Stockscope Market Data Crate
//!
//! Provider-agnostic acquisition of market data, news and financial
//! statements from heterogeneous external sources.
//!
//! # Overview
//!
//! Each external source is wrapped in a [`SourceAdapter`]: one capability
//! set, one implementation per provider. Adapters perform network I/O only
//! and return provider-native payloads; the [`normalize`] module maps those
//! payloads onto the single canonical schema shared by all providers.
//! Caching, retry policy and pacing live in higher layers.
//!
//! # Core Types
//!
//! - [`Symbol`] / [`Market`] - instrument code plus market convention
//! - [`PriceSeries`] - ordered daily close/volume bars
//! - [`NewsArticle`] - normalized article with optional scraped body
//! - [`FinancialStatement`] - ticker/country plus three statement trees
//! - [`NormalizedRecord`] - tagged union of the above, the cache payload
//! - [`FetchError`] - adapter failure taxonomy with retry classification

pub mod errors;
pub mod models;
pub mod normalize;
pub mod provider;

pub use models::{
    CacheKey, FinancialStatement, Market, NewsArticle, NewsArticleRef, NormalizedRecord, PriceBar,
    PriceSeries, RawFinancials, Symbol,
};

pub use errors::{FetchClass, FetchError};

pub use provider::fnguide::FnGuideAdapter;
pub use provider::naver::{NaverAdapter, NaverApiKeys};
pub use provider::yahoo::YahooAdapter;
pub use provider::{AdapterCapabilities, RateLimit, SourceAdapter};
