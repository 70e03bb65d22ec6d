//! Canonical data model shared by all providers.
//!
//! Adapters return provider-native payloads; everything downstream of the
//! normalizer speaks only the types defined here.

mod financials;
mod news;
mod price;
mod record;
mod symbol;

pub use financials::{FinancialStatement, RawFinancials};
pub use news::{NewsArticle, NewsArticleRef};
pub use price::{PriceBar, PriceSeries};
pub use record::{CacheKey, NormalizedRecord};
pub use symbol::{Market, Symbol};
