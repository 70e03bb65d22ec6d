use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One trading day of price/volume data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Trading date.
    pub date: NaiveDate,

    /// Closing price.
    pub price: Decimal,

    /// Trading volume.
    pub volume: u64,
}

/// Daily price history for one symbol from one source.
///
/// Invariant (enforced by the normalizer): bars are ascending by date with
/// at most one bar per date.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    /// Instrument code the series belongs to.
    pub symbol: String,

    /// Adapter id the series came from (e.g., "yahoo", "naver").
    pub source: String,

    /// Ordered daily bars.
    pub bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Most recent bar, if any.
    pub fn latest(&self) -> Option<&PriceBar> {
        self.bars.last()
    }

    /// Bar before the most recent one, used for day-over-day changes.
    pub fn previous(&self) -> Option<&PriceBar> {
        self.bars.len().checked_sub(2).and_then(|i| self.bars.get(i))
    }
}
