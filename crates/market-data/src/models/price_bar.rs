use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One daily OHLCV row for a symbol.
///
/// `(symbol, date)` is the identity of a bar; writing a bar with an existing
/// key replaces the previous row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
    /// Split/dividend adjusted close. Only the equity series provides it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_close: Option<f64>,
}

impl PriceBar {
    /// The `(symbol, date)` cache key of this bar.
    pub fn key(&self) -> (&str, NaiveDate) {
        (self.symbol.as_str(), self.date)
    }
}
