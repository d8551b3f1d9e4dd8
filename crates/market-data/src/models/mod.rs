//! Market data models
//!
//! - `price_bar` - Canonical daily OHLCV row (PriceBar)
//! - `date_range` - Inclusive calendar range (DateRange)
//! - `instrument` - Asset class, series function and classified symbol

mod date_range;
mod instrument;
mod price_bar;

pub use date_range::DateRange;
pub use instrument::{AssetClass, ClassifiedSymbol, SeriesFunction};
pub use price_bar::PriceBar;
