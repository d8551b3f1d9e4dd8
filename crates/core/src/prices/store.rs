//! Price cache storage trait.
//!
//! The cache is a `(symbol, date)` keyed table of daily bars that only ever
//! grows. Implementations handle the actual database operations.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeSet;

use super::model::{CacheSummary, CompletenessPolicy};
use crate::errors::{Error, Result};
use crate::market_data::{DateRange, PriceBar};

/// Storage interface for cached price bars.
///
/// Reads are synchronous and served from pooled connections; writes are
/// async so implementations can funnel them through a single writer.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Dates inside `range` that have a stored row for `symbol`.
    fn cached_dates(&self, symbol: &str, range: &DateRange) -> Result<BTreeSet<NaiveDate>>;

    /// True iff every calendar date of `range` has a stored row.
    ///
    /// Weekends and holidays have no trading data, so any range spanning one
    /// is reported incomplete.
    fn has_complete_range(&self, symbol: &str, range: &DateRange) -> Result<bool> {
        self.has_complete_range_with(symbol, range, CompletenessPolicy::CalendarDays)
    }

    /// Completeness check against the dates `policy` expects.
    fn has_complete_range_with(
        &self,
        symbol: &str,
        range: &DateRange,
        policy: CompletenessPolicy,
    ) -> Result<bool> {
        let cached = self.cached_dates(symbol, range)?;
        Ok(policy
            .expected_dates(range)
            .iter()
            .all(|date| cached.contains(date)))
    }

    /// Rows for `symbol` within `range`, ordered by date ascending.
    fn read_range(&self, symbol: &str, range: &DateRange) -> Result<Vec<PriceBar>>;

    /// Insert or replace `bars` for `symbol` as one atomic batch.
    ///
    /// Returns the number of rows written. Writing the same batch twice
    /// leaves the store unchanged.
    async fn upsert(&self, symbol: &str, bars: &[PriceBar]) -> Result<usize>;

    /// Per-symbol overview of the cache, ordered by symbol.
    fn summaries(&self) -> Result<Vec<CacheSummary>>;
}

/// Rejects batches containing bars of another symbol.
pub fn ensure_single_symbol(symbol: &str, bars: &[PriceBar]) -> Result<()> {
    match bars.iter().find(|bar| bar.symbol != symbol) {
        Some(bar) => Err(Error::InvalidInput(format!(
            "batch for {} contains a bar for {} on {}",
            symbol, bar.symbol, bar.date
        ))),
        None => Ok(()),
    }
}
