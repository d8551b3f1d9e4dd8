//! Domain models for price fetching results and cache state.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::market_data::{DateRange, MarketDataError, PriceBar};

// =============================================================================
// Per-symbol outcome
// =============================================================================

/// Why a symbol produced no data in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Retries exhausted while the API kept answering with a rate-limit note.
    RateLimited,
    /// The API rejected the request outright.
    HardApiError,
    /// The payload could not be mapped onto price bars.
    Normalization,
    /// Network problems persisted through every attempt.
    Transport,
    /// The request for this symbol could not be built.
    InvalidRequest,
    /// The cache could not be read or written.
    Storage,
    /// The batch deadline passed before this symbol finished.
    DeadlineExceeded,
}

impl FailureKind {
    /// Whether running the same batch later might succeed for this symbol.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::Transport | Self::Storage | Self::DeadlineExceeded
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::RateLimited => "rate limited",
            Self::HardApiError => "API error",
            Self::Normalization => "malformed payload",
            Self::Transport => "transport error",
            Self::InvalidRequest => "invalid request",
            Self::Storage => "storage error",
            Self::DeadlineExceeded => "deadline exceeded",
        };
        f.write_str(s)
    }
}

impl From<&MarketDataError> for FailureKind {
    fn from(error: &MarketDataError) -> Self {
        match error {
            MarketDataError::RateLimited { .. } => Self::RateLimited,
            MarketDataError::HardApiError { .. } => Self::HardApiError,
            MarketDataError::Normalization { .. } => Self::Normalization,
            MarketDataError::Transport { .. } => Self::Transport,
            MarketDataError::InvalidRequest(_) => Self::InvalidRequest,
        }
    }
}

/// A recorded per-symbol failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub symbol: String,
    pub kind: FailureKind,
    /// Underlying cause, as reported by the failing component.
    pub message: String,
}

impl FetchFailure {
    pub fn new(symbol: &str, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            symbol: symbol.to_string(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_market_data(symbol: &str, error: &MarketDataError) -> Self {
        Self::new(symbol, FailureKind::from(error), error.to_string())
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.symbol, self.kind, self.message)
    }
}

/// Outcome for one symbol: its bars within the requested range, or why not.
pub type FetchResult = std::result::Result<Vec<PriceBar>, FetchFailure>;

// =============================================================================
// Batch result
// =============================================================================

/// Per-symbol outcomes of a batch, in request order.
///
/// Owned entirely by the caller once returned.
#[derive(Debug, Clone, Default)]
pub struct AggregateResult {
    range: Option<DateRange>,
    results: Vec<(String, FetchResult)>,
}

impl AggregateResult {
    pub fn new(range: DateRange) -> Self {
        Self {
            range: Some(range),
            results: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, symbol: String, result: FetchResult) {
        self.results.push((symbol, result));
    }

    /// The range the batch was requested for.
    pub fn range(&self) -> Option<DateRange> {
        self.range
    }

    /// All outcomes in request order.
    pub fn results(&self) -> &[(String, FetchResult)] {
        &self.results
    }

    pub fn get(&self, symbol: &str) -> Option<&FetchResult> {
        self.results
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, r)| r)
    }

    /// Bars for `symbol` if it succeeded.
    pub fn success(&self, symbol: &str) -> Option<&[PriceBar]> {
        match self.get(symbol)? {
            Ok(bars) => Some(bars.as_slice()),
            Err(_) => None,
        }
    }

    /// Failure for `symbol` if it failed.
    pub fn failure(&self, symbol: &str) -> Option<&FetchFailure> {
        self.get(symbol)?.as_ref().err()
    }

    pub fn successes(&self) -> impl Iterator<Item = (&str, &[PriceBar])> {
        self.results.iter().filter_map(|(symbol, result)| {
            result
                .as_ref()
                .ok()
                .map(|bars| (symbol.as_str(), bars.as_slice()))
        })
    }

    pub fn failures(&self) -> impl Iterator<Item = &FetchFailure> {
        self.results.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_partial(&self) -> bool {
        self.success_count() > 0 && self.failure_count() > 0
    }

    /// Successful bars of every symbol as one table.
    pub fn combined(&self) -> PriceTable {
        PriceTable::from_rows(
            self.successes()
                .flat_map(|(_, bars)| bars.iter().cloned())
                .collect(),
        )
    }

    pub(crate) fn into_failures(self) -> Vec<FetchFailure> {
        self.results
            .into_iter()
            .filter_map(|(_, r)| r.err())
            .collect()
    }

    /// Short human-readable summary.
    pub fn summary(&self) -> String {
        let rows: usize = self.successes().map(|(_, bars)| bars.len()).sum();
        format!(
            "{} symbol(s) succeeded ({} rows), {} failed",
            self.success_count(),
            rows,
            self.failure_count()
        )
    }
}

/// Rows keyed by `(symbol, date)`, sorted by symbol then date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PriceTable {
    rows: Vec<PriceBar>,
}

impl PriceTable {
    pub fn from_rows(mut rows: Vec<PriceBar>) -> Self {
        rows.sort_by(|a, b| a.symbol.cmp(&b.symbol).then(a.date.cmp(&b.date)));
        Self { rows }
    }

    pub fn rows(&self) -> &[PriceBar] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct symbols in table order.
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.rows.iter().map(|r| r.symbol.as_str()).collect();
        symbols.dedup();
        symbols
    }

    pub fn into_rows(self) -> Vec<PriceBar> {
        self.rows
    }
}

// =============================================================================
// Cache state
// =============================================================================

/// What the cache holds for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSummary {
    pub symbol: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub rows: usize,
}

/// Which dates must be cached before a range counts as complete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletenessPolicy {
    /// Every calendar day. Ranges spanning weekends or holidays are never
    /// complete, so they are refetched on every request.
    #[default]
    CalendarDays,
    /// Monday to Friday only. Holidays still count as missing. A range
    /// without any weekday expects every calendar day instead.
    Weekdays,
}

impl CompletenessPolicy {
    /// Dates that must be cached for `range` to count as complete. Never
    /// empty, since a range holds at least one day.
    pub fn expected_dates(&self, range: &DateRange) -> Vec<NaiveDate> {
        match self {
            Self::CalendarDays => range.days().collect(),
            Self::Weekdays => {
                let weekdays: Vec<NaiveDate> = range.weekdays().collect();
                if weekdays.is_empty() {
                    range.days().collect()
                } else {
                    weekdays
                }
            }
        }
    }
}
