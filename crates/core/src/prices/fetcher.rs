//! Cache-first fetch orchestration.
//!
//! # Architecture
//!
//! ```text
//! PriceFetcher
//!       │
//!       ├─► PriceStore (completeness check, range reads, upserts)
//!       ├─► SymbolClassifier (ticker → series function)
//!       ├─► AlphaVantageClient (retrying fetch + normalization)
//!       └─► NotificationSink (user-visible problems)
//! ```
//!
//! Symbols are processed one after another. The remote rate limit is shared
//! by every request, so running symbols concurrently would only hit it
//! sooner.

use log::{debug, error, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::time::Instant;

use super::model::{
    AggregateResult, CompletenessPolicy, FailureKind, FetchFailure, FetchResult,
};
use super::store::PriceStore;
use crate::errors::{Error, Result};
use crate::market_data::{
    AlphaVantageClient, DateRange, MarketDataError, Notification, NotificationSink, Severity,
    SymbolClassifier,
};

/// Settings for [`PriceFetcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FetcherConfig {
    pub completeness: CompletenessPolicy,
}

/// Serves daily bars for many symbols, from cache when complete and from
/// the API otherwise.
pub struct PriceFetcher {
    store: Arc<dyn PriceStore>,
    client: Arc<AlphaVantageClient>,
    classifier: SymbolClassifier,
    sink: Arc<dyn NotificationSink>,
    config: FetcherConfig,
}

impl PriceFetcher {
    pub fn new(
        store: Arc<dyn PriceStore>,
        client: Arc<AlphaVantageClient>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            store,
            client,
            classifier: SymbolClassifier::new(),
            sink,
            config: FetcherConfig::default(),
        }
    }

    pub fn with_classifier(mut self, classifier: SymbolClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_config(mut self, config: FetcherConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.config
    }

    /// Fetch `range` for every symbol.
    ///
    /// Per-symbol problems are recorded in the returned [`AggregateResult`];
    /// the call only fails with [`Error::NoDataAvailable`] when no symbol
    /// succeeded.
    pub async fn fetch_many<I, S>(&self, symbols: I, range: &DateRange) -> Result<AggregateResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(dedupe_symbols(symbols), range, None).await
    }

    /// Like [`fetch_many`](Self::fetch_many), bounded by `deadline`.
    ///
    /// When the deadline passes, the symbol in flight (even mid-backoff) and
    /// every symbol not yet started are recorded as
    /// [`FailureKind::DeadlineExceeded`].
    pub async fn fetch_many_until<I, S>(
        &self,
        symbols: I,
        range: &DateRange,
        deadline: Instant,
    ) -> Result<AggregateResult>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.run(dedupe_symbols(symbols), range, Some(deadline))
            .await
    }

    async fn run(
        &self,
        symbols: Vec<String>,
        range: &DateRange,
        deadline: Option<Instant>,
    ) -> Result<AggregateResult> {
        if symbols.is_empty() {
            self.sink.notify(Notification::new(
                Severity::Error,
                None,
                "no symbols requested",
            ));
            return Err(Error::NoDataAvailable { failures: vec![] });
        }

        info!("Fetching {} symbol(s) for {}", symbols.len(), range);
        let mut result = AggregateResult::new(*range);
        let mut pending = symbols.into_iter();

        while let Some(symbol) = pending.next() {
            let outcome = match deadline {
                None => self.fetch_one(&symbol, range).await,
                Some(deadline) if Instant::now() >= deadline => {
                    result.push(symbol.clone(), Err(self.deadline_failure(&symbol)));
                    break;
                }
                Some(deadline) => {
                    match tokio::time::timeout_at(deadline, self.fetch_one(&symbol, range)).await
                    {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            result.push(symbol.clone(), Err(self.deadline_failure(&symbol)));
                            break;
                        }
                    }
                }
            };
            result.push(symbol, outcome);
        }

        for symbol in pending {
            let failure = self.deadline_failure(&symbol);
            result.push(symbol, Err(failure));
        }

        if result.success_count() == 0 {
            let failures = result.into_failures();
            error!("No data available: all {} symbol(s) failed", failures.len());
            self.sink.notify(Notification::new(
                Severity::Error,
                None,
                format!("no data available for any of {} symbol(s)", failures.len()),
            ));
            return Err(Error::NoDataAvailable { failures });
        }

        info!("Batch finished: {}", result.summary());
        Ok(result)
    }

    /// One symbol: cache hit, or fetch → normalize → upsert → re-read.
    async fn fetch_one(&self, symbol: &str, range: &DateRange) -> FetchResult {
        match self
            .store
            .has_complete_range_with(symbol, range, self.config.completeness)
        {
            Ok(true) => {
                debug!("Cache hit for {} {}", symbol, range);
                return self
                    .store
                    .read_range(symbol, range)
                    .map_err(|e| self.storage_failure(symbol, e));
            }
            Ok(false) => debug!("Cache incomplete for {} {}", symbol, range),
            Err(e) => {
                warn!(
                    "Cache check failed for {}, fetching from API: {}",
                    symbol, e
                );
                self.sink.notify(Notification::warning(
                    symbol,
                    format!("cache check failed, fetching from API: {}", e),
                ));
            }
        }

        let classified = self.classifier.classify(symbol);
        debug!(
            "Classified {} as {} ({})",
            symbol,
            classified.asset_class,
            classified.function().as_api_str()
        );

        let bars = self
            .client
            .fetch_symbol(&classified)
            .await
            .map_err(|e| self.fetch_failure(symbol, e))?;

        let written = self
            .store
            .upsert(symbol, &bars)
            .await
            .map_err(|e| self.storage_failure(symbol, e))?;

        let rows = self
            .store
            .read_range(symbol, range)
            .map_err(|e| self.storage_failure(symbol, e))?;

        info!(
            "{}: cached {} bar(s), {} within {}",
            symbol,
            written,
            rows.len(),
            range
        );
        Ok(rows)
    }

    /// The client already reported API and transport problems; only the
    /// ones it does not report are surfaced here.
    fn fetch_failure(&self, symbol: &str, error: MarketDataError) -> FetchFailure {
        let failure = FetchFailure::from_market_data(symbol, &error);
        match failure.kind {
            FailureKind::Normalization | FailureKind::InvalidRequest => {
                error!("{}: {}", symbol, error);
                self.sink
                    .notify(Notification::error(symbol, error.to_string()));
            }
            _ => debug!("{}: fetch failed: {}", symbol, error),
        }
        failure
    }

    fn storage_failure(&self, symbol: &str, error: Error) -> FetchFailure {
        error!("{}: cache operation failed: {}", symbol, error);
        self.sink
            .notify(Notification::error(symbol, format!("cache error: {}", error)));
        FetchFailure::new(symbol, FailureKind::Storage, error.to_string())
    }

    fn deadline_failure(&self, symbol: &str) -> FetchFailure {
        warn!("{}: batch deadline exceeded", symbol);
        self.sink
            .notify(Notification::error(symbol, "batch deadline exceeded"));
        FetchFailure::new(
            symbol,
            FailureKind::DeadlineExceeded,
            "batch deadline exceeded",
        )
    }
}

/// Trim, drop blanks and de-duplicate, keeping first-seen order.
fn dedupe_symbols<I, S>(symbols: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    symbols
        .into_iter()
        .map(|s| s.as_ref().trim().to_string())
        .filter(|s| !s.is_empty() && seen.insert(s.clone()))
        .collect()
}
