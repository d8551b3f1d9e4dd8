//! Cached daily prices.
//!
//! - [`model`] - Batch results, failures, combined table and cache summaries
//! - [`store`] - Storage trait for the `(symbol, date)` price cache
//! - [`fetcher`] - Cache-first orchestration over the market data client
//!
//! ```text
//! PriceFetcher → AlphaVantageClient → market-data crate
//!       ↓
//! PriceStore (DB)
//! ```

pub mod fetcher;
pub mod model;
pub mod store;

#[cfg(test)]
mod fetcher_tests;

pub use fetcher::{FetcherConfig, PriceFetcher};
pub use model::{
    AggregateResult, CacheSummary, CompletenessPolicy, FailureKind, FetchFailure, FetchResult,
    PriceTable,
};
pub use store::{ensure_single_symbol, PriceStore};
