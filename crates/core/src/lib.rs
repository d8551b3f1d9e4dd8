//! Tickerscope Core - cache-first price fetching.
//!
//! This crate owns the fetch orchestration and the storage contract. It is
//! database-agnostic: [`prices::PriceStore`] is implemented by the
//! `storage-sqlite` crate.

pub mod errors;
pub mod prices;

pub use tickerscope_market_data as market_data;

pub use errors::{DatabaseError, Error, Result};
pub use prices::{
    AggregateResult, CacheSummary, CompletenessPolicy, FailureKind, FetchFailure, FetchResult,
    FetcherConfig, PriceFetcher, PriceStore, PriceTable,
};
