//! Tickerscope Market Data Crate
//!
//! Fetches daily OHLCV series from Alpha Vantage and turns them into
//! [`PriceBar`] rows.
//!
//! # Architecture
//!
//! ```text
//! +------------------+
//! |  ticker string   |  "AAPL", "BTC-USD", "GBP-EUR"
//! +------------------+
//!          |
//!          v
//! +------------------+
//! | SymbolClassifier |  (asset class + API parameters)
//! +------------------+
//!          |
//!          v
//! +--------------------+
//! | AlphaVantageClient |  (retries, rate-limit backoff)
//! +--------------------+
//!          |
//!          v
//! +------------------+
//! |    normalize     |  (raw payload -> PriceBar)
//! +------------------+
//! ```
//!
//! Problems worth surfacing to a user are reported through a
//! [`NotificationSink`] rather than only logged.
//!
//! The `test-util` feature exposes `MockTransport` and
//! `CollectingNotificationSink` for downstream tests.

pub mod errors;
pub mod models;
pub mod notifications;
pub mod provider;
pub mod resolver;

pub use errors::{MarketDataError, RetryClass};
pub use models::{AssetClass, ClassifiedSymbol, DateRange, PriceBar, SeriesFunction};
#[cfg(any(test, feature = "test-util"))]
pub use notifications::CollectingNotificationSink;
pub use notifications::{
    LogNotificationSink, NoOpNotificationSink, Notification, NotificationSink, Severity,
};
pub use provider::alpha_vantage::normalize;
#[cfg(any(test, feature = "test-util"))]
pub use provider::MockTransport;
pub use provider::{
    AlphaVantageClient, FetchClientConfig, HttpTransport, RawPayload, ReqwestTransport,
};
pub use resolver::{classify, SymbolClassifier};
