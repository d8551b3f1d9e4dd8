//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all market data operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while fetching or normalizing a daily series.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which determines how the fetch client handles the error.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// The API answered with a rate-limit note (HTTP 200, `Note`/`Information`
    /// key mentioning the premium tier). Transient.
    #[error("Rate limited while fetching {symbol} after {attempts} attempt(s): {message}")]
    RateLimited {
        symbol: String,
        attempts: u32,
        message: String,
    },

    /// The API answered with an `Error Message` key. Permanent for this symbol.
    #[error("API error for {symbol}: {message}")]
    HardApiError { symbol: String, message: String },

    /// The payload had no recognizable series or a value could not be coerced.
    #[error("Malformed payload for {symbol}: {message}")]
    Normalization { symbol: String, message: String },

    /// Connection failure, timeout or non-success HTTP status.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The request could not be built (bad URL, inverted date range...).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// # Examples
    ///
    /// ```
    /// use tickerscope_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::Transport { message: "connection reset".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::WithBackoff);
    ///
    /// let error = MarketDataError::HardApiError {
    ///     symbol: "NOPE123".to_string(),
    ///     message: "Invalid API call".to_string(),
    /// };
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::RateLimited { .. } | Self::Transport { .. } => RetryClass::WithBackoff,
            Self::HardApiError { .. } | Self::Normalization { .. } | Self::InvalidRequest(_) => {
                RetryClass::Never
            }
        }
    }

    /// Whether the failure may go away on a later run.
    pub fn is_transient(&self) -> bool {
        self.retry_class() == RetryClass::WithBackoff
    }
}
