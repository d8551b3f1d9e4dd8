//! Alpha Vantage daily series client.
//!
//! One client serves all three series functions:
//! - Equities via TIME_SERIES_DAILY_ADJUSTED
//! - FX rates via FX_DAILY
//! - Cryptocurrencies via DIGITAL_CURRENCY_DAILY
//!
//! The API reports most problems in-band with HTTP 200. A `Note` or
//! `Information` key mentioning the premium tier means the caller was rate
//! limited; an `Error Message` key means the request itself was rejected.
//! Rate limits and transport failures are retried after a fixed backoff,
//! rejections are not.

mod normalizer;
mod request;

pub use normalizer::normalize;
pub use request::{build_url, query_params, redact};

use log::{debug, warn};
use reqwest::Url;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::MarketDataError;
use crate::models::{ClassifiedSymbol, PriceBar};
use crate::notifications::{Notification, NotificationSink};
use crate::provider::transport::{HttpTransport, ReqwestTransport};

pub const BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEMO_API_KEY: &str = "demo";

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(60);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const RATE_LIMIT_KEYS: [&str; 2] = ["Note", "Information"];
const RATE_LIMIT_MARKER: &str = "premium";
const ERROR_KEY: &str = "Error Message";

/// Decoded JSON object returned by the API.
pub type RawPayload = Map<String, Value>;

/// Settings for [`AlphaVantageClient`].
#[derive(Debug, Clone)]
pub struct FetchClientConfig {
    pub base_url: String,
    pub api_key: String,
    /// Total attempts per symbol, including the first one.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchClientConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            api_key: DEMO_API_KEY.to_string(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl FetchClientConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

/// Rate-limit aware client for the daily series endpoints.
pub struct AlphaVantageClient {
    transport: Arc<dyn HttpTransport>,
    sink: Arc<dyn NotificationSink>,
    config: FetchClientConfig,
}

impl AlphaVantageClient {
    /// Client backed by a `reqwest` transport.
    pub fn new(config: FetchClientConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let transport = Arc::new(ReqwestTransport::new(config.request_timeout));
        Self::with_transport(config, transport, sink)
    }

    pub fn with_transport(
        config: FetchClientConfig,
        transport: Arc<dyn HttpTransport>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            transport,
            sink,
            config,
        }
    }

    pub fn config(&self) -> &FetchClientConfig {
        &self.config
    }

    pub fn build_url(&self, symbol: &ClassifiedSymbol) -> Result<Url, MarketDataError> {
        build_url(&self.config.base_url, symbol, &self.config.api_key)
    }

    /// Fetch, normalize and return the full daily series for `symbol`.
    pub async fn fetch_symbol(
        &self,
        symbol: &ClassifiedSymbol,
    ) -> Result<Vec<PriceBar>, MarketDataError> {
        let url = self.build_url(symbol)?;
        let payload = self.fetch(&symbol.symbol, &url).await?;
        let bars = normalize(&payload, symbol)?;

        debug!(
            "Alpha Vantage: {} bars for {} ({})",
            bars.len(),
            symbol.symbol,
            symbol.function().as_api_str()
        );
        Ok(bars)
    }

    /// GET `url` with bounded retries and return the decoded payload.
    ///
    /// Makes at most `max_attempts` requests and sleeps `backoff` between
    /// them, never after the last one. The sleep is a plain async sleep, so
    /// dropping the future cancels the wait.
    pub async fn fetch(&self, symbol: &str, url: &Url) -> Result<RawPayload, MarketDataError> {
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                debug!(
                    "Backing off {:?} before attempt {}/{} for {}",
                    self.config.backoff, attempt, max_attempts, symbol
                );
                tokio::time::sleep(self.config.backoff).await;
            }

            debug!(
                "Alpha Vantage request: {}",
                redact(url, &self.config.api_key)
            );

            match self.attempt(symbol, url, attempt).await {
                Ok(payload) => return Ok(payload),
                Err(e) if e.is_transient() => {
                    warn!(
                        "Attempt {}/{} for {} failed: {}",
                        attempt, max_attempts, symbol, e
                    );
                    // The final failure is reported once, as the give-up error below.
                    if attempt < max_attempts {
                        self.sink.notify(Notification::warning(
                            symbol,
                            format!("attempt {}/{} failed: {}", attempt, max_attempts, e),
                        ));
                    }
                    last_error = Some(e);
                }
                Err(e) => {
                    if let MarketDataError::HardApiError { message, .. } = &e {
                        self.sink.notify(Notification::error(symbol, message.clone()));
                    }
                    return Err(e);
                }
            }
        }

        let error = last_error.unwrap_or_else(|| MarketDataError::Transport {
            message: "no attempt was made".to_string(),
        });
        self.sink.notify(Notification::error(
            symbol,
            format!("giving up after {} attempt(s): {}", max_attempts, error),
        ));
        Err(error)
    }

    async fn attempt(
        &self,
        symbol: &str,
        url: &Url,
        attempt: u32,
    ) -> Result<RawPayload, MarketDataError> {
        let body = self.transport.get(url).await?;
        let payload = parse_body(symbol, &body)?;
        inspect_signals(symbol, &payload, attempt)?;
        Ok(payload)
    }
}

fn parse_body(symbol: &str, body: &str) -> Result<RawPayload, MarketDataError> {
    let value: Value = serde_json::from_str(body).map_err(|e| MarketDataError::Transport {
        message: format!("invalid JSON body: {}", e),
    })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(MarketDataError::Normalization {
            symbol: symbol.to_string(),
            message: format!("expected a JSON object, got {}", json_kind(&other)),
        }),
    }
}

/// Classify in-band signals. Rate-limit notes win over error messages.
fn inspect_signals(
    symbol: &str,
    payload: &RawPayload,
    attempt: u32,
) -> Result<(), MarketDataError> {
    for key in RATE_LIMIT_KEYS {
        if let Some(message) = payload.get(key).map(signal_text) {
            if message.to_lowercase().contains(RATE_LIMIT_MARKER) {
                return Err(MarketDataError::RateLimited {
                    symbol: symbol.to_string(),
                    attempts: attempt,
                    message,
                });
            }
        }
    }

    if let Some(message) = payload.get(ERROR_KEY).map(signal_text) {
        return Err(MarketDataError::HardApiError {
            symbol: symbol.to_string(),
            message,
        });
    }

    for key in RATE_LIMIT_KEYS {
        if let Some(message) = payload.get(key).map(signal_text) {
            warn!("Alpha Vantage {} for {}: {}", key.to_lowercase(), symbol, message);
        }
    }

    Ok(())
}

fn signal_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
