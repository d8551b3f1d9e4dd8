use anyhow::{Context, Result};
use std::time::Duration;
use tickerscope_market_data::provider::alpha_vantage::{
    BASE_URL, DEFAULT_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT, DEMO_API_KEY,
};
use tickerscope_market_data::FetchClientConfig;

const DEFAULT_DB_PATH: &str = "./data/tickerscope.db";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    /// True when no key was configured and the public demo key is used.
    pub using_demo_key: bool,
    pub db_path: String,
    pub base_url: String,
    pub max_attempts: u32,
    pub backoff: Duration,
    pub request_timeout: Duration,
    pub log_format: LogFormat,
}

impl Config {
    /// Reads `TS_*` variables, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        let configured_key = non_empty("TS_API_KEY").or_else(|| non_empty("ALPHAVANTAGE_API_KEY"));
        let using_demo_key = configured_key.is_none();
        let api_key = configured_key.unwrap_or_else(|| DEMO_API_KEY.to_string());

        let db_path = non_empty("TS_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.into());
        let base_url = non_empty("TS_API_BASE_URL").unwrap_or_else(|| BASE_URL.into());

        let max_attempts = match non_empty("TS_MAX_ATTEMPTS") {
            Some(v) => v
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| format!("Invalid TS_MAX_ATTEMPTS '{}'", v))?,
            None => DEFAULT_MAX_ATTEMPTS,
        };
        let backoff = match non_empty("TS_BACKOFF_SECS") {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse()
                    .with_context(|| format!("Invalid TS_BACKOFF_SECS '{}'", v))?,
            ),
            None => DEFAULT_BACKOFF,
        };
        let request_timeout = match non_empty("TS_REQUEST_TIMEOUT_SECS") {
            Some(v) => Duration::from_secs(
                v.trim()
                    .parse()
                    .with_context(|| format!("Invalid TS_REQUEST_TIMEOUT_SECS '{}'", v))?,
            ),
            None => DEFAULT_REQUEST_TIMEOUT,
        };
        let log_format = match non_empty("TS_LOG_FORMAT") {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };

        Ok(Self {
            api_key,
            using_demo_key,
            db_path,
            base_url,
            max_attempts,
            backoff,
            request_timeout,
            log_format,
        })
    }

    pub fn fetch_client_config(&self) -> FetchClientConfig {
        FetchClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            max_attempts: self.max_attempts,
            backoff: self.backoff,
            request_timeout: self.request_timeout,
        }
    }
}
