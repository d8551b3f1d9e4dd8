//! HTTP transport seam.
//!
//! The fetch client only needs "GET this URL, give me the body". Keeping that
//! behind a trait lets tests script responses without a network.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use std::time::Duration;

use crate::errors::MarketDataError;

/// Performs GET requests and returns the response body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Fetch `url`. Connection failures, timeouts and non-success statuses
    /// are reported as [`MarketDataError::Transport`].
    async fn get(&self, url: &Url) -> Result<String, MarketDataError>;
}

/// Production transport backed by a shared `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> Result<String, MarketDataError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| MarketDataError::Transport {
                message: if e.is_timeout() {
                    "request timed out".to_string()
                } else {
                    e.without_url().to_string()
                },
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(MarketDataError::Transport {
                message: format!("HTTP {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| MarketDataError::Transport {
                message: e.without_url().to_string(),
            })?;

        debug!("received {} bytes", body.len());
        Ok(body)
    }
}
