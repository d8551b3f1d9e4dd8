//! Scripted [`HttpTransport`] for tests, behind the `test-util` feature.

use async_trait::async_trait;
use reqwest::Url;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use super::transport::HttpTransport;
use crate::errors::MarketDataError;

/// Scripted transport for tests.
///
/// Responses are keyed by the ticker sent to the API (`symbol` or
/// `from_symbol` query parameter). A queued sequence is consumed front to
/// back and its last entry repeats once the queue is down to one.
#[derive(Clone, Default)]
pub struct MockTransport {
    routes: Arc<Mutex<HashMap<String, VecDeque<Result<String, MarketDataError>>>>>,
    calls: Arc<Mutex<Vec<Url>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer requests for `api_symbol` with `body`.
    pub fn respond(&self, api_symbol: &str, body: impl Into<String>) {
        self.respond_sequence(api_symbol, vec![Ok(body.into())]);
    }

    /// Answer successive requests for `api_symbol` with `responses`.
    pub fn respond_sequence(
        &self,
        api_symbol: &str,
        responses: Vec<Result<String, MarketDataError>>,
    ) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.insert(api_symbol.to_string(), responses.into());
        }
    }

    /// Every URL requested so far, in order.
    pub fn calls(&self) -> Vec<Url> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of requests made for one API ticker.
    pub fn calls_for(&self, api_symbol: &str) -> usize {
        self.calls()
            .iter()
            .filter(|url| api_symbol_of(url).as_deref() == Some(api_symbol))
            .count()
    }
}

fn api_symbol_of(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == "symbol" || k == "from_symbol")
        .map(|(_, v)| v.into_owned())
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: &Url) -> Result<String, MarketDataError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(url.clone());
        }

        let key = api_symbol_of(url).unwrap_or_default();
        let mut routes = self.routes.lock().map_err(|_| MarketDataError::Transport {
            message: "mock transport poisoned".to_string(),
        })?;

        match routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(|| {
                Err(MarketDataError::Transport {
                    message: "mock queue exhausted".to_string(),
                })
            }),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| {
                Err(MarketDataError::Transport {
                    message: "mock queue exhausted".to_string(),
                })
            }),
            None => Err(MarketDataError::Transport {
                message: format!("no mock response for '{}'", key),
            }),
        }
    }
}
