//! Rate feed trait and implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use finmate_common::CurrencyCode;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FeedConfig;
use crate::error::FetchError;

/// Payload of one feed round-trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedResponse {
    /// Base currency the feed quoted against, when it says so.
    #[serde(default)]
    pub base: Option<String>,
    /// Pivot-relative rates keyed by currency code.
    pub rates: HashMap<String, f64>,
}

impl FeedResponse {
    /// Create a response with no base field.
    pub fn new<I, K>(rates: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            base: None,
            rates: rates.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Set the base currency.
    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }
}

/// Source of fresh pivot-relative rate tables.
#[async_trait]
pub trait RateFeed: Send + Sync {
    /// Get the feed name.
    fn name(&self) -> &str;

    /// Fetch the current rates quoted against `pivot`.
    async fn fetch_rates(&self, pivot: &CurrencyCode) -> Result<FeedResponse, FetchError>;
}

/// Feed backed by an exchangerate-api.com style HTTP endpoint.
///
/// Issues `GET {base_url}/{PIVOT}` and expects `{"base": ..., "rates": {...}}`.
pub struct HttpRateFeed {
    client: Client,
    base_url: String,
}

impl HttpRateFeed {
    /// Build a feed from configuration.
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// URL requested for a pivot.
    pub fn url_for(&self, pivot: &CurrencyCode) -> String {
        format!("{}/{}", self.base_url, pivot)
    }
}

#[async_trait]
impl RateFeed for HttpRateFeed {
    fn name(&self) -> &str {
        "HTTP"
    }

    async fn fetch_rates(&self, pivot: &CurrencyCode) -> Result<FeedResponse, FetchError> {
        let url = self.url_for(pivot);
        debug!(url = %url, "Requesting rates");

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        parse_response(&body)
    }
}

/// Decode a feed body.
pub fn parse_response(body: &[u8]) -> Result<FeedResponse, FetchError> {
    serde_json::from_slice(body).map_err(|e| FetchError::Decode(e.to_string()))
}

fn map_transport_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Transport(format!("request timed out: {err}"))
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Scripted rate feed for testing.
///
/// Queued outcomes are returned first; after that every fetch returns the
/// fallback response. [`MockRateFeed::hold`] keeps fetches pending until
/// [`MockRateFeed::release`] is called.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateFeed {
    name: String,
    queue: parking_lot::Mutex<std::collections::VecDeque<Result<FeedResponse, FetchError>>>,
    fallback: parking_lot::Mutex<Result<FeedResponse, FetchError>>,
    calls: tokio::sync::watch::Sender<usize>,
    gate: tokio::sync::watch::Sender<bool>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateFeed {
    /// Create a feed that fails until rates are set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: parking_lot::Mutex::new(std::collections::VecDeque::new()),
            fallback: parking_lot::Mutex::new(Err(FetchError::Transport(
                "no rates configured".to_string(),
            ))),
            calls: tokio::sync::watch::channel(0).0,
            gate: tokio::sync::watch::channel(true).0,
        }
    }

    /// Set the response returned once the queue is drained.
    pub fn set_rates<I, K>(&self, rates: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        *self.fallback.lock() = Ok(FeedResponse::new(rates));
    }

    /// Set the error returned once the queue is drained.
    pub fn set_error(&self, err: FetchError) {
        *self.fallback.lock() = Err(err);
    }

    /// Queue a one-shot outcome.
    pub fn push(&self, outcome: Result<FeedResponse, FetchError>) {
        self.queue.lock().push_back(outcome);
    }

    /// Number of fetches started so far.
    pub fn calls(&self) -> usize {
        *self.calls.borrow()
    }

    /// Wait until at least `n` fetches have started.
    pub async fn wait_for_calls(&self, n: usize) {
        let mut rx = self.calls.subscribe();
        let _ = rx.wait_for(|calls| *calls >= n).await;
    }

    /// Keep subsequent fetches pending.
    pub fn hold(&self) {
        self.gate.send_replace(false);
    }

    /// Let pending fetches complete.
    pub fn release(&self) {
        self.gate.send_replace(true);
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateFeed for MockRateFeed {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self, _pivot: &CurrencyCode) -> Result<FeedResponse, FetchError> {
        self.calls.send_modify(|calls| *calls += 1);

        let outcome = match self.queue.lock().pop_front() {
            Some(outcome) => outcome,
            None => self.fallback.lock().clone(),
        };

        let mut gate = self.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;

        outcome
    }
}
