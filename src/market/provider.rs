//! # market::provider — Upstream option-chain source
//!
//! The engine only needs "give me the chain for this symbol, or tell me it
//! failed".  [`ChainProvider`] is that seam; [`NseClient`] is the production
//! implementation against the NSE website API.
//!
//! NSE rejects bare API calls, so the client behaves like a browser: it keeps
//! a cookie jar, sends browser headers and touches the site root once before
//! every API request.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, REFERER, USER_AGENT};
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::models::RawSnapshot;

/// Source of raw option-chain snapshots.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn fetch_chain(&self, symbol: &str) -> Result<RawSnapshot, FetchError>;
}

// ─── NSE HTTP Client ──────────────────────────────────────────────────────────

/// Pause between the warm-up request and the API call.
const WARM_UP_PAUSE: Duration = Duration::from_secs(1);
/// Warm-up is cheaper than the API call, so it gets a shorter budget.
const WARM_UP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct NseClient {
    client:   reqwest::Client,
    base_url: String,
    timeout:  Duration,
}

impl NseClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("Mozilla/5.0 (Linux; Android 14)"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(REFERER, HeaderValue::from_static("https://www.nseindia.com/option-chain"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    fn chain_url(&self, symbol: &str) -> String {
        format!("{}/api/option-chain-indices?symbol={symbol}", self.base_url)
    }

    /// Fetch the site root so NSE sets its session cookies.
    async fn warm_up(&self) {
        let result = self
            .client
            .get(&self.base_url)
            .timeout(WARM_UP_TIMEOUT)
            .send()
            .await;

        if let Err(e) = result {
            // The API call may still succeed on cookies from a previous cycle.
            warn!(error = %e, "NSE warm-up request failed");
        }
        tokio::time::sleep(WARM_UP_PAUSE).await;
    }
}

#[async_trait]
impl ChainProvider for NseClient {
    async fn fetch_chain(&self, symbol: &str) -> Result<RawSnapshot, FetchError> {
        self.warm_up().await;

        let url = self.chain_url(symbol);
        debug!(%url, "Fetching option chain");

        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let body = resp.bytes().await.map_err(classify)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Http(e)
    }
}
