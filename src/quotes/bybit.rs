//! Bybit P2P quote client.
//!
//! POSTs the search payload to the public `fiat/otc/item/online` endpoint
//! and decodes the advertisement list. No authentication required.
//!
//! Response envelope:
//! `{ ret_code, ret_msg, result: { count, items: [...] }, ext_code, ext_info, time_now }`

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

use super::QuoteSource;
use crate::config::QuotesConfig;
use crate::retry::RetryPolicy;
use crate::types::{MonitorError, OrdersResponse, QuotePayload};

/// Bybit P2P quote client.
pub struct BybitP2pClient {
    http: Client,
    url: String,
    retry: RetryPolicy,
}

impl BybitP2pClient {
    pub fn new(url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent("p2p-monitor/0.1.0")
            .build()
            .context("Failed to build HTTP client for Bybit")?;

        Ok(Self {
            http,
            url: url.into(),
            retry,
        })
    }

    pub fn from_config(cfg: &QuotesConfig, retry: RetryPolicy) -> Result<Self> {
        Self::new(
            cfg.url.clone(),
            Duration::from_secs(cfg.request_timeout_secs),
            retry,
        )
    }

    /// POST the payload until a success status comes back, returning the raw body.
    async fn post_with_retry(&self, payload: &QuotePayload) -> Result<String, MonitorError> {
        let http = &self.http;
        let url = self.url.as_str();

        self.retry
            .run("bybit quote request", move || async move {
                let resp = http
                    .post(url)
                    .json(payload)
                    .send()
                    .await
                    .context("Bybit quote request failed")?;

                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    anyhow::bail!("Bybit API error {status}: {body}");
                }

                resp.text()
                    .await
                    .context("Failed to read Bybit response body")
            })
            .await
            .map_err(|e| MonitorError::QuoteUnavailable {
                currency: payload.currency_id.clone(),
                attempts: e.attempts,
                message: format!("{:#}", e.last_error),
            })
    }

    /// Decode a response body. Provider-side errors (`ret_code != 0`) count
    /// as an unavailable quote; anything undecodable is malformed.
    fn parse_body(currency: &str, body: &str, attempts: u32) -> Result<OrdersResponse, MonitorError> {
        let orders: OrdersResponse =
            serde_json::from_str(body).map_err(|e| MonitorError::MalformedResponse {
                currency: currency.to_string(),
                message: e.to_string(),
            })?;

        if orders.ret_code != 0 {
            warn!(currency, ret_code = orders.ret_code, ret_msg = %orders.ret_msg, "Bybit rejected quote request");
            return Err(MonitorError::QuoteUnavailable {
                currency: currency.to_string(),
                attempts,
                message: format!("ret_code {}: {}", orders.ret_code, orders.ret_msg),
            });
        }

        let Some(result) = &orders.result else {
            return Err(MonitorError::MalformedResponse {
                currency: currency.to_string(),
                message: "response has no result".to_string(),
            });
        };

        // Rows past the first are never read, so only the first is checked.
        if let Err(e) = result.first_item() {
            return Err(MonitorError::MalformedResponse {
                currency: currency.to_string(),
                message: format!("first item: {e}"),
            });
        }

        Ok(orders)
    }
}

#[async_trait]
impl QuoteSource for BybitP2pClient {
    async fn fetch_orders(&self, payload: &QuotePayload) -> Result<OrdersResponse, MonitorError> {
        debug!(currency = %payload.currency_id, url = %self.url, "Fetching Bybit P2P quotes");

        let body = self.post_with_retry(payload).await?;
        let orders = Self::parse_body(&payload.currency_id, &body, self.retry.max_attempts())?;

        debug!(
            currency = %payload.currency_id,
            count = orders.result.as_ref().map(|r| r.count).unwrap_or(0),
            "Bybit quotes fetched"
        );

        Ok(orders)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
