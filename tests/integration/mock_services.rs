//! In-memory services for integration testing.
//!
//! Deterministic `QuoteSource` and `Notifier` implementations. All state
//! sits behind `Arc<Mutex<_>>` so a test keeps a handle while the
//! monitor owns a clone.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use p2p_monitor::notify::Notifier;
use p2p_monitor::quotes::QuoteSource;
use p2p_monitor::types::{MonitorError, OrdersResponse, OrdersResult, QuoteItem, QuotePayload};

/// How the fake provider answers for one currency.
#[derive(Debug, Clone)]
pub enum Quote {
    Price(&'static str),
    Empty,
    Unavailable,
    Malformed,
}

/// Scripted quote provider. Currencies without a script get an empty book.
#[derive(Clone, Default)]
pub struct MockQuotes {
    quotes: Arc<Mutex<HashMap<String, Quote>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, currency: &str, quote: Quote) {
        self.quotes.lock().unwrap().insert(currency.to_string(), quote);
    }

    /// Currencies requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

pub fn book(currency: &str, price: &str) -> OrdersResponse {
    OrdersResponse {
        ret_code: 0,
        ret_msg: "SUCCESS".to_string(),
        result: Some(OrdersResult {
            count: 1,
            items: vec![serde_json::to_value(QuoteItem {
                id: format!("{currency}-ad"),
                price: price.to_string(),
                min_amount: "500".to_string(),
                max_amount: "20000".to_string(),
                currency_id: currency.to_string(),
                nick_name: Some("mock-maker".to_string()),
            })
            .unwrap()],
        }),
        ext_code: String::new(),
        ext_info: None,
        time_now: "1700000000.000000".to_string(),
    }
}

fn empty_book() -> OrdersResponse {
    OrdersResponse {
        ret_code: 0,
        ret_msg: "SUCCESS".to_string(),
        result: Some(OrdersResult { count: 0, items: vec![] }),
        ext_code: String::new(),
        ext_info: None,
        time_now: String::new(),
    }
}

#[async_trait]
impl QuoteSource for MockQuotes {
    async fn fetch_orders(&self, payload: &QuotePayload) -> Result<OrdersResponse, MonitorError> {
        let currency = payload.currency_id.clone();
        self.requests.lock().unwrap().push(currency.clone());

        let quote = self.quotes.lock().unwrap().get(&currency).cloned();
        match quote {
            Some(Quote::Price(price)) => Ok(book(&currency, price)),
            Some(Quote::Empty) | None => Ok(empty_book()),
            Some(Quote::Unavailable) => Err(MonitorError::QuoteUnavailable {
                currency,
                attempts: 3,
                message: "HTTP 503".to_string(),
            }),
            Some(Quote::Malformed) => Err(MonitorError::MalformedResponse {
                currency,
                message: "expected value at line 1 column 1".to_string(),
            }),
        }
    }
}

/// Records every message. Can be told to fail delivery.
#[derive(Clone, Default)]
pub struct MockNotifier {
    sent: Arc<Mutex<Vec<String>>>,
    attempts: Arc<Mutex<usize>>,
    force_error: Arc<Mutex<Option<String>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail all subsequent sends.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Messages that were delivered.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// Sends attempted, delivered or not.
    pub fn attempts(&self) -> usize {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        *self.attempts.lock().unwrap() += 1;
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
