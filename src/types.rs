//! Shared types for the P2P monitor.
//!
//! The data model used by the scheduler, the quote fetcher, the notifier
//! and the presentation layer. Kept free of I/O so every module can depend
//! on it without circular references.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Fetch status / scheduler state
// ---------------------------------------------------------------------------

/// What the scheduler is doing right now, as shown in the terminal view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchStatus {
    Sleeping,
    Fetching,
}

impl FetchStatus {
    /// Longest rendered form, used to size the display slot.
    pub const MAX_WIDTH: usize = 8;
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchStatus::Sleeping => write!(f, "SLEEPING"),
            FetchStatus::Fetching => write!(f, "FETCHING"),
        }
    }
}

/// Derived phase of the scheduler state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerPhase {
    /// Debounce elapsed and no cycle running.
    Idle,
    /// A cycle started less than one fetch interval ago.
    Debouncing,
    /// A cycle is in flight.
    Fetching,
}

/// Process-wide scheduler timers. Owned exclusively by the `Monitor`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerState {
    pub fetch_debounce_remaining_ms: u64,
    pub fetch_in_progress: bool,
}

impl SchedulerState {
    pub fn phase(&self) -> SchedulerPhase {
        if self.fetch_in_progress {
            SchedulerPhase::Fetching
        } else if self.fetch_debounce_remaining_ms > 0 {
            SchedulerPhase::Debouncing
        } else {
            SchedulerPhase::Idle
        }
    }

    pub fn fetch_status(&self) -> FetchStatus {
        if self.fetch_in_progress {
            FetchStatus::Fetching
        } else {
            FetchStatus::Sleeping
        }
    }
}

// ---------------------------------------------------------------------------
// Watched currency
// ---------------------------------------------------------------------------

/// Body of the Bybit P2P `item/online` request for one fiat currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuotePayload {
    pub user_id: u64,
    pub token_id: String,
    pub currency_id: String,
    pub payment: Vec<String>,
    pub side: String,
    pub size: String,
    pub page: String,
    pub amount: String,
    pub auth_maker: bool,
    pub can_trade: bool,
}

/// A fiat currency being watched for a price at or above `desired_price`.
#[derive(Debug, Clone, PartialEq)]
pub struct WatchedCurrency {
    pub code: String,
    pub desired_price: Decimal,
    /// Remaining cooldown after a match. Zero means the currency is awake.
    pub sleep_remaining_ms: u64,
    pub payload: QuotePayload,
}

impl WatchedCurrency {
    pub fn new(code: impl Into<String>, desired_price: Decimal, payload: QuotePayload) -> Self {
        Self {
            code: code.into(),
            desired_price,
            sleep_remaining_ms: 0,
            payload,
        }
    }

    pub fn is_awake(&self) -> bool {
        self.sleep_remaining_ms == 0
    }

    /// Whether `order` meets the target price.
    ///
    /// An order whose price doesn't parse as a decimal never matches.
    pub fn is_satisfied_by(&self, order: &BestOrder) -> bool {
        order
            .price_value()
            .map(|price| price >= self.desired_price)
            .unwrap_or(false)
    }

    pub fn sleep_timer_key(&self) -> String {
        format!("{}.sleepTimer", self.code)
    }

    pub fn best_order_key(&self) -> String {
        format!("{}.bestOrder", self.code)
    }
}

// ---------------------------------------------------------------------------
// Quote response (Bybit JSON → Rust)
// ---------------------------------------------------------------------------

/// Envelope returned by the `item/online` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersResponse {
    pub ret_code: i64,
    #[serde(default)]
    pub ret_msg: String,
    /// Absent on provider-side errors.
    #[serde(default)]
    pub result: Option<OrdersResult>,
    #[serde(default)]
    pub ext_code: String,
    #[serde(default)]
    pub ext_info: Option<serde_json::Value>,
    #[serde(default)]
    pub time_now: String,
}

/// Items stay raw: only the first one is ever read, so the shape of the
/// rest must not fail the response.
#[derive(Debug, Clone, Deserialize)]
pub struct OrdersResult {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub items: Vec<serde_json::Value>,
}

impl OrdersResult {
    /// Decode the top-ranked item, if any.
    pub fn first_item(&self) -> Result<Option<QuoteItem>, serde_json::Error> {
        self.items
            .first()
            .map(QuoteItem::deserialize)
            .transpose()
    }
}

/// One advertisement in the quote list. Only the fields we act on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub id: String,
    pub price: String,
    pub min_amount: String,
    pub max_amount: String,
    pub currency_id: String,
    #[serde(default)]
    pub nick_name: Option<String>,
}

// ---------------------------------------------------------------------------
// Best order
// ---------------------------------------------------------------------------

/// The top-ranked entry of a quote list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BestOrder {
    pub id: String,
    /// Decimal as sent by the provider.
    pub price: String,
    pub min_amount: String,
    pub max_amount: String,
    pub currency_code: String,
}

impl BestOrder {
    /// Rendered in place of an order when the provider returned none.
    pub const NONE_MARKER: &'static str = "{ no available orders }";

    /// Take the first item of a response. The provider defines the ranking.
    pub fn from_response(response: &OrdersResponse) -> Option<Self> {
        response
            .result
            .as_ref()
            .and_then(|r| r.first_item().ok().flatten())
            .map(|item| Self::from(&item))
    }

    pub fn price_value(&self) -> Option<Decimal> {
        Decimal::from_str(self.price.trim()).ok()
    }
}

impl From<&QuoteItem> for BestOrder {
    fn from(item: &QuoteItem) -> Self {
        Self {
            id: item.id.clone(),
            price: item.price.clone(),
            min_amount: item.min_amount.clone(),
            max_amount: item.max_amount.clone(),
            currency_code: item.currency_id.clone(),
        }
    }
}

impl fmt::Display for BestOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{ price: {}; minAmount: {}; maxAmount: {} }}",
            self.price, self.min_amount, self.max_amount,
        )
    }
}

// ---------------------------------------------------------------------------
// Run time
// ---------------------------------------------------------------------------

/// Wall-clock time the monitor has been running, accumulated from ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTime {
    total_ms: u64,
}

impl RunTime {
    pub fn advance(&mut self, elapsed_ms: u64) {
        self.total_ms = self.total_ms.saturating_add(elapsed_ms);
    }

    pub fn total_ms(&self) -> u64 {
        self.total_ms
    }

    pub fn hours(&self) -> u64 {
        self.total_ms / 3_600_000
    }

    pub fn minutes(&self) -> u64 {
        (self.total_ms / 60_000) % 60
    }

    pub fn seconds(&self) -> u64 {
        (self.total_ms / 1000) % 60
    }
}

impl fmt::Display for RunTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours(),
            self.minutes(),
            self.seconds()
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors the scheduler has to tell apart.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// Request failed on every attempt. Treated as "no orders" for one cycle.
    #[error("Quotes unavailable for {currency} after {attempts} attempts: {message}")]
    QuoteUnavailable {
        currency: String,
        attempts: u32,
        message: String,
    },

    /// The provider answered with something that isn't a quote list.
    #[error("Malformed quote response for {currency}: {message}")]
    MalformedResponse { currency: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
