//! Price-quote sources.
//!
//! Defines the `QuoteSource` trait and the Bybit P2P implementation.

pub mod bybit;

use async_trait::async_trait;

use crate::types::{MonitorError, OrdersResponse, QuotePayload};

/// Abstraction over a marketplace quote endpoint.
///
/// Implementors apply their own retry policy. A definitive failure comes
/// back as `MonitorError::QuoteUnavailable`; a response that can't be
/// read as a quote list as `MonitorError::MalformedResponse`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Fetch the current order list for the payload's currency.
    async fn fetch_orders(&self, payload: &QuotePayload) -> Result<OrdersResponse, MonitorError>;
}
