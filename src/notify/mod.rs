//! Chat notifications.
//!
//! Defines the `Notifier` trait, the message formats for matches and
//! errors, and two implementations: Telegram and a log-only fallback used
//! when no bot credentials are configured.

pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::types::BestOrder;

/// Delivers a text message to the configured chat destination.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one message. Implementors retry internally; an `Err` means the
    /// message was not delivered.
    async fn send_message(&self, text: &str) -> Result<()>;
}

/// Text sent when an order reaches the desired price.
pub fn match_message(order: &BestOrder) -> String {
    format!(
        "Currency: {}, Price: {}, Min: {}, Max: {}, ID: {}",
        order.currency_code, order.price, order.min_amount, order.max_amount, order.id,
    )
}

/// Text sent when a cycle aborts on an unexpected error.
pub fn error_message(error: &dyn std::error::Error) -> String {
    error.to_string()
}

/// Writes messages to the log instead of a chat.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        info!(text, "Notification (no chat configured)");
        Ok(())
    }
}
