//! Telegram Bot API notifier.
//!
//! Sends plain-text messages via `POST /bot<token>/sendMessage`.
//! The bot token is kept in a `SecretString` and only exposed while the
//! request URL is built.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::Notifier;
use crate::config::{AppConfig, TelegramConfig};
use crate::retry::RetryPolicy;

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

pub struct TelegramNotifier {
    http: Client,
    api_base: String,
    bot_token: SecretString,
    chat_id: String,
    retry: RetryPolicy,
}

impl TelegramNotifier {
    pub fn new(
        api_base: impl Into<String>,
        bot_token: SecretString,
        chat_id: impl Into<String>,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client for Telegram")?;

        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            bot_token,
            chat_id: chat_id.into(),
            retry,
        })
    }

    /// Build from the env vars named in the config.
    ///
    /// Returns `Ok(None)` when either variable is unset.
    pub fn from_env(cfg: &TelegramConfig, retry: RetryPolicy) -> Result<Option<Self>> {
        let token = AppConfig::resolve_env(&cfg.bot_token_env).ok();
        let chat_id = AppConfig::resolve_env(&cfg.chat_id_env).ok();

        match (token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => Ok(Some(
                Self::new(cfg.api_base.clone(), SecretString::new(token), chat_id, retry)?,
            )),
            _ => Ok(None),
        }
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.bot_token.expose_secret())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_message(&self, text: &str) -> Result<()> {
        let http = &self.http;
        let url = self.send_message_url();
        let url = url.as_str();
        let body = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
        };
        let body = &body;

        self.retry
            .run("telegram sendMessage", move || async move {
                // reqwest errors embed the URL, which carries the token
                let resp = http
                    .post(url)
                    .json(body)
                    .send()
                    .await
                    .map_err(|e| anyhow::anyhow!("Telegram request failed: {}", e.without_url()))?;

                let status = resp.status();
                if !status.is_success() {
                    let body = resp.text().await.unwrap_or_default();
                    anyhow::bail!("Telegram API error {status}: {body}");
                }
                Ok(())
            })
            .await?;

        debug!(chat_id = %self.chat_id, "Telegram message sent");
        Ok(())
    }
}
