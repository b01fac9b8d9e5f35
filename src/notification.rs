//! Operator notifications. Delivery is best effort: failures are logged and
//! never interrupt the caller.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::configuration::{Notification, Telegram};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, text: &str);
}

#[derive(serde::Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base: String,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(client: reqwest::Client, config: Telegram) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token,
            chat_id: config.chat_id,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base,
            self.bot_token.expose_secret()
        )
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    #[tracing::instrument(name = "send telegram message", skip_all)]
    async fn send_message(&self, text: &str) {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: "Markdown",
        };

        match self.client.post(self.endpoint()).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(chat_id = %self.chat_id, "Message sent");
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                tracing::error!(%status, body, "Failed to send message");
            }
            Err(e) => {
                // reqwest errors embed the URL, which carries the bot token.
                tracing::error!(error = %e.without_url(), "Error sending message");
            }
        }
    }
}

/// Fallback when no chat is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_message(&self, text: &str) {
        tracing::info!(notification = text);
    }
}

pub fn from_config(config: &Notification, client: reqwest::Client) -> Arc<dyn Notifier> {
    match &config.telegram {
        Some(telegram) => Arc::new(TelegramNotifier::new(client, telegram.clone())),
        None => {
            tracing::warn!("Telegram is not configured, notifications go to the log");
            Arc::new(LogNotifier)
        }
    }
}
