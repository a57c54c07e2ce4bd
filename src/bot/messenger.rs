//! Outbound messaging contract.
//!
//! The controller depends on collaborating transports only through
//! [`Messenger`]: push a text reply, optionally with a reply keyboard, to a
//! user id. The production implementation POSTs to a configured webhook and
//! degrades to logging when none is set.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::info;

/// Rows of reply-button labels rendered under the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyboard {
    pub buttons: Vec<Vec<String>>,
}

impl Keyboard {
    pub fn new(rows: &[&[&str]]) -> Self {
        Self {
            buttons: rows
                .iter()
                .map(|row| row.iter().map(|label| label.to_string()).collect())
                .collect(),
        }
    }

    pub fn main_menu() -> Self {
        Self::new(&[
            &["🟢 Buy", "🔴 Sell"],
            &["💰 Balance", "🔑 Create wallet"],
        ])
    }

    pub fn confirm_menu() -> Self {
        Self::new(&[&["✅ Confirm", "◀️ Back"]])
    }
}

#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(
        &self,
        user_id: u64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
    user_id: u64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    keyboard: Option<&'a Keyboard>,
}

pub struct WebhookMessenger {
    http: Client,
    webhook_url: Option<String>,
}

impl WebhookMessenger {
    pub fn new(webhook_url: Option<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { http, webhook_url }
    }
}

#[async_trait]
impl Messenger for WebhookMessenger {
    async fn send_message(
        &self,
        user_id: u64,
        text: &str,
        keyboard: Option<Keyboard>,
    ) -> Result<()> {
        let Some(url) = &self.webhook_url else {
            info!("reply to {}: {}", user_id, text);
            return Ok(());
        };

        let payload = OutboundMessage {
            user_id,
            text,
            keyboard: keyboard.as_ref(),
        };

        self.http
            .post(url)
            .json(&payload)
            .send()
            .await
            .context("outbound webhook request failed")?
            .error_for_status()
            .context("outbound webhook rejected the message")?;

        Ok(())
    }
}
