//! Notification sinks
//!
//! The core hands a finished message to a [`NotificationSink`] and never
//! retries. Callers decide what a failed delivery means; the CLI logs it and
//! carries on.

use crate::error::{ReadyRsError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument};
use ureq::Agent;

/// Telegram delivery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Bot token issued by @BotFather
    pub telegram_token: Option<String>,

    /// Target chat id
    pub telegram_chat_id: Option<String>,

    /// Bot API base URL
    pub api_base: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            telegram_token: None,
            telegram_chat_id: None,
            api_base: TelegramSink::DEFAULT_API_BASE.to_string(),
            timeout_secs: 15,
        }
    }
}

impl NotifyConfig {
    /// True when both Telegram credentials are present
    pub fn has_telegram(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        present(&self.telegram_token) && present(&self.telegram_chat_id)
    }
}

/// Destination for a rendered report
pub trait NotificationSink {
    /// Short sink name for logs
    fn name(&self) -> &'static str;

    fn deliver(&self, message: &str) -> Result<()>;
}

/// Sends Markdown messages through the Telegram Bot API
pub struct TelegramSink {
    agent: Agent,
    api_base: String,
    token: String,
    chat_id: String,
}

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

impl TelegramSink {
    pub const DEFAULT_API_BASE: &'static str = "https://api.telegram.org";

    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Self {
        Self::with_api_base(Self::DEFAULT_API_BASE, token, chat_id, Duration::from_secs(15))
    }

    pub fn with_api_base(
        api_base: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        TelegramSink {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            chat_id: chat_id.into(),
        }
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        match (&config.telegram_token, &config.telegram_chat_id) {
            (Some(token), Some(chat_id)) if config.has_telegram() => Ok(Self::with_api_base(
                config.api_base.clone(),
                token.clone(),
                chat_id.clone(),
                Duration::from_secs(config.timeout_secs),
            )),
            _ => Err(ReadyRsError::Configuration(
                "Telegram delivery needs notify.telegram_token and notify.telegram_chat_id"
                    .to_string(),
            )),
        }
    }

    fn send_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }
}

impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    #[instrument(skip_all, fields(chars = message.len()))]
    fn deliver(&self, message: &str) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: message,
            parse_mode: "Markdown",
        };

        match self.agent.post(&self.send_url()).send_json(&payload) {
            Ok(resp) if resp.status() == 200 => {
                info!("Message delivered to Telegram");
                Ok(())
            }
            Ok(resp) => Err(ReadyRsError::Delivery(format!(
                "Telegram answered with status {}",
                resp.status()
            ))),
            Err(ureq::Error::Status(status, resp)) => {
                let body = resp.into_string().unwrap_or_default();
                Err(ReadyRsError::Delivery(format!(
                    "Telegram rejected the message ({}): {}",
                    status, body
                )))
            }
            Err(ureq::Error::Transport(transport)) => Err(ReadyRsError::Delivery(format!(
                "Telegram unreachable: {}",
                transport
            ))),
        }
    }
}

/// Writes messages to the log instead of a chat
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &'static str {
        "log"
    }

    fn deliver(&self, message: &str) -> Result<()> {
        info!(target: "readyrs::notify", %message, "Notification");
        Ok(())
    }
}
