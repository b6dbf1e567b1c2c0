use super::{display_ip, ensure_ok, http_client, NotificationSink};
use crate::error::Result;
use async_trait::async_trait;
use snip_core::Notification;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Sends notifications through the Telegram Bot API `sendMessage` method.
#[derive(Clone)]
pub struct TelegramSink {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl std::fmt::Debug for TelegramSink {
    // The endpoint embeds the bot token.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

impl TelegramSink {
    pub fn new(bot_token: &str, chat_id: impl Into<String>) -> Result<Self> {
        Self::with_api_base(DEFAULT_API_BASE, bot_token, chat_id)
    }

    pub fn with_api_base(
        api_base: &str,
        bot_token: &str,
        chat_id: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            endpoint: format!("{}/bot{bot_token}/sendMessage", api_base.trim_end_matches('/')),
            chat_id: chat_id.into(),
        })
    }
}

pub fn format_message(notification: &Notification) -> String {
    format!(
        "*{}*\n\nClient IP: `{}`\nShort URL: {}\nOriginal URL: {}",
        notification.event.message(),
        display_ip(notification.client_ip),
        notification.short_url,
        notification.original_url,
    )
}

#[async_trait]
impl NotificationSink for TelegramSink {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let text = format_message(notification);
        let form = [
            ("chat_id", self.chat_id.as_str()),
            ("text", text.as_str()),
            ("parse_mode", "Markdown"),
        ];

        let response = self.client.post(&self.endpoint).form(&form).send().await?;
        ensure_ok(response).await
    }
}
