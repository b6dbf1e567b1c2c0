use super::{display_ip, ensure_ok, http_client, NotificationSink};
use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use serde::Serialize;
use snip_core::Notification;
use url::{form_urlencoded, Url};

const QR_CODE_ENDPOINT: &str = "https://api.qrserver.com/v1/create-qr-code/?size=150x150&data=";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    text: &'a str,
}

/// Posts notifications to a Google Chat incoming webhook.
#[derive(Debug, Clone)]
pub struct GoogleChatSink {
    client: reqwest::Client,
    webhook_url: Url,
}

impl GoogleChatSink {
    pub fn new(webhook_url: &str) -> Result<Self> {
        let webhook_url = Url::parse(webhook_url)
            .map_err(|e| NotifyError::InvalidEndpoint(format!("{webhook_url}: {e}")))?;

        Ok(Self {
            client: http_client()?,
            webhook_url,
        })
    }
}

/// Link to a QR code image encoding `short_url`.
pub fn qr_code_url(short_url: &str) -> String {
    let data: String = form_urlencoded::byte_serialize(short_url.as_bytes()).collect();
    format!("{QR_CODE_ENDPOINT}{data}")
}

pub fn format_message(notification: &Notification) -> String {
    format!(
        "*{}*\n\nClient IP: {}\nShort URL: {}\nOriginal URL: {}\nQR Code: {}",
        notification.event.message(),
        display_ip(notification.client_ip),
        notification.short_url,
        notification.original_url,
        qr_code_url(&notification.short_url),
    )
}

#[async_trait]
impl NotificationSink for GoogleChatSink {
    fn name(&self) -> &'static str {
        "google_chat"
    }

    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let text = format_message(notification);
        let response = self
            .client
            .post(self.webhook_url.clone())
            .json(&ChatMessage { text: &text })
            .send()
            .await?;

        ensure_ok(response).await
    }
}
