pub mod google_chat;
pub mod telegram;

use crate::error::{NotifyError, Result};
use async_trait::async_trait;
use snip_core::Notification;
use std::net::IpAddr;
use std::time::Duration;

/// Per-request timeout for outbound deliveries.
pub const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// A destination notifications are delivered to.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(DELIVERY_TIMEOUT).build()?)
}

pub(crate) fn display_ip(ip: Option<IpAddr>) -> String {
    ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string())
}

/// Turns any non-200 response into [`NotifyError::Rejected`].
pub(crate) async fn ensure_ok(response: reqwest::Response) -> Result<()> {
    let status = response.status();
    if status == reqwest::StatusCode::OK {
        return Ok(());
    }

    let body = response.text().await.unwrap_or_default();
    Err(NotifyError::Rejected {
        status: status.as_u16(),
        body,
    })
}
