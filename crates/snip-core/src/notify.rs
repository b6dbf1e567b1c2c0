use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::IpAddr;

/// The kind of event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Shortened,
    Redirected,
}

impl EventKind {
    /// Human readable headline used by chat sinks.
    pub fn message(&self) -> &'static str {
        match self {
            EventKind::Shortened => "URL shortened successfully",
            EventKind::Redirected => "URL redirected successfully",
        }
    }
}

impl Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventKind::Shortened => f.write_str("shortened"),
            EventKind::Redirected => f.write_str("redirected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event: EventKind,
    pub client_ip: Option<IpAddr>,
    /// The full short URL, base URL included.
    pub short_url: String,
    pub original_url: String,
}

/// Best-effort event notification.
///
/// `notify` must return immediately and must never fail the caller:
/// implementations hand the notification off to background delivery
/// and swallow (log) their own errors.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, notification: Notification);
}

/// A notifier that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: Notification) {}
}
