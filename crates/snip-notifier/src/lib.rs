//! Fire-and-forget event notifications.
//!
//! [`NotificationDispatcher`] implements [`snip_core::Notifier`] by pushing
//! notifications onto a bounded channel. A background worker drains the
//! channel and hands every notification to each configured
//! [`NotificationSink`]. Delivery errors are logged and never reach the
//! request that triggered the notification.

pub mod dispatcher;
pub mod error;
pub mod sink;

pub use dispatcher::{run_notification_worker, NotificationDispatcher, DEFAULT_QUEUE_CAPACITY};
pub use error::{NotifyError, Result};
pub use sink::google_chat::GoogleChatSink;
pub use sink::telegram::TelegramSink;
pub use sink::NotificationSink;
