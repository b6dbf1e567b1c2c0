use crate::sink::NotificationSink;
use snip_core::{Notification, Notifier};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Queues notifications for a background worker.
///
/// `notify` never waits: when the queue is full or the worker is gone the
/// notification is dropped and counted.
#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::Sender<Notification>,
    dropped: Arc<AtomicU64>,
}

impl NotificationDispatcher {
    /// Starts the worker on the current runtime.
    ///
    /// The worker exits once every clone of the returned dispatcher has been
    /// dropped and the queue is drained.
    pub fn spawn(
        sinks: Vec<Arc<dyn NotificationSink>>,
        capacity: usize,
    ) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let handle = tokio::spawn(run_notification_worker(rx, sinks));
        let dispatcher = Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        };
        (dispatcher, handle)
    }

    /// Number of notifications discarded because the queue was unavailable.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Notifier for NotificationDispatcher {
    fn notify(&self, notification: Notification) {
        if let Err(e) = self.tx.try_send(notification) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            match e {
                mpsc::error::TrySendError::Full(n) => {
                    warn!(event = %n.event, short_url = %n.short_url, "notification queue full, dropping");
                }
                mpsc::error::TrySendError::Closed(n) => {
                    warn!(event = %n.event, short_url = %n.short_url, "notification worker stopped, dropping");
                }
            }
        }
    }
}

/// Delivers queued notifications to every sink until the channel closes.
pub async fn run_notification_worker(
    mut rx: mpsc::Receiver<Notification>,
    sinks: Vec<Arc<dyn NotificationSink>>,
) {
    info!(sinks = sinks.len(), "notification worker started");

    while let Some(notification) = rx.recv().await {
        for sink in &sinks {
            match sink.deliver(&notification).await {
                Ok(()) => {
                    debug!(sink = sink.name(), event = %notification.event, "notification delivered");
                }
                Err(e) => {
                    warn!(
                        sink = sink.name(),
                        event = %notification.event,
                        error = %e,
                        "notification delivery failed"
                    );
                }
            }
        }
    }

    info!("notification worker stopped");
}
