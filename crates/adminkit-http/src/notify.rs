//! User-facing notices
//!
//! The pipeline decides *whether* to tell the user something; a [`Notifier`]
//! decides how it is shown.

use serde::Serialize;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log; the default when no UI is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => tracing::error!(message = %notice.message, "notice"),
            NoticeLevel::Success | NoticeLevel::Info => {
                tracing::info!(message = %notice.message, "notice")
            }
        }
    }
}

/// Fans notices out to any number of UI subscribers.
///
/// Slow subscribers lag and miss notices rather than blocking requests.
pub struct NotificationBus {
    sender: broadcast::Sender<Notice>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for NotificationBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl Notifier for NotificationBus {
    fn notify(&self, notice: Notice) {
        tracing::debug!(level = ?notice.level, message = %notice.message, "Broadcasting notice");
        // Nobody listening is fine
        let _ = self.sender.send(notice);
    }
}
