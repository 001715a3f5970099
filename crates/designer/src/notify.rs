//! User-facing notifications.
//!
//! Operational failures never propagate to the owning page; they end up
//! here as a transient message with a severity level.

use std::cell::RefCell;

use tracing::{error, info, warn};

/// Severity of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One message for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
}

impl Notification {
    #[must_use]
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }
}

/// Sink for user-facing messages
pub trait Notifier {
    fn notify(&self, notification: Notification);

    fn info(&self, message: &str) {
        self.notify(Notification::new(Level::Info, message));
    }

    fn success(&self, message: &str) {
        self.notify(Notification::new(Level::Success, message));
    }

    fn warning(&self, message: &str) {
        self.notify(Notification::new(Level::Warning, message));
    }

    fn error(&self, message: &str) {
        self.notify(Notification::new(Level::Error, message));
    }
}

/// Writes notifications to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.level {
            Level::Info | Level::Success => info!(level = %notification.level, "{}", notification.message),
            Level::Warning => warn!("{}", notification.message),
            Level::Error => error!("{}", notification.message),
        }
    }
}

/// Collects notifications in memory
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: RefCell<Vec<Notification>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first
    #[must_use]
    pub fn all(&self) -> Vec<Notification> {
        self.received.borrow().clone()
    }

    /// Messages received at the given level
    #[must_use]
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.received
            .borrow()
            .iter()
            .filter(|n| n.level == level)
            .map(|n| n.message.clone())
            .collect()
    }

    #[must_use]
    pub fn last(&self) -> Option<Notification> {
        self.received.borrow().last().cloned()
    }

    pub fn clear(&self) {
        self.received.borrow_mut().clear();
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.received.borrow_mut().push(notification);
    }
}
