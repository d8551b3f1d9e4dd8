//! Notification sink trait and implementations.

#[cfg(any(test, feature = "test-util"))]
use std::sync::{Arc, Mutex};

use log::{error, info, warn};

use super::{Notification, Severity};

/// Trait for receiving notifications.
///
/// # Design Rules
///
/// - `notify()` must be fast and must not fail (no network calls)
/// - A sink that cannot deliver drops the notification; fetching goes on
pub trait NotificationSink: Send + Sync {
    /// Deliver a single notification.
    fn notify(&self, notification: Notification);
}

/// Routes notifications to the `log` facade at the matching level.
#[derive(Clone, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        let symbol = notification.symbol.as_deref().unwrap_or("-");
        match notification.severity {
            Severity::Info => info!("symbol={} {}", symbol, notification.message),
            Severity::Warning => warn!("symbol={} {}", symbol, notification.message),
            Severity::Error => error!("symbol={} {}", symbol, notification.message),
        }
    }
}

/// No-op implementation for contexts that don't need notifications.
#[derive(Clone, Default)]
pub struct NoOpNotificationSink;

impl NotificationSink for NoOpNotificationSink {
    fn notify(&self, _notification: Notification) {}
}

/// Collects notifications in memory. Used by tests to assert on what was reported.
#[cfg(any(test, feature = "test-util"))]
#[derive(Clone, Default)]
pub struct CollectingNotificationSink {
    notifications: Arc<Mutex<Vec<Notification>>>,
}

#[cfg(any(test, feature = "test-util"))]
impl CollectingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected notifications.
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Notifications at the given severity.
    pub fn with_severity(&self, severity: Severity) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.severity == severity)
            .collect()
    }

    /// Returns the number of collected notifications.
    pub fn len(&self) -> usize {
        self.notifications.lock().map(|n| n.len()).unwrap_or(0)
    }

    /// Returns true if nothing has been collected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(any(test, feature = "test-util"))]
impl NotificationSink for CollectingNotificationSink {
    fn notify(&self, notification: Notification) {
        if let Ok(mut notifications) = self.notifications.lock() {
            notifications.push(notification);
        }
    }
}
