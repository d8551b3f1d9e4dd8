//! User-facing notifications for fetch problems.
//!
//! Components that detect a problem report it here once, instead of
//! returning early or panicking. Displaying and persisting notifications is
//! the sink implementation's concern.

mod sink;

#[cfg(any(test, feature = "test-util"))]
pub use sink::CollectingNotificationSink;
pub use sink::{LogNotificationSink, NoOpNotificationSink, NotificationSink};

use serde::{Deserialize, Serialize};
use std::fmt;

/// How serious a notification is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => f.write_str("info"),
            Self::Warning => f.write_str("warning"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub severity: Severity,
    /// Symbol the notification is about, when there is one.
    pub symbol: Option<String>,
    pub message: String,
}

impl Notification {
    pub fn new(severity: Severity, symbol: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity,
            symbol: symbol.map(str::to_string),
            message: message.into(),
        }
    }

    pub fn warning(symbol: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, Some(symbol), message)
    }

    pub fn error(symbol: &str, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, Some(symbol), message)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "[{}] {}: {}", self.severity, symbol, self.message),
            None => write!(f, "[{}] {}", self.severity, self.message),
        }
    }
}
