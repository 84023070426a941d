//! Worker notification modes.

use std::fmt;

/// How the worker learns about new pending invoices.
///
/// Modes only ever degrade toward polling at runtime; a worker never
/// upgrades itself back to a push mode without a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingMode {
    /// Push notifications from a realtime event source, polling as backstop.
    PushRealtime,
    /// Push notifications via database LISTEN/NOTIFY, polling as backstop.
    PushListen,
    /// Pure polling with adaptive backoff.
    Poll,
}

impl ProcessingMode {
    /// Parse a configuration value. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "realtime" => Some(ProcessingMode::PushRealtime),
            "listen" => Some(ProcessingMode::PushListen),
            "poll" | "polling" => Some(ProcessingMode::Poll),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingMode::PushRealtime => "realtime",
            ProcessingMode::PushListen => "listen",
            ProcessingMode::Poll => "poll",
        }
    }

    /// Whether this mode consumes a push event subscription.
    pub fn is_push(&self) -> bool {
        matches!(
            self,
            ProcessingMode::PushRealtime | ProcessingMode::PushListen
        )
    }

    /// The mode to fall back to when a push subscription cannot be
    /// established. Poll mode has nothing left to degrade to.
    pub fn downgrade(&self) -> ProcessingMode {
        ProcessingMode::Poll
    }
}

impl fmt::Display for ProcessingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
