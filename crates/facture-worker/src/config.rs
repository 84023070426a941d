//! Worker configuration from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use facture_core::{defaults, Error, Result};

use crate::mode::ProcessingMode;

/// Configuration for the invoice worker.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Database connection string.
    pub database_url: String,
    /// Notification mode the worker starts in.
    pub mode: ProcessingMode,
    /// Base poll interval when in poll mode (also the reconciliation
    /// fallback for push modes).
    pub poll_interval: Duration,
    /// Base directory invoice documents are resolved against.
    pub document_dir: PathBuf,
}

impl WorkerConfig {
    /// Create config from environment variables.
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `DATABASE_URL` | (required) | PostgreSQL connection string |
    /// | `FACTURE_MODE` | `realtime` | `realtime`, `listen` or `poll` |
    /// | `FACTURE_POLL_INTERVAL_SECS` | `5` | Base poll interval in seconds |
    /// | `FACTURE_DOCUMENT_DIR` | `./documents` | Invoice document base directory |
    pub fn from_env() -> Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| Error::Config("DATABASE_URL is not set".into()))?;

        let mode = match std::env::var("FACTURE_MODE") {
            Ok(value) => ProcessingMode::parse(&value)
                .ok_or_else(|| Error::Config(format!("Unknown FACTURE_MODE: {value}")))?,
            Err(_) => ProcessingMode::PushRealtime,
        };

        let poll_interval_secs = std::env::var("FACTURE_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::POLL_INTERVAL_SECS)
            .max(1);

        let document_dir = std::env::var("FACTURE_DOCUMENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./documents"));

        Ok(Self {
            database_url,
            mode,
            poll_interval: Duration::from_secs(poll_interval_secs),
            document_dir,
        })
    }

    /// Set the processing mode.
    pub fn with_mode(mut self, mode: ProcessingMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the base poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_values() {
        assert_eq!(
            ProcessingMode::parse("realtime"),
            Some(ProcessingMode::PushRealtime)
        );
        assert_eq!(
            ProcessingMode::parse("listen"),
            Some(ProcessingMode::PushListen)
        );
        assert_eq!(ProcessingMode::parse("poll"), Some(ProcessingMode::Poll));
        assert_eq!(ProcessingMode::parse("webhook"), None);
    }
}
