//! Per-request build log.
//!
//! # Design
//! - One `RequestLog` is created per HTTP request and handed explicitly to every
//!   component that reports progress; it is dropped with the request.
//! - Entries are append-only and each append takes the lock exactly once, so
//!   concurrent target builds never interleave partial lines.
//! - Every levelled entry is mirrored to `tracing` with the request id attached.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{SecondsFormat, Utc};
use tracing::{error, info, warn};

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Progress information.
    Info,
    /// Recoverable problems.
    Warn,
    /// Failures.
    Error,
}

impl LogLevel {
    /// Upper-case tag used in the rendered line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only log scoped to a single request.
#[derive(Debug, Clone)]
pub struct RequestLog {
    request_id: Arc<str>,
    entries: Arc<Mutex<Vec<String>>>,
}

impl RequestLog {
    /// Start an empty log for `request_id`.
    #[must_use]
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: Arc::from(request_id.into()),
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Identifier of the request this log belongs to.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Append an `INFO` entry.
    pub fn info(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!(request_id = %self.request_id, "{message}");
        self.push(LogLevel::Info, message);
    }

    /// Append a `WARN` entry.
    pub fn warn(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        warn!(request_id = %self.request_id, "{message}");
        self.push(LogLevel::Warn, message);
    }

    /// Append an `ERROR` entry.
    pub fn error(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        error!(request_id = %self.request_id, "{message}");
        self.push(LogLevel::Error, message);
    }

    /// Append a raw line without timestamp or level.
    pub fn write(&self, line: impl Into<String>) {
        self.lock().push(line.into());
    }

    /// All entries joined by newlines, in insertion order.
    #[must_use]
    pub fn contents(&self) -> String {
        self.lock().join("\n")
    }

    /// Number of entries recorded so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn push(&self, level: LogLevel, message: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let line = format!("{timestamp} [{level}] {message}");
        self.lock().push(line);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
