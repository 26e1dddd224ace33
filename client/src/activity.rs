//! Activity feed - user-facing progress log.
//!
//! Every step the orchestrator takes (upload tiers, previews, commits,
//! failures) is published as a [`LogEntry`] on a broadcast channel so a UI
//! can render a running log. Entries are mirrored into `tracing` at the
//! matching level.
//!
//! ```rust,ignore
//! use tokio_stream::StreamExt;
//!
//! let mut entries = orchestrator.activity().stream();
//! while let Some(entry) = entries.next().await {
//!     println!("[{}] {}", entry.timestamp, entry.message);
//! }
//! ```

use chrono::Local;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;

/// Entries buffered per subscriber before the slowest one starts lagging.
const FEED_CAPACITY: usize = 100;

/// Log level for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Prefix used by terminal renderers.
    pub fn marker(&self) -> &'static str {
        match self {
            LogLevel::Info => " ",
            LogLevel::Success => "✓",
            LogLevel::Warning => "⚠️",
            LogLevel::Error => "❌",
        }
    }
}

/// A single feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth (for detail lines under a step)
    #[serde(default)]
    pub indent: u8,
    /// Local time, `HH:MM:SS`
    pub timestamp: String,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            timestamp: Local::now().format("%H:%M:%S").to_string(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }

    /// One terminal line: `[12:00:01] ✓ message`.
    pub fn render(&self) -> String {
        format!(
            "[{}] {}{} {}",
            self.timestamp,
            "   ".repeat(self.indent as usize),
            self.level.marker(),
            self.message
        )
    }
}

/// Broadcasts entries to every subscriber.
#[derive(Debug, Clone)]
pub struct ActivityFeed {
    sender: broadcast::Sender<LogEntry>,
}

impl ActivityFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(FEED_CAPACITY);
        Self { sender }
    }

    /// Publish an entry (dropped silently when nobody listens).
    pub fn log(&self, entry: LogEntry) {
        match entry.level {
            LogLevel::Info | LogLevel::Success => {
                tracing::info!(indent = entry.indent, "{}", entry.message)
            }
            LogLevel::Warning => tracing::warn!(indent = entry.indent, "{}", entry.message),
            LogLevel::Error => tracing::error!(indent = entry.indent, "{}", entry.message),
        }
        let _ = self.sender.send(entry);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogEntry::info(message));
    }

    pub fn success(&self, message: impl Into<String>) {
        self.log(LogEntry::success(message));
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogEntry::warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogEntry::error(message));
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }

    /// Entries published from now on. Lagged entries are skipped.
    pub fn stream(&self) -> impl Stream<Item = LogEntry> + Send + 'static {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|entry| entry.ok())
    }
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::new()
    }
}
