//! Log destinations.

use std::sync::{Arc, Mutex};

use crate::logging::{LogEntry, LogFormat, LogLevel};

/// Destination for rendered log entries.
pub trait LogSink: Send + Sync {
    /// Write one entry.
    fn write(&self, entry: &LogEntry, format: LogFormat);
}

/// Writes to stderr, which every edge runtime captures.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl LogSink for StderrSink {
    fn write(&self, entry: &LogEntry, format: LogFormat) {
        eprintln!("{}", entry.render(format));
    }
}

/// Forwards entries to the `tracing` subscriber installed by the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, entry: &LogEntry, _format: LogFormat) {
        let request_id = entry.request_id.as_deref().unwrap_or("-");
        let provider = entry.provider.map(|p| p.as_str()).unwrap_or("-");
        let fields = serde_json::to_string(&entry.fields).unwrap_or_default();
        match entry.level {
            LogLevel::Trace => {
                tracing::trace!(request_id, provider, fields = %fields, "{}", entry.message)
            }
            LogLevel::Debug => {
                tracing::debug!(request_id, provider, fields = %fields, "{}", entry.message)
            }
            LogLevel::Info => {
                tracing::info!(request_id, provider, fields = %fields, "{}", entry.message)
            }
            LogLevel::Warn => {
                tracing::warn!(request_id, provider, fields = %fields, "{}", entry.message)
            }
            LogLevel::Error => {
                tracing::error!(request_id, provider, fields = %fields, "{}", entry.message)
            }
        }
    }
}

/// Keeps entries in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the recorded entries.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// Messages of every entry at `level`.
    pub fn messages_at(&self, level: LogLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.level == level)
            .map(|e| e.message)
            .collect()
    }
}

impl LogSink for MemorySink {
    fn write(&self, entry: &LogEntry, _format: LogFormat) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(entry.clone());
        }
    }
}

/// Install a `tracing-subscriber` fmt subscriber for native hosts.
///
/// `RUST_LOG` takes precedence over `default_filter`. Returns `false` when a
/// global subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(level: LogLevel, message: &str) -> LogEntry {
        LogEntry {
            level,
            message: message.to_string(),
            request_id: None,
            provider: None,
            fields: HashMap::new(),
            elapsed_us: None,
        }
    }

    #[test]
    fn test_memory_sink_shared_between_clones() {
        let sink = MemorySink::new();
        let clone = sink.clone();
        clone.write(&entry(LogLevel::Error, "boom"), LogFormat::Json);
        sink.write(&entry(LogLevel::Info, "ok"), LogFormat::Json);

        assert_eq!(sink.entries().len(), 2);
        assert_eq!(sink.messages_at(LogLevel::Error), vec!["boom".to_string()]);
    }

    #[test]
    fn test_tracing_sink_without_subscriber() {
        // No subscriber installed: must be a silent no-op.
        TracingSink.write(&entry(LogLevel::Warn, "quiet"), LogFormat::Human);
    }
}
