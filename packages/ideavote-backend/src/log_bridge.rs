/// Logger setup: env_logger output on stderr, plus a bounded in-memory
/// buffer of recent entries served at `GET /logs` for operators.
use env_logger::Logger;
use log::{Log, Metadata, Record, SetLoggerError};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::{LazyLock, Mutex};

const MAX_LOG_ENTRIES: usize = 500;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendLogEntry {
    pub timestamp: String,
    pub level: String,
    pub target: String,
    pub message: String,
}

struct RecentLogs {
    entries: Mutex<VecDeque<BackendLogEntry>>,
}

impl RecentLogs {
    fn push(&self, entry: BackendLogEntry) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push_back(entry);
            while entries.len() > MAX_LOG_ENTRIES {
                entries.pop_front();
            }
        }
    }

    fn snapshot(&self) -> Vec<BackendLogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }
}

static RECENT: LazyLock<RecentLogs> = LazyLock::new(|| RecentLogs {
    entries: Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES)),
});

struct BufferingLogger {
    inner: Logger,
}

impl Log for BufferingLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.inner.enabled(metadata)
    }

    fn log(&self, record: &Record<'_>) {
        if !self.inner.matches(record) {
            return;
        }
        self.inner.log(record);
        RECENT.push(BackendLogEntry {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            level: record.level().to_string().to_lowercase(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the logger. Filter defaults to `info`, overridable by RUST_LOG.
pub fn init() -> Result<(), SetLoggerError> {
    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).build();
    let max_level = logger.filter();
    let logger = Box::leak(Box::new(BufferingLogger { inner: logger }));
    log::set_logger(logger)?;
    log::set_max_level(max_level);
    Ok(())
}

pub fn recent_entries() -> Vec<BackendLogEntry> {
    RECENT.snapshot()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_logs_are_bounded() {
        let logs = RecentLogs {
            entries: Mutex::new(VecDeque::new()),
        };
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            logs.push(BackendLogEntry {
                timestamp: String::new(),
                level: "info".to_string(),
                target: "test".to_string(),
                message: i.to_string(),
            });
        }
        let entries = logs.snapshot();
        assert_eq!(entries.len(), MAX_LOG_ENTRIES);
        assert_eq!(entries[0].message, "10");
    }
}
