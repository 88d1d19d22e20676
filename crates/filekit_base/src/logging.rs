use std::sync::Arc;

use parking_lot::Mutex;

/* 📖 # Why inject a change logger instead of logging globally?

Every mutating file operation has to report whether it altered state or was a no-op.
Routing these reports through a capability carried in the `Context` keeps the core free
of process wide state: production code logs through `tracing`, tests record the entries
and assert on them.
*/

/// Severity of a change log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeLevel {
    /// Nothing was modified (idempotent no-op or read-only outcome).
    Info,
    /// State on the target host was altered.
    Changed,
}

/// A single recorded log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeLogEntry {
    pub level: ChangeLevel,
    pub message: String,
}

/// Capability receiving the outcome reports of file operations.
pub trait ChangeLogger: std::fmt::Debug + Send + Sync + 'static {
    /// Report an informational, non-mutating outcome.
    fn info(&self, message: &str);

    /// Report that state was altered.
    fn changed(&self, message: &str);
}

/// Logger forwarding reports to `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl ChangeLogger for TracingLogger {
    fn info(&self, message: &str) {
        tracing::info!(changed = false, "{}", message);
    }

    fn changed(&self, message: &str) {
        tracing::info!(changed = true, "{}", message);
    }
}

/// Logger keeping every entry in memory.
#[derive(Debug, Default, Clone)]
pub struct RecordingLogger {
    entries: Arc<Mutex<Vec<ChangeLogEntry>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all entries recorded so far.
    pub fn entries(&self) -> Vec<ChangeLogEntry> {
        self.entries.lock().clone()
    }

    /// Returns the messages of all `Changed` entries.
    pub fn changed_messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|entry| entry.level == ChangeLevel::Changed)
            .map(|entry| entry.message.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, level: ChangeLevel, message: &str) {
        tracing::debug!(?level, "{}", message);
        self.entries.lock().push(ChangeLogEntry {
            level,
            message: message.to_string(),
        });
    }
}

impl ChangeLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.push(ChangeLevel::Info, message);
    }

    fn changed(&self, message: &str) {
        self.push(ChangeLevel::Changed, message);
    }
}

/// Handle to a logger implementation, enabling shared ownership.
///
/// Internally wraps `Arc<dyn ChangeLogger>` for cheap cloning, the same way the
/// file handles share their backends.
#[derive(Debug, Clone)]
pub struct LoggerHandle(Arc<dyn ChangeLogger>);

impl LoggerHandle {
    pub fn new(logger: impl ChangeLogger) -> Self {
        Self(Arc::new(logger))
    }
}

impl Default for LoggerHandle {
    fn default() -> Self {
        Self::new(TracingLogger)
    }
}

impl std::ops::Deref for LoggerHandle {
    type Target = dyn ChangeLogger;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_logger_keeps_order_and_level() {
        let recorder = RecordingLogger::new();
        let handle = LoggerHandle::new(recorder.clone());

        handle.info("File '/tmp/a' already exists");
        handle.changed("Created file '/tmp/b'");

        assert_eq!(
            recorder.entries(),
            vec![
                ChangeLogEntry {
                    level: ChangeLevel::Info,
                    message: "File '/tmp/a' already exists".to_string()
                },
                ChangeLogEntry {
                    level: ChangeLevel::Changed,
                    message: "Created file '/tmp/b'".to_string()
                },
            ]
        );
        assert_eq!(recorder.changed_messages(), vec!["Created file '/tmp/b'"]);

        recorder.clear();
        assert!(recorder.entries().is_empty());
    }

    #[test]
    fn test_tracing_logger_does_not_panic_without_subscriber() {
        let handle = LoggerHandle::default();
        handle.info("nothing to do");
        handle.changed("something changed");
    }
}
