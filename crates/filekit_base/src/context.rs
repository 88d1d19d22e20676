use std::sync::Arc;

use crate::config::FilekitConfig;
use crate::logging::{ChangeLogger, LoggerHandle};

/// Explicit context passed to every file operation.
///
/// Carries the change logger and the configuration, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct Context {
    logger: LoggerHandle,
    config: Arc<FilekitConfig>,
}

impl Context {
    pub fn new(logger: LoggerHandle, config: FilekitConfig) -> Self {
        Self {
            logger,
            config: Arc::new(config),
        }
    }

    /// Context using `logger` and the default configuration.
    pub fn with_logger(logger: impl ChangeLogger) -> Self {
        Self::new(LoggerHandle::new(logger), FilekitConfig::default())
    }

    pub fn logger(&self) -> &LoggerHandle {
        &self.logger
    }

    pub fn config(&self) -> &FilekitConfig {
        &self.config
    }

    pub fn log_info(&self, message: impl AsRef<str>) {
        self.logger.info(message.as_ref());
    }

    pub fn log_changed(&self, message: impl AsRef<str>) {
        self.logger.changed(message.as_ref());
    }

    /// Reports `changed_message` if `changed` is set, `unchanged_message` otherwise.
    pub fn log_outcome(
        &self,
        changed: bool,
        changed_message: impl AsRef<str>,
        unchanged_message: impl AsRef<str>,
    ) {
        if changed {
            self.log_changed(changed_message);
        } else {
            self.log_info(unchanged_message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{ChangeLevel, RecordingLogger};

    #[test]
    fn test_log_outcome_routes_by_flag() {
        let recorder = RecordingLogger::new();
        let ctx = Context::with_logger(recorder.clone());

        ctx.log_outcome(true, "changed it", "left it");
        ctx.log_outcome(false, "changed it", "left it");

        let levels: Vec<_> = recorder.entries().iter().map(|e| e.level).collect();
        assert_eq!(levels, vec![ChangeLevel::Changed, ChangeLevel::Info]);
        assert_eq!(recorder.entries()[1].message, "left it");
    }

    #[test]
    fn test_default_context_uses_default_config() {
        let ctx = Context::default();
        assert_eq!(ctx.config(), &FilekitConfig::default());
    }
}
