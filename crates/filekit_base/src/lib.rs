/* 📖 # Why have filekit_base as a core library?
filekit_base provides the foundational error handling, logging capability, configuration
and the explicit `Context` used by every file operation.
Keeping them apart from the file backends prevents circular dependencies and lets the
backends share one error vocabulary.
*/

pub mod config;
pub mod context;
pub mod error;
mod error_tests;
pub mod logging;
pub mod tracing;

// Re-export commonly used types for convenience
pub use config::{FilekitConfig, load_config};
pub use context::Context;
pub use error::{ErrorKind, FilekitError, FilekitResult, ResultExt};
pub use logging::{
    ChangeLevel, ChangeLogEntry, ChangeLogger, LoggerHandle, RecordingLogger, TracingLogger,
};
