use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic
- Each failure class of the file API (state, precondition, backend, protocol) gets
  its own variant that callers can match on
 */

/// Error variants that can occur in filekit operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A shell command exited unsuccessfully
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    /// A shell helper produced output outside of its fixed vocabulary
    UnexpectedOutput { command: String, output: String },

    /// A required argument was missing or empty
    InvalidArgument { message: String },

    /// A delegation base was used before its backend was bound
    ParentNotSet,

    /// A path accessor was used before a path was stored
    PathNotSet,

    /// A path was expected to be absolute
    NotAbsolutePath { path: PathBuf },

    /// Joining segments below a parent resolved to a path outside of it
    PathEscapesParent { parent: PathBuf, path: PathBuf },

    /// None of the known file name date patterns applied
    NoDateInFileName { file_name: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::CommandFailed {
                command,
                exit_code,
                stderr,
            } => {
                write!(f, "Command '{}' failed with exit code {}", command, exit_code)?;
                if !stderr.trim().is_empty() {
                    write!(f, ": {}", stderr.trim())?;
                }
                Ok(())
            }
            ErrorKind::UnexpectedOutput { command, output } => {
                write!(f, "Unexpected output '{}' from command '{}'", output, command)
            }
            ErrorKind::InvalidArgument { message } => write!(f, "Invalid argument: {}", message),
            ErrorKind::ParentNotSet => write!(f, "Parent not set"),
            ErrorKind::PathNotSet => write!(f, "Path not set"),
            ErrorKind::NotAbsolutePath { path } => {
                write!(f, "Path '{}' is not absolute", path.display())
            }
            ErrorKind::PathEscapesParent { parent, path } => write!(
                f,
                "Path '{}' is not below parent '{}'",
                path.display(),
                parent.display()
            ),
            ErrorKind::NoDateInFileName { file_name } => {
                write!(f, "No creation date found in file name '{}'", file_name)
            }
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and FilekitError?
This two-layer design provides a clear separation of concerns:
- ErrorKind: structural variants with specific contexts (file paths, commands, etc.)
- FilekitError: wraps ErrorKind with context strings, an optional cause and a span trace

Callers pattern match on ErrorKind for specific handling (e.g. `ParentNotSet`), while
propagation attaches human readable context without nesting strings.
*/

/// Comprehensive error type wrapping ErrorKind with optional context and cause.
///
/// A [`SpanTrace`] is captured when the error is created, so the active tracing spans
/// (e.g. the `#[instrument]`ed file operation) show up in the debug output.
pub struct FilekitError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<FilekitError>>,
    span_trace: SpanTrace,
}

impl FilekitError {
    /// Creates a new error from an ErrorKind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a message error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a boxed file error for an io failure at `path`.
    pub fn file_error(path: impl AsRef<Path>, source: std::io::Error) -> Box<Self> {
        Box::new(Self::new(ErrorKind::FileError {
            path: path.as_ref().to_path_buf(),
            source,
        }))
    }

    /// Creates a boxed precondition error.
    pub fn invalid_argument(message: impl Into<String>) -> Box<Self> {
        Box::new(Self::new(ErrorKind::InvalidArgument {
            message: message.into(),
        }))
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records `cause` as the error that led to this one.
    pub fn caused_by(mut self, cause: FilekitError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the context strings in the order they were attached.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the error that caused this one, if any.
    pub fn cause(&self) -> Option<&FilekitError> {
        self.cause.as_deref()
    }

    /// Returns true if the error (or the io error it wraps) signals a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(&self.kind, ErrorKind::FileError { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        let item_count = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i + 1 == item_count { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, ctx)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "{}└─ cause: ", indent)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for FilekitError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for FilekitError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => self.cause.as_deref().map(|c| c as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for FilekitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for FilekitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<FilekitError> in the result type?

Boxing the error reduces the size of the result type, making it more efficient to return in the common case.
The span trace and context vector would otherwise bloat every `Ok` value.
*/

/// Standard result type for filekit operations.
pub type FilekitResult<T> = std::result::Result<T, Box<FilekitError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> FilekitResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> FilekitResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for FilekitResult<T> {
    fn context(self, context: impl Into<String>) -> FilekitResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> FilekitResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Builds a boxed message error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::FilekitError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed message error built from a format string.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
