/* 📖 # Why use a separate file for these error tests?

The debug rendering includes span traces which contain source locations.

Keeping the rendering tests out of the main error module keeps error.rs focused on the
type itself, and lets these tests set up a tracing subscriber without affecting others.
*/

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::{FilekitError, FilekitResult, ResultExt};
    use expect_test::expect;
    use std::error::Error;
    use std::io;
    use std::path::PathBuf;
    use tracing::span;
    use tracing_error::ErrorLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    // 📖 # Why set up a subscriber in the test?
    // SpanTrace::capture() requires an active tracing subscriber with an ErrorLayer.
    // `try_init()` tolerates other tests having installed the subscriber already.
    fn setup_tracing_subscriber() {
        let _ = tracing_subscriber::registry()
            .with(ErrorLayer::default())
            .try_init();
    }

    #[test]
    fn test_error_from_file_error() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let path = PathBuf::from("test.txt");
        let error = FilekitError::file_error(&path, io_err);

        match error.kind() {
            ErrorKind::FileError { path: p, .. } => {
                assert_eq!(p, &path);
            }
            _ => panic!("Expected FileError variant"),
        }
        assert!(error.is_not_found());
    }

    #[test]
    fn test_permission_denied_is_not_not_found() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let error = FilekitError::file_error("/etc/shadow", io_err);
        assert!(!error.is_not_found());
    }

    #[test]
    fn test_error_context_attachment() {
        let error = FilekitError::message("original error")
            .context("first context")
            .context("second context");

        assert_eq!(error.get_context().len(), 2);
        assert_eq!(error.get_context()[0], "first context");
        assert_eq!(error.get_context()[1], "second context");
    }

    #[test]
    fn test_error_with_context_lazy_evaluation() {
        let mut called = false;
        let error = FilekitError::message("error").with_context(|| {
            called = true;
            "lazy context".to_string()
        });

        assert!(called);
        assert_eq!(error.get_context()[0], "lazy context");
    }

    #[test]
    fn test_error_display_with_multiple_contexts() {
        let error = FilekitError::message("root error")
            .context("first")
            .context("second");
        assert_eq!(error.to_string(), "first: second: root error");
    }

    #[test]
    fn test_error_display_command_failed() {
        let error = FilekitError::new(ErrorKind::CommandFailed {
            command: "cat /missing".to_string(),
            exit_code: 1,
            stderr: "cat: /missing: No such file or directory\n".to_string(),
        });
        assert_eq!(
            error.to_string(),
            "Command 'cat /missing' failed with exit code 1: cat: /missing: No such file or directory"
        );
    }

    #[test]
    fn test_error_display_state_errors() {
        assert_eq!(
            FilekitError::new(ErrorKind::ParentNotSet).to_string(),
            "Parent not set"
        );
        assert_eq!(
            FilekitError::new(ErrorKind::NotAbsolutePath {
                path: PathBuf::from("relative/file")
            })
            .to_string(),
            "Path 'relative/file' is not absolute"
        );
    }

    #[test]
    fn test_error_source_file_error() {
        let io_err = io::Error::new(io::ErrorKind::PermissionDenied, "access denied");
        let error = FilekitError::file_error("test.txt", io_err);
        assert!(error.source().is_some());
        assert_eq!(error.root_cause().to_string(), "access denied");
    }

    #[test]
    fn test_error_source_is_cause() {
        let error = FilekitError::message("outer").caused_by(FilekitError::message("inner"));
        assert_eq!(error.source().map(|e| e.to_string()), Some("inner".to_string()));
        assert_eq!(error.root_cause().to_string(), "inner");
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: FilekitResult<i32> = Err(Box::new(FilekitError::message("root")));
        let err = result
            .context("step 1")
            .with_context(|| "step 2".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "step 1: step 2: root");
    }

    #[test]
    fn test_err_and_bail_macros() {
        fn failing(name: &str) -> FilekitResult<()> {
            crate::bail!("cannot handle '{}'", name);
        }
        let err = failing("x").unwrap_err();
        assert_eq!(err.to_string(), "cannot handle 'x'");

        let err: Box<FilekitError> = crate::err!("{} + {}", 1, 2);
        assert_eq!(err.to_string(), "1 + 2");
    }

    #[test]
    fn test_debug_tree_without_spans() {
        let inner = FilekitError::message("inner error").context("inner context");
        let outer = FilekitError::message("outer error")
            .context("outer context")
            .caused_by(inner);

        expect![[r#"
            outer error
            ├─ outer context
            └─ cause: inner error
               └─ inner context

        "#]]
        .assert_debug_eq(&outer);
    }

    #[test]
    fn test_debug_includes_span_trace() {
        setup_tracing_subscriber();

        let operation_span = span!(tracing::Level::DEBUG, "ensure_line_in_file", path = "/tmp/x");
        let _guard = operation_span.enter();

        let error = FilekitError::message("write failed").context("while appending");
        let rendered = format!("{:?}", error);

        assert!(rendered.starts_with("write failed\n└─ while appending\n"));
        assert!(rendered.contains("Trace:"));
        assert!(rendered.contains("ensure_line_in_file"));
    }
}
