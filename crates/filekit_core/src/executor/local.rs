use std::io::Write;
use std::process::{Command, Stdio};

use tracing::{debug, instrument};

use filekit_base::{Context, ErrorKind, FilekitError, FilekitResult};

use super::{CommandExecutor, CommandOutput, LOCALHOST, RunCommandOptions};

/// Executor spawning commands as local child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalCommandExecutor;

impl LocalCommandExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for LocalCommandExecutor {
    #[instrument(skip(self, _ctx, options), fields(command = %options.joined_command()))]
    fn run_command(
        &self,
        _ctx: &Context,
        options: &RunCommandOptions,
    ) -> FilekitResult<CommandOutput> {
        let (program, args) = options
            .command
            .split_first()
            .ok_or_else(|| FilekitError::invalid_argument("command is empty"))?;

        let mut command = Command::new(program);
        command
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(if options.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            });

        debug!("spawning command");
        let mut child = command.spawn().map_err(|e| {
            debug!(error = %e, "failed to spawn command");
            FilekitError::file_error(program, e)
        })?;

        // Feed stdin from a separate thread so a command filling its stdout pipe
        // cannot deadlock against us writing its input.
        let writer = match (child.stdin.take(), options.stdin.clone()) {
            (Some(mut stdin), Some(input)) => Some(std::thread::spawn(move || {
                let result = stdin.write_all(&input);
                drop(stdin);
                result
            })),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .map_err(|e| FilekitError::file_error(program, e))?;

        if let Some(writer) = writer {
            let write_result = writer
                .join()
                .map_err(|_| filekit_base::err!("stdin writer thread panicked"))?;
            // A command may legitimately exit before consuming all input.
            if let Err(e) = write_result {
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    return Err(FilekitError::file_error(program, e));
                }
            }
        }

        let result = CommandOutput {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.status.code().unwrap_or(-1),
        };
        debug!(exit_code = result.exit_code, "command finished");

        if !result.is_success() && !options.allow_all_exit_codes {
            return Err(Box::new(FilekitError::new(ErrorKind::CommandFailed {
                command: options.joined_command(),
                exit_code: result.exit_code,
                stderr: String::from_utf8_lossy(&result.stderr).into_owned(),
            })));
        }
        Ok(result)
    }

    fn host_description(&self) -> FilekitResult<String> {
        Ok(LOCALHOST.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_command_captures_stdout() {
        let ctx = Context::default();
        let output = LocalCommandExecutor
            .run_command(&ctx, &RunCommandOptions::new(["echo", "hello"]))
            .unwrap();
        assert_eq!(output.stdout_as_string(), "hello\n");
        assert_eq!(output.exit_code, 0);
    }

    #[test]
    fn test_run_command_feeds_stdin() {
        let ctx = Context::default();
        let stdout = LocalCommandExecutor
            .run_command_and_get_stdout_as_string(
                &ctx,
                &RunCommandOptions::new(["cat"]).with_stdin("line 1\nline 2\n"),
            )
            .unwrap();
        assert_eq!(stdout, "line 1\nline 2\n");
    }

    #[test]
    fn test_run_command_as_lines() {
        let ctx = Context::default();
        let lines = LocalCommandExecutor
            .run_command_and_get_stdout_as_lines(
                &ctx,
                &RunCommandOptions::new(["printf", "a\\nb\\n"]),
            )
            .unwrap();
        assert_eq!(lines, vec!["a", "b"]);
    }

    #[test]
    fn test_non_zero_exit_is_error_unless_allowed() {
        let ctx = Context::default();
        let err = LocalCommandExecutor
            .run_command(&ctx, &RunCommandOptions::new(["sh", "-c", "echo oops >&2; exit 3"]))
            .unwrap_err();
        match err.kind() {
            ErrorKind::CommandFailed {
                exit_code, stderr, ..
            } => {
                assert_eq!(*exit_code, 3);
                assert_eq!(stderr, "oops\n");
            }
            other => panic!("unexpected error kind {:?}", other),
        }

        let output = LocalCommandExecutor
            .run_command(
                &ctx,
                &RunCommandOptions::new(["sh", "-c", "exit 3"]).allow_all_exit_codes(),
            )
            .unwrap();
        assert_eq!(output.exit_code, 3);
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let ctx = Context::default();
        let err = LocalCommandExecutor
            .run_command(&ctx, &RunCommandOptions::default())
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_is_localhost() {
        assert!(LocalCommandExecutor.is_running_on_localhost().unwrap());
    }
}
