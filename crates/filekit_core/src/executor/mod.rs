/* 📖 # What is the command executor?

The command executor is the capability the command backend runs its shell helpers
through. Whether a command ends up in a local process, inside a container or on a
remote host behind an ssh hop is decided by the executor implementation alone; the
file and directory logic only builds argument vectors and interprets their output.

`LocalCommandExecutor` is the reference implementation that spawns local processes.
*/

mod local;

use std::sync::Arc;

use filekit_base::{Context, FilekitResult};

pub use local::LocalCommandExecutor;

/// Host description reported by executors running on the local machine.
pub const LOCALHOST: &str = "localhost";

/// Options of a single command invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCommandOptions {
    /// Program followed by its arguments. Not interpreted by a shell.
    pub command: Vec<String>,
    /// Bytes fed to the command's stdin.
    pub stdin: Option<Vec<u8>>,
    /// Do not treat a non-zero exit status as an error.
    pub allow_all_exit_codes: bool,
}

impl RunCommandOptions {
    pub fn new<S: Into<String>>(command: impl IntoIterator<Item = S>) -> Self {
        Self {
            command: command.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_stdin(mut self, stdin: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    pub fn allow_all_exit_codes(mut self) -> Self {
        self.allow_all_exit_codes = true;
        self
    }

    /// The command as a single human readable string, used in messages.
    pub fn joined_command(&self) -> String {
        self.command.join(" ")
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn stdout_as_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Capability running commands on some host.
pub trait CommandExecutor: std::fmt::Debug + Send + Sync + 'static {
    /// Run a command to completion.
    ///
    /// A non-zero exit status is a `CommandFailed` error unless
    /// `options.allow_all_exit_codes` is set.
    fn run_command(&self, ctx: &Context, options: &RunCommandOptions)
    -> FilekitResult<CommandOutput>;

    /// Describes the host commands run on; `"localhost"` for the local machine.
    fn host_description(&self) -> FilekitResult<String>;

    /// Run a command and return its stdout decoded lossily as UTF-8.
    fn run_command_and_get_stdout_as_string(
        &self,
        ctx: &Context,
        options: &RunCommandOptions,
    ) -> FilekitResult<String> {
        Ok(self.run_command(ctx, options)?.stdout_as_string())
    }

    /// Run a command and return the lines of its stdout.
    fn run_command_and_get_stdout_as_lines(
        &self,
        ctx: &Context,
        options: &RunCommandOptions,
    ) -> FilekitResult<Vec<String>> {
        let stdout = self.run_command_and_get_stdout_as_string(ctx, options)?;
        Ok(stdout.lines().map(str::to_string).collect())
    }

    fn is_running_on_localhost(&self) -> FilekitResult<bool> {
        Ok(self.host_description()? == LOCALHOST)
    }
}

/// Handle to an executor implementation, enabling shared ownership.
#[derive(Debug, Clone)]
pub struct ExecutorHandle(Arc<dyn CommandExecutor>);

impl ExecutorHandle {
    pub fn new(executor: impl CommandExecutor) -> Self {
        Self(Arc::new(executor))
    }
}

impl std::ops::Deref for ExecutorHandle {
    type Target = dyn CommandExecutor;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

/// Quotes `value` for a POSIX shell using single quotes.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r#"'"'"'"#))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/tmp/a b"), "'/tmp/a b'");
        assert_eq!(shell_quote("it's"), r#"'it'"'"'s'"#);
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_run_command_options_builder() {
        let options = RunCommandOptions::new(["cat", "/tmp/x"])
            .with_stdin("hello")
            .allow_all_exit_codes();
        assert_eq!(options.command, vec!["cat", "/tmp/x"]);
        assert_eq!(options.stdin.as_deref(), Some(b"hello".as_slice()));
        assert!(options.allow_all_exit_codes);
        assert_eq!(options.joined_command(), "cat /tmp/x");
    }
}
