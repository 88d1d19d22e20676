/* 📖 # How does the command backend work?

The command backend implements the same primitives as the local backend, but only
through commands handed to a `CommandExecutor`. It never touches the local filesystem
itself, so the same code works for a local shell, a container or a remote host.

Most helpers are plain argument vectors (`cat <path>`, `stat -c %s <path>`). Only the
existence check and writing need a shell, for `&&`/`||` and the `>` redirection; those
scripts quote every path with single quotes.

Paths are never resolved against a working directory, because the working directory of
the executing host is unknown here. Every path has to be absolute.
*/

mod directory;
mod file;

use std::path::Path;

use tracing::debug;

use filekit_base::{Context, ErrorKind, FilekitError, FilekitResult, ResultExt};

use crate::change_summary::ChangeSummary;
use crate::directory::ListDirectoryOptions;
use crate::executor::{
    CommandExecutor, CommandOutput, ExecutorHandle, RunCommandOptions, shell_quote,
};
use crate::file::{ChmodOptions, ChownOptions};

pub use directory::CommandExecutorDirectory;
pub use file::CommandExecutorFile;

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn unexpected_output(command: impl Into<String>, output: impl Into<String>) -> Box<FilekitError> {
    Box::new(FilekitError::new(ErrorKind::UnexpectedOutput {
        command: command.into(),
        output: output.into(),
    }))
}

/// Runs `options` and attaches the executing host to any error.
fn run(
    ctx: &Context,
    executor: &ExecutorHandle,
    options: RunCommandOptions,
) -> FilekitResult<CommandOutput> {
    debug!(command = %options.joined_command(), "running helper command");
    executor.run_command(ctx, &options).with_context(|| {
        format!(
            "Failed to run '{}' on {}",
            options.joined_command(),
            executor
                .host_description()
                .unwrap_or_else(|_| "unknown host".to_string())
        )
    })
}

fn run_for_stdout(
    ctx: &Context,
    executor: &ExecutorHandle,
    command: Vec<String>,
) -> FilekitResult<String> {
    Ok(run(ctx, executor, RunCommandOptions::new(command))?.stdout_as_string())
}

fn shell_script(ctx: &Context, script: String) -> RunCommandOptions {
    RunCommandOptions::new([ctx.config().shell.clone(), "-c".to_string(), script])
}

/// Runs `test <flag> '<path>'` and maps the `yes`/`no` answer to a bool.
fn test_path(
    ctx: &Context,
    executor: &ExecutorHandle,
    flag: &str,
    path: &Path,
) -> FilekitResult<bool> {
    let script = format!(
        "test {} {} && echo yes || echo no",
        flag,
        shell_quote(&path_arg(path))
    );
    let output = run(ctx, executor, shell_script(ctx, script.clone()))?.stdout_as_string();
    match output.trim_end_matches('\n') {
        "yes" => Ok(true),
        "no" => Ok(false),
        other => Err(unexpected_output(script, other)),
    }
}

fn write_via_shell(
    ctx: &Context,
    executor: &ExecutorHandle,
    path: &Path,
    content: &[u8],
) -> FilekitResult<()> {
    let script = format!("cat > {}", shell_quote(&path_arg(path)));
    run(ctx, executor, shell_script(ctx, script).with_stdin(content))?;
    Ok(())
}

fn stat_format(
    ctx: &Context,
    executor: &ExecutorHandle,
    format: &str,
    path: &Path,
) -> FilekitResult<String> {
    let stdout = run_for_stdout(
        ctx,
        executor,
        vec![
            "stat".to_string(),
            "-c".to_string(),
            format.to_string(),
            path_arg(path),
        ],
    )?;
    Ok(stdout.trim().to_string())
}

fn size_bytes(ctx: &Context, executor: &ExecutorHandle, path: &Path) -> FilekitResult<u64> {
    let output = stat_format(ctx, executor, "%s", path)?;
    output
        .parse()
        .map_err(|_| unexpected_output(format!("stat -c %s {}", path.display()), output))
}

fn access_permissions(ctx: &Context, executor: &ExecutorHandle, path: &Path) -> FilekitResult<u32> {
    let output = stat_format(ctx, executor, "%a", path)?;
    u32::from_str_radix(&output, 8)
        .map_err(|_| unexpected_output(format!("stat -c %a {}", path.display()), output))
}

fn chmod_path(
    ctx: &Context,
    executor: &ExecutorHandle,
    path: &Path,
    options: &ChmodOptions,
) -> FilekitResult<ChangeSummary> {
    options.validate()?;
    let current = access_permissions(ctx, executor, path)?;
    if current == options.mode {
        ctx.log_info(format!(
            "'{}' already has mode {:o}",
            path.display(),
            options.mode
        ));
        return Ok(ChangeSummary::unchanged());
    }
    let command = ctx.config().wrap_privileged(
        options.use_sudo,
        vec![
            "chmod".to_string(),
            format!("{:o}", options.mode),
            path_arg(path),
        ],
    );
    run(ctx, executor, RunCommandOptions::new(command))?;
    ctx.log_changed(format!(
        "Changed mode of '{}' from {:o} to {:o}",
        path.display(),
        current,
        options.mode
    ));
    Ok(ChangeSummary::changed())
}

fn chown_path(
    ctx: &Context,
    executor: &ExecutorHandle,
    path: &Path,
    options: &ChownOptions,
) -> FilekitResult<ChangeSummary> {
    options.validate()?;
    let output = stat_format(ctx, executor, "%U:%G", path)?;
    let (user, group) = output
        .split_once(':')
        .ok_or_else(|| unexpected_output(format!("stat -c %U:%G {}", path.display()), &output))?;
    let owner_matches = user == options.user;
    let group_matches = options.group.as_deref().is_none_or(|wanted| wanted == group);
    if owner_matches && group_matches {
        ctx.log_info(format!(
            "'{}' is already owned by {}",
            path.display(),
            options.owner_spec()
        ));
        return Ok(ChangeSummary::unchanged());
    }
    let command = ctx.config().wrap_privileged(
        options.use_sudo,
        vec!["chown".to_string(), options.owner_spec(), path_arg(path)],
    );
    run(ctx, executor, RunCommandOptions::new(command))?;
    ctx.log_changed(format!(
        "Changed owner of '{}' to {}",
        path.display(),
        options.owner_spec()
    ));
    Ok(ChangeSummary::changed())
}

/// Lists entries of `find -type <kind>` below `root` and applies the listing options.
fn find_paths(
    ctx: &Context,
    executor: &ExecutorHandle,
    root: &Path,
    kind: &str,
    options: &ListDirectoryOptions,
) -> FilekitResult<Vec<String>> {
    let mut command = vec![
        "find".to_string(),
        path_arg(root),
        "-mindepth".to_string(),
        "1".to_string(),
    ];
    if options.non_recursive {
        command.extend(["-maxdepth".to_string(), "1".to_string()]);
    }
    command.extend(["-type".to_string(), kind.to_string()]);

    let found = run_for_stdout(ctx, executor, command)?
        .lines()
        .filter(|line| !line.is_empty())
        .map(std::path::PathBuf::from)
        .collect();
    options.filter_and_sort(root, found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::LOCALHOST;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Executor answering every command with a fixed stdout and recording the commands.
    #[derive(Debug, Clone, Default)]
    struct ScriptedExecutor {
        stdout: String,
        commands: Arc<Mutex<Vec<Vec<String>>>>,
    }

    impl CommandExecutor for ScriptedExecutor {
        fn run_command(
            &self,
            _ctx: &Context,
            options: &RunCommandOptions,
        ) -> FilekitResult<CommandOutput> {
            self.commands.lock().push(options.command.clone());
            Ok(CommandOutput {
                stdout: self.stdout.clone().into_bytes(),
                ..CommandOutput::default()
            })
        }

        fn host_description(&self) -> FilekitResult<String> {
            Ok(LOCALHOST.to_string())
        }
    }

    fn scripted(stdout: &str) -> (ScriptedExecutor, ExecutorHandle) {
        let executor = ScriptedExecutor {
            stdout: stdout.to_string(),
            ..ScriptedExecutor::default()
        };
        (executor.clone(), ExecutorHandle::new(executor))
    }

    #[test]
    fn test_test_path_protocol() {
        let ctx = Context::default();
        let (recorder, executor) = scripted("yes\n");
        assert!(test_path(&ctx, &executor, "-d", Path::new("/tmp/a b")).unwrap());
        assert_eq!(
            recorder.commands.lock()[0],
            vec!["sh", "-c", "test -d '/tmp/a b' && echo yes || echo no"]
        );

        let (_, executor) = scripted("no\n");
        assert!(!test_path(&ctx, &executor, "-f", Path::new("/tmp/x")).unwrap());
    }

    #[test]
    fn test_test_path_rejects_other_output() {
        let ctx = Context::default();
        let (_, executor) = scripted("maybe\n");
        let err = test_path(&ctx, &executor, "-f", Path::new("/tmp/x")).unwrap_err();
        match err.kind() {
            ErrorKind::UnexpectedOutput { output, .. } => assert_eq!(output, "maybe"),
            other => panic!("unexpected error kind {:?}", other),
        }
    }

    #[test]
    fn test_chmod_uses_privilege_wrapper() {
        let ctx = Context::default();
        let (recorder, executor) = scripted("644\n");
        let options = ChmodOptions {
            mode: 0o600,
            use_sudo: true,
        };
        let summary = chmod_path(&ctx, &executor, Path::new("/etc/x"), &options).unwrap();
        assert!(summary.is_changed());
        let commands = recorder.commands.lock();
        assert_eq!(commands[0], vec!["stat", "-c", "%a", "/etc/x"]);
        assert_eq!(commands[1], vec!["sudo", "chmod", "600", "/etc/x"]);
    }

    #[test]
    fn test_chmod_same_mode_runs_no_command() {
        let ctx = Context::default();
        let (recorder, executor) = scripted("600\n");
        let summary =
            chmod_path(&ctx, &executor, Path::new("/etc/x"), &ChmodOptions::new(0o600)).unwrap();
        assert!(!summary.is_changed());
        assert_eq!(recorder.commands.lock().len(), 1);
    }

    #[test]
    fn test_chown_compares_owner_and_group() {
        let ctx = Context::default();
        let (recorder, executor) = scripted("alice:staff\n");
        let path = Path::new("/srv/x");

        let summary = chown_path(&ctx, &executor, path, &ChownOptions::new("alice")).unwrap();
        assert!(!summary.is_changed());

        let options = ChownOptions::new("alice").with_group("wheel");
        let summary = chown_path(&ctx, &executor, path, &options).unwrap();
        assert!(summary.is_changed());
        assert_eq!(
            recorder.commands.lock().last().unwrap(),
            &vec!["chown", "alice:wheel", "/srv/x"]
        );
    }

    #[test]
    fn test_find_paths_non_recursive() {
        let ctx = Context::default();
        let (recorder, executor) = scripted("/r/b\n/r/a\n");
        let options = ListDirectoryOptions {
            non_recursive: true,
            return_relative_paths: true,
            ..ListDirectoryOptions::default()
        };
        let paths = find_paths(&ctx, &executor, Path::new("/r"), "d", &options).unwrap();
        assert_eq!(paths, vec!["a", "b"]);
        assert_eq!(
            recorder.commands.lock()[0],
            vec!["find", "/r", "-mindepth", "1", "-maxdepth", "1", "-type", "d"]
        );
    }
}
