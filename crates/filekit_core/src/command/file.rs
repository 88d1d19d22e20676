use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tracing::instrument;

use filekit_base::{Context, FilekitResult};

use crate::change_summary::ChangeSummary;
use crate::directory::DirectoryHandle;
use crate::executor::{ExecutorHandle, RunCommandOptions};
use crate::file::{ChmodOptions, ChownOptions, File, FileHandle};
use crate::file_base::FileBase;
use crate::path::{PathSlot, require_absolute_path};

use super::{
    CommandExecutorDirectory, access_permissions, chmod_path, chown_path, path_arg, run,
    run_for_stdout, size_bytes, test_path, write_via_shell,
};

/// File reached through a command executor.
#[derive(Debug)]
pub struct CommandExecutorFile {
    executor: ExecutorHandle,
    path: PathSlot,
    base: FileBase,
}

impl CommandExecutorFile {
    /// A handle to the absolute `path` on the executor's host.
    pub fn new(executor: ExecutorHandle, path: impl AsRef<Path>) -> FilekitResult<Arc<Self>> {
        let file = Self::without_path(executor);
        file.set_path(path.as_ref())?;
        Ok(file)
    }

    pub fn without_path(executor: ExecutorHandle) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let parent: Weak<dyn File> = weak.clone();
            Self {
                executor,
                path: PathSlot::new(),
                base: FileBase::bound_to(parent),
            }
        })
    }

    pub fn executor(&self) -> &ExecutorHandle {
        &self.executor
    }

    fn run_on_path(&self, ctx: &Context, program: &str, args: &[String]) -> FilekitResult<String> {
        let mut command = vec![program.to_string()];
        command.extend(args.iter().cloned());
        command.push(path_arg(&self.path()?));
        run_for_stdout(ctx, &self.executor, command)
    }
}

impl File for CommandExecutorFile {
    fn base(&self) -> &FileBase {
        &self.base
    }

    fn path(&self) -> FilekitResult<PathBuf> {
        self.path.get()
    }

    fn set_path(&self, path: &Path) -> FilekitResult<()> {
        self.path.set(path.to_path_buf())
    }

    fn host_description(&self) -> FilekitResult<String> {
        self.executor.host_description()
    }

    fn exists(&self, ctx: &Context) -> FilekitResult<bool> {
        test_path(ctx, &self.executor, "-f", &self.path()?)
    }

    #[instrument(skip(self, ctx))]
    fn create(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        if self.exists(ctx)? {
            ctx.log_info(format!("File '{}' already exists", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        self.run_on_path(ctx, "touch", &[])?;
        ctx.log_changed(format!("Created file '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    #[instrument(skip(self, ctx))]
    fn delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        if !test_path(ctx, &self.executor, "-e", &path)? {
            ctx.log_info(format!("File '{}' already absent", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        self.run_on_path(ctx, "rm", &["-f".to_string()])?;
        ctx.log_changed(format!("Deleted file '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    fn read_as_bytes(&self, ctx: &Context) -> FilekitResult<Vec<u8>> {
        let command = vec!["cat".to_string(), path_arg(&self.path()?)];
        Ok(run(ctx, &self.executor, RunCommandOptions::new(command))?.stdout)
    }

    fn read_first_bytes(&self, ctx: &Context, count: usize) -> FilekitResult<Vec<u8>> {
        let command = vec![
            "head".to_string(),
            "-c".to_string(),
            count.to_string(),
            path_arg(&self.path()?),
        ];
        Ok(run(ctx, &self.executor, RunCommandOptions::new(command))?.stdout)
    }

    #[instrument(skip(self, ctx, content), fields(len = content.len()))]
    fn write_bytes(&self, ctx: &Context, content: &[u8]) -> FilekitResult<()> {
        write_via_shell(ctx, &self.executor, &self.path()?, content)
    }

    fn size_bytes(&self, ctx: &Context) -> FilekitResult<u64> {
        size_bytes(ctx, &self.executor, &self.path()?)
    }

    #[instrument(skip(self, ctx))]
    fn truncate(&self, ctx: &Context, size: u64) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        let current = self.size_bytes(ctx)?;
        if current == size {
            ctx.log_info(format!("'{}' already has {} bytes", path.display(), size));
            return Ok(ChangeSummary::unchanged());
        }
        self.run_on_path(ctx, "truncate", &["-s".to_string(), size.to_string()])?;
        ctx.log_changed(format!(
            "Truncated '{}' from {} to {} bytes",
            path.display(),
            current,
            size
        ));
        Ok(ChangeSummary::changed())
    }

    fn access_permissions(&self, ctx: &Context) -> FilekitResult<u32> {
        access_permissions(ctx, &self.executor, &self.path()?)
    }

    fn chmod(&self, ctx: &Context, options: &ChmodOptions) -> FilekitResult<ChangeSummary> {
        chmod_path(ctx, &self.executor, &self.path()?, options)
    }

    fn chown(&self, ctx: &Context, options: &ChownOptions) -> FilekitResult<ChangeSummary> {
        chown_path(ctx, &self.executor, &self.path()?, options)
    }

    #[instrument(skip(self, ctx))]
    fn move_to_path(
        &self,
        ctx: &Context,
        destination: &Path,
        use_sudo: bool,
    ) -> FilekitResult<FileHandle> {
        let source = self.path()?;
        let destination = require_absolute_path(destination)?;
        let command = ctx.config().wrap_privileged(
            use_sudo,
            vec!["mv".to_string(), path_arg(&source), path_arg(&destination)],
        );
        run(ctx, &self.executor, RunCommandOptions::new(command))?;
        ctx.log_changed(format!(
            "Moved '{}' to '{}'",
            source.display(),
            destination.display()
        ));
        let moved: FileHandle = CommandExecutorFile::new(self.executor.clone(), &destination)?;
        Ok(moved)
    }

    #[instrument(skip(self, ctx))]
    fn securely_delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = require_absolute_path(self.path()?)?;
        if !self.exists(ctx)? {
            ctx.log_info(format!("File '{}' already absent", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        let passes = ctx.config().secure_delete_passes.to_string();
        self.run_on_path(ctx, "shred", &["-u".to_string(), "-n".to_string(), passes])?;
        ctx.log_changed(format!("Securely deleted '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    fn parent_directory(&self) -> FilekitResult<DirectoryHandle> {
        let path = self.path()?;
        let parent = path
            .parent()
            .ok_or_else(|| filekit_base::err!("'{}' has no parent directory", path.display()))?;
        let directory: DirectoryHandle =
            CommandExecutorDirectory::new(self.executor.clone(), parent)?;
        Ok(directory)
    }

    fn file_type_description(&self, ctx: &Context) -> FilekitResult<String> {
        let file_command = ctx.config().file_command.clone();
        Ok(self
            .run_on_path(ctx, &file_command, &["-b".to_string()])?
            .trim()
            .to_string())
    }
}
