use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tracing::instrument;

use filekit_base::{Context, FilekitResult};

use crate::change_summary::ChangeSummary;
use crate::directory::{Directory, DirectoryHandle, ListDirectoryOptions};
use crate::directory_base::DirectoryBase;
use crate::executor::ExecutorHandle;
use crate::file::{ChmodOptions, ChownOptions, FileHandle};
use crate::path::{PathSlot, join_below, require_absolute_path};

use super::{
    CommandExecutorFile, chmod_path, chown_path, find_paths, path_arg, run_for_stdout, test_path,
};

/// Directory reached through a command executor.
#[derive(Debug)]
pub struct CommandExecutorDirectory {
    executor: ExecutorHandle,
    path: PathSlot,
    base: DirectoryBase,
}

impl CommandExecutorDirectory {
    /// A handle to the absolute `path` on the executor's host.
    pub fn new(executor: ExecutorHandle, path: impl AsRef<Path>) -> FilekitResult<Arc<Self>> {
        let directory = Self::without_path(executor);
        directory.set_path(path.as_ref())?;
        Ok(directory)
    }

    pub fn without_path(executor: ExecutorHandle) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let parent: Weak<dyn Directory> = weak.clone();
            Self {
                executor,
                path: PathSlot::new(),
                base: DirectoryBase::bound_to(parent),
            }
        })
    }

    pub fn executor(&self) -> &ExecutorHandle {
        &self.executor
    }
}

impl Directory for CommandExecutorDirectory {
    fn base(&self) -> &DirectoryBase {
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
        test_path(ctx, &self.executor, "-d", &self.path()?)
    }

    #[instrument(skip(self, ctx))]
    fn create(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        if self.exists(ctx)? {
            ctx.log_info(format!("Directory '{}' already exists", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        run_for_stdout(
            ctx,
            &self.executor,
            vec!["mkdir".to_string(), "-p".to_string(), path_arg(&path)],
        )?;
        ctx.log_changed(format!("Created directory '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    #[instrument(skip(self, ctx))]
    fn delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        // Never hand a relative path to `rm -rf`.
        let path = require_absolute_path(self.path()?)?;
        if !test_path(ctx, &self.executor, "-e", &path)? {
            ctx.log_info(format!("Directory '{}' already absent", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        if !self.exists(ctx)? {
            filekit_base::bail!("Refusing to delete '{}': not a directory", path.display());
        }
        run_for_stdout(
            ctx,
            &self.executor,
            vec!["rm".to_string(), "-rf".to_string(), path_arg(&path)],
        )?;
        ctx.log_changed(format!("Deleted directory '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    fn file_in_directory(&self, segments: &[&str]) -> FilekitResult<FileHandle> {
        let path = join_below(&self.path()?, segments)?;
        let file: FileHandle = CommandExecutorFile::new(self.executor.clone(), path)?;
        Ok(file)
    }

    fn subdirectory(&self, segments: &[&str]) -> FilekitResult<DirectoryHandle> {
        let path = join_below(&self.path()?, segments)?;
        let directory: DirectoryHandle = CommandExecutorDirectory::new(self.executor.clone(), path)?;
        Ok(directory)
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

    fn list_file_paths(
        &self,
        ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<String>> {
        find_paths(ctx, &self.executor, &self.path()?, "f", options)
    }

    fn list_subdirectory_paths(
        &self,
        ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<String>> {
        find_paths(ctx, &self.executor, &self.path()?, "d", options)
    }

    fn chmod(&self, ctx: &Context, options: &ChmodOptions) -> FilekitResult<ChangeSummary> {
        chmod_path(ctx, &self.executor, &self.path()?, options)
    }

    fn chown(&self, ctx: &Context, options: &ChownOptions) -> FilekitResult<ChangeSummary> {
        chown_path(ctx, &self.executor, &self.path()?, options)
    }
}
