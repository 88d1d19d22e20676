use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tracing::{debug, instrument};

use filekit_base::{Context, FilekitError, FilekitResult};

use crate::change_summary::ChangeSummary;
use crate::directory::DirectoryHandle;
use crate::executor::{CommandExecutor, LOCALHOST, LocalCommandExecutor, RunCommandOptions};
use crate::file::{ChmodOptions, ChownOptions, File, FileHandle};
use crate::file_base::FileBase;
use crate::path::{PathSlot, get_absolute_path, require_absolute_path};

use super::{
    LocalDirectory, chmod_path, chown_path, metadata, metadata_if_exists, path_arg,
    permission_bits, run_privileged,
};

const ZERO_CHUNK: [u8; 64 * 1024] = [0; 64 * 1024];

/// File on the local filesystem.
#[derive(Debug)]
pub struct LocalFile {
    path: PathSlot,
    base: FileBase,
}

impl LocalFile {
    /// A handle to `path`, resolved against the current working directory.
    pub fn new(path: impl AsRef<Path>) -> FilekitResult<Arc<Self>> {
        let file = Self::without_path();
        file.set_path(path.as_ref())?;
        Ok(file)
    }

    /// A handle whose path accessors fail with `PathNotSet` until `set_path` is called.
    pub fn without_path() -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let parent: Weak<dyn File> = weak.clone();
            Self {
                path: PathSlot::new(),
                base: FileBase::bound_to(parent),
            }
        })
    }

    fn overwrite_with_zeros(path: &Path, passes: u32) -> FilekitResult<()> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|e| FilekitError::file_error(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| FilekitError::file_error(path, e))?
            .len();
        for pass in 0..passes {
            debug!(pass, len, "overwriting content");
            file.seek(SeekFrom::Start(0))
                .map_err(|e| FilekitError::file_error(path, e))?;
            let mut remaining = len;
            while remaining > 0 {
                let chunk = remaining.min(ZERO_CHUNK.len() as u64) as usize;
                file.write_all(&ZERO_CHUNK[..chunk])
                    .map_err(|e| FilekitError::file_error(path, e))?;
                remaining -= chunk as u64;
            }
            file.sync_all()
                .map_err(|e| FilekitError::file_error(path, e))?;
        }
        Ok(())
    }
}

impl File for LocalFile {
    fn base(&self) -> &FileBase {
        &self.base
    }

    fn path(&self) -> FilekitResult<PathBuf> {
        self.path.get()
    }

    fn set_path(&self, path: &Path) -> FilekitResult<()> {
        self.path.set(get_absolute_path(path)?)
    }

    fn host_description(&self) -> FilekitResult<String> {
        Ok(LOCALHOST.to_string())
    }

    fn exists(&self, _ctx: &Context) -> FilekitResult<bool> {
        let path = self.path()?;
        Ok(metadata_if_exists(&path)?.is_some_and(|metadata| metadata.is_file()))
    }

    #[instrument(skip(self, ctx))]
    fn create(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        if self.exists(ctx)? {
            ctx.log_info(format!("File '{}' already exists", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| FilekitError::file_error(&path, e))?;
        ctx.log_changed(format!("Created file '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    #[instrument(skip(self, ctx))]
    fn delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        if metadata_if_exists(&path)?.is_none() {
            ctx.log_info(format!("File '{}' already absent", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        fs::remove_file(&path).map_err(|e| FilekitError::file_error(&path, e))?;
        ctx.log_changed(format!("Deleted file '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    fn read_as_bytes(&self, _ctx: &Context) -> FilekitResult<Vec<u8>> {
        let path = self.path()?;
        fs::read(&path).map_err(|e| FilekitError::file_error(&path, e))
    }

    fn read_first_bytes(&self, _ctx: &Context, count: usize) -> FilekitResult<Vec<u8>> {
        let path = self.path()?;
        let file = fs::File::open(&path).map_err(|e| FilekitError::file_error(&path, e))?;
        let mut head = Vec::with_capacity(count);
        file.take(count as u64)
            .read_to_end(&mut head)
            .map_err(|e| FilekitError::file_error(&path, e))?;
        Ok(head)
    }

    #[instrument(skip(self, _ctx, content), fields(len = content.len()))]
    fn write_bytes(&self, _ctx: &Context, content: &[u8]) -> FilekitResult<()> {
        let path = self.path()?;
        debug!(path = %path.display(), "writing file");
        fs::write(&path, content).map_err(|e| FilekitError::file_error(&path, e))
    }

    fn size_bytes(&self, _ctx: &Context) -> FilekitResult<u64> {
        Ok(metadata(&self.path()?)?.len())
    }

    #[instrument(skip(self, ctx))]
    fn truncate(&self, ctx: &Context, size: u64) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        let current = self.size_bytes(ctx)?;
        if current == size {
            ctx.log_info(format!("'{}' already has {} bytes", path.display(), size));
            return Ok(ChangeSummary::unchanged());
        }
        let file = fs::OpenOptions::new()
            .write(true)
            .open(&path)
            .map_err(|e| FilekitError::file_error(&path, e))?;
        file.set_len(size)
            .map_err(|e| FilekitError::file_error(&path, e))?;
        ctx.log_changed(format!(
            "Truncated '{}' from {} to {} bytes",
            path.display(),
            current,
            size
        ));
        Ok(ChangeSummary::changed())
    }

    fn access_permissions(&self, _ctx: &Context) -> FilekitResult<u32> {
        Ok(permission_bits(&metadata(&self.path()?)?))
    }

    fn chmod(&self, ctx: &Context, options: &ChmodOptions) -> FilekitResult<ChangeSummary> {
        chmod_path(ctx, &self.path()?, options)
    }

    fn chown(&self, ctx: &Context, options: &ChownOptions) -> FilekitResult<ChangeSummary> {
        chown_path(ctx, &self.path()?, options)
    }

    #[instrument(skip(self, ctx))]
    fn move_to_path(
        &self,
        ctx: &Context,
        destination: &Path,
        use_sudo: bool,
    ) -> FilekitResult<FileHandle> {
        let source = self.path()?;
        let destination = get_absolute_path(destination)?;
        if use_sudo {
            run_privileged(
                ctx,
                vec!["mv".to_string(), path_arg(&source), path_arg(&destination)],
            )?;
        } else {
            fs::rename(&source, &destination)
                .map_err(|e| FilekitError::file_error(&source, e))?;
        }
        ctx.log_changed(format!(
            "Moved '{}' to '{}'",
            source.display(),
            destination.display()
        ));
        let moved: FileHandle = LocalFile::new(&destination)?;
        Ok(moved)
    }

    #[instrument(skip(self, ctx))]
    fn securely_delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = require_absolute_path(self.path()?)?;
        if !self.exists(ctx)? {
            ctx.log_info(format!("File '{}' already absent", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        Self::overwrite_with_zeros(&path, ctx.config().secure_delete_passes)?;
        fs::remove_file(&path).map_err(|e| FilekitError::file_error(&path, e))?;
        ctx.log_changed(format!("Securely deleted '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    fn parent_directory(&self) -> FilekitResult<DirectoryHandle> {
        let path = self.path()?;
        let parent = path
            .parent()
            .ok_or_else(|| filekit_base::err!("'{}' has no parent directory", path.display()))?;
        let directory: DirectoryHandle = LocalDirectory::new(parent)?;
        Ok(directory)
    }

    fn file_type_description(&self, ctx: &Context) -> FilekitResult<String> {
        let path = self.path()?;
        let description = LocalCommandExecutor.run_command_and_get_stdout_as_string(
            ctx,
            &RunCommandOptions::new([
                ctx.config().file_command.clone(),
                "-b".to_string(),
                path_arg(&path),
            ]),
        )?;
        Ok(description.trim().to_string())
    }
}
