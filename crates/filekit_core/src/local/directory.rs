use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use tracing::{debug, instrument};
use walkdir::WalkDir;

use filekit_base::{Context, FilekitError, FilekitResult};

use crate::change_summary::ChangeSummary;
use crate::directory::{Directory, DirectoryHandle, ListDirectoryOptions};
use crate::directory_base::DirectoryBase;
use crate::executor::LOCALHOST;
use crate::file::{ChmodOptions, ChownOptions, FileHandle};
use crate::path::{PathSlot, get_absolute_path, join_below};

use super::{LocalFile, chmod_path, chown_path, metadata_if_exists};

/// Directory on the local filesystem.
#[derive(Debug)]
pub struct LocalDirectory {
    path: PathSlot,
    base: DirectoryBase,
}

impl LocalDirectory {
    /// A handle to `path`, resolved against the current working directory.
    pub fn new(path: impl AsRef<Path>) -> FilekitResult<Arc<Self>> {
        let directory = Self::without_path();
        directory.set_path(path.as_ref())?;
        Ok(directory)
    }

    pub fn without_path() -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let parent: Weak<dyn Directory> = weak.clone();
            Self {
                path: PathSlot::new(),
                base: DirectoryBase::bound_to(parent),
            }
        })
    }

    /// Entries below the directory whose file type passes `keep`.
    fn walk(
        &self,
        options: &ListDirectoryOptions,
        keep: fn(&fs::FileType) -> bool,
    ) -> FilekitResult<Vec<String>> {
        let root = self.path()?;
        let mut walker = WalkDir::new(&root).min_depth(1);
        if options.non_recursive {
            walker = walker.max_depth(1);
        }
        debug!(root = %root.display(), non_recursive = options.non_recursive, "walking directory");

        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(root.as_path()).to_path_buf();
                match e.into_io_error() {
                    Some(io_error) => FilekitError::file_error(path, io_error),
                    None => filekit_base::err!("Failed to walk '{}'", path.display()),
                }
            })?;
            if keep(&entry.file_type()) {
                paths.push(entry.into_path());
            }
        }
        options.filter_and_sort(&root, paths)
    }
}

impl Directory for LocalDirectory {
    fn base(&self) -> &DirectoryBase {
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
        Ok(metadata_if_exists(&path)?.is_some_and(|metadata| metadata.is_dir()))
    }

    #[instrument(skip(self, ctx))]
    fn create(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        if self.exists(ctx)? {
            ctx.log_info(format!("Directory '{}' already exists", path.display()));
            return Ok(ChangeSummary::unchanged());
        }
        fs::create_dir_all(&path).map_err(|e| FilekitError::file_error(&path, e))?;
        ctx.log_changed(format!("Created directory '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    #[instrument(skip(self, ctx))]
    fn delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.path()?;
        match metadata_if_exists(&path)? {
            None => {
                ctx.log_info(format!("Directory '{}' already absent", path.display()));
                return Ok(ChangeSummary::unchanged());
            }
            Some(metadata) if !metadata.is_dir() => {
                filekit_base::bail!("Refusing to delete '{}': not a directory", path.display());
            }
            Some(_) => {}
        }
        fs::remove_dir_all(&path).map_err(|e| FilekitError::file_error(&path, e))?;
        ctx.log_changed(format!("Deleted directory '{}'", path.display()));
        Ok(ChangeSummary::changed())
    }

    fn file_in_directory(&self, segments: &[&str]) -> FilekitResult<FileHandle> {
        let file: FileHandle = LocalFile::new(join_below(&self.path()?, segments)?)?;
        Ok(file)
    }

    fn subdirectory(&self, segments: &[&str]) -> FilekitResult<DirectoryHandle> {
        let directory: DirectoryHandle = LocalDirectory::new(join_below(&self.path()?, segments)?)?;
        Ok(directory)
    }

    fn parent_directory(&self) -> FilekitResult<DirectoryHandle> {
        let path = self.path()?;
        let parent = path
            .parent()
            .ok_or_else(|| filekit_base::err!("'{}' has no parent directory", path.display()))?;
        let directory: DirectoryHandle = LocalDirectory::new(parent)?;
        Ok(directory)
    }

    fn list_file_paths(
        &self,
        _ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<String>> {
        self.walk(options, fs::FileType::is_file)
    }

    fn list_subdirectory_paths(
        &self,
        _ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<String>> {
        self.walk(options, fs::FileType::is_dir)
    }

    fn chmod(&self, ctx: &Context, options: &ChmodOptions) -> FilekitResult<ChangeSummary> {
        chmod_path(ctx, &self.path()?, options)
    }

    fn chown(&self, ctx: &Context, options: &ChownOptions) -> FilekitResult<ChangeSummary> {
        chown_path(ctx, &self.path()?, options)
    }
}
