use std::fmt;
use std::path::Path;
use std::sync::{Arc, Weak};

use tracing::instrument;

use filekit_base::{Context, FilekitError, FilekitResult};

use crate::back_reference::BackReference;
use crate::directory::{Directory, DirectoryHandle, ListDirectoryOptions};
use crate::file::FileHandle;
use crate::path::base_name;

/// Derived directory operations shared by all backends.
pub struct DirectoryBase {
    parent: BackReference<dyn Directory>,
}

impl fmt::Debug for DirectoryBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectoryBase")
            .field("bound", &self.parent.is_bound())
            .finish()
    }
}

impl Default for DirectoryBase {
    fn default() -> Self {
        Self::new()
    }
}

/// Relative path of a listed entry below `root`, as a single segment for joining.
fn relative_segment(root: &Path, listed: &str) -> FilekitResult<String> {
    Path::new(listed)
        .strip_prefix(root)
        .map(|relative| relative.to_string_lossy().into_owned())
        .map_err(|_| filekit_base::err!("Listed path '{}' is not below '{}'", listed, root.display()))
}

fn absolute_listing(options: &ListDirectoryOptions) -> ListDirectoryOptions {
    ListDirectoryOptions {
        return_relative_paths: false,
        ..options.clone()
    }
}

impl DirectoryBase {
    pub fn new() -> Self {
        Self {
            parent: BackReference::unbound(),
        }
    }

    pub fn bound_to(parent: Weak<dyn Directory>) -> Self {
        Self {
            parent: BackReference::bound(parent),
        }
    }

    pub fn set_parent(&self, parent: Weak<dyn Directory>) -> FilekitResult<()> {
        self.parent.bind(parent)
    }

    pub fn parent(&self) -> FilekitResult<Arc<dyn Directory>> {
        self.parent.get()
    }

    /// Creates an empty file below this directory, including missing directories.
    #[instrument(skip(self, ctx))]
    pub fn create_file_in_directory(
        &self,
        ctx: &Context,
        segments: &[&str],
    ) -> FilekitResult<FileHandle> {
        let file = self.parent()?.file_in_directory(segments)?;
        file.base().ensure_parent_directory_exists(ctx)?;
        file.create(ctx)?;
        Ok(file)
    }

    pub fn create_subdirectory(&self, ctx: &Context, name: &str) -> FilekitResult<DirectoryHandle> {
        if name.is_empty() {
            return Err(FilekitError::invalid_argument("directory name is empty"));
        }
        let subdirectory = self.parent()?.subdirectory(&[name])?;
        subdirectory.create(ctx)?;
        Ok(subdirectory)
    }

    pub fn file_in_directory_exists(&self, ctx: &Context, segments: &[&str]) -> FilekitResult<bool> {
        self.parent()?.file_in_directory(segments)?.exists(ctx)
    }

    pub fn subdirectory_exists(&self, ctx: &Context, segments: &[&str]) -> FilekitResult<bool> {
        self.parent()?.subdirectory(segments)?.exists(ctx)
    }

    /// Handles to the files selected by `options`, in listing order.
    pub fn list_files(
        &self,
        ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<FileHandle>> {
        let directory = self.parent()?;
        let root = directory.path()?;
        directory
            .list_file_paths(ctx, &absolute_listing(options))?
            .iter()
            .map(|listed| {
                let relative = relative_segment(&root, listed)?;
                directory.file_in_directory(&[relative.as_str()])
            })
            .collect()
    }

    /// Handles to the subdirectories selected by `options`, in listing order.
    pub fn list_subdirectories(
        &self,
        ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<DirectoryHandle>> {
        let directory = self.parent()?;
        let root = directory.path()?;
        directory
            .list_subdirectory_paths(ctx, &absolute_listing(options))?
            .iter()
            .map(|listed| {
                let relative = relative_segment(&root, listed)?;
                directory.subdirectory(&[relative.as_str()])
            })
            .collect()
    }

    /// Writes `content` to a file below this directory, creating missing directories.
    pub fn write_string_to_file_in_directory(
        &self,
        ctx: &Context,
        content: &str,
        segments: &[&str],
    ) -> FilekitResult<FileHandle> {
        let file = self.parent()?.file_in_directory(segments)?;
        file.base().ensure_parent_directory_exists(ctx)?;
        file.base().write_string(ctx, content)?;
        Ok(file)
    }

    pub fn read_file_in_directory_as_string(
        &self,
        ctx: &Context,
        segments: &[&str],
    ) -> FilekitResult<String> {
        self.parent()?
            .file_in_directory(segments)?
            .base()
            .read_as_string(ctx)
    }

    /// True if the directory has neither files nor subdirectories.
    pub fn is_empty_directory(&self, ctx: &Context) -> FilekitResult<bool> {
        let directory = self.parent()?;
        let direct_children = ListDirectoryOptions {
            non_recursive: true,
            ..ListDirectoryOptions::default()
        };
        Ok(directory.list_file_paths(ctx, &direct_children)?.is_empty()
            && directory
                .list_subdirectory_paths(ctx, &direct_children)?
                .is_empty())
    }

    pub fn base_name(&self) -> FilekitResult<String> {
        base_name(&self.parent()?.path()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filekit_base::ErrorKind;

    #[test]
    fn test_unbound_base_reports_parent_not_set() {
        let ctx = Context::default();
        let base = DirectoryBase::new();
        let err = base.is_empty_directory(&ctx).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParentNotSet));
        let err = base.file_in_directory_exists(&ctx, &["a"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ParentNotSet));
    }

    #[test]
    fn test_relative_segment() {
        assert_eq!(
            relative_segment(Path::new("/r"), "/r/a/b.txt").unwrap(),
            "a/b.txt"
        );
        assert!(relative_segment(Path::new("/r"), "/other/b.txt").is_err());
    }
}
