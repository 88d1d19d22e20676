use std::path::{Path, PathBuf};
use std::sync::Arc;

use filekit_base::{Context, FilekitError, FilekitResult};

use crate::change_summary::ChangeSummary;
use crate::directory::DirectoryHandle;
use crate::executor::LOCALHOST;
use crate::file_base::FileBase;

/* 📖 # Why split a file into primitives and a delegation base?

The `File` trait only contains the operations that genuinely differ between the local
filesystem and a shell reached through a command executor: existence checks, reading,
writing, permissions and so on. Everything that can be expressed in terms of these
primitives (line editing, block sorting, checksums, MIME sniffing) lives once in
`FileBase`, which every backend embeds and binds to itself at construction.

This keeps the two backends small and makes behavioral parity a property of the shared
code rather than something each backend has to get right on its own.
*/

/// Permission change request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChmodOptions {
    /// Permission bits, e.g. `0o640`.
    pub mode: u32,
    /// Run through the configured privilege escalation command.
    pub use_sudo: bool,
}

impl ChmodOptions {
    pub fn new(mode: u32) -> Self {
        Self {
            mode,
            use_sudo: false,
        }
    }

    pub(crate) fn validate(&self) -> FilekitResult<()> {
        if self.mode > 0o7777 {
            return Err(FilekitError::invalid_argument(format!(
                "mode {:o} is not a valid permission mode",
                self.mode
            )));
        }
        Ok(())
    }
}

/// Ownership change request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChownOptions {
    pub user: String,
    /// Group to set; the group is left untouched if `None`.
    pub group: Option<String>,
    pub use_sudo: bool,
}

impl ChownOptions {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: None,
            use_sudo: false,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub(crate) fn validate(&self) -> FilekitResult<()> {
        if self.user.is_empty() {
            return Err(FilekitError::invalid_argument("user is empty"));
        }
        if self.group.as_deref() == Some("") {
            return Err(FilekitError::invalid_argument("group is empty"));
        }
        // Owners are compared by name, so numeric ids cannot be matched.
        for name in std::iter::once(self.user.as_str()).chain(self.group.as_deref()) {
            if name.bytes().all(|b| b.is_ascii_digit()) {
                return Err(FilekitError::invalid_argument(format!(
                    "numeric owner '{}' is not supported, use a name",
                    name
                )));
            }
        }
        Ok(())
    }

    /// The `user[:group]` argument understood by `chown`.
    pub fn owner_spec(&self) -> String {
        match &self.group {
            Some(group) => format!("{}:{}", self.user, group),
            None => self.user.clone(),
        }
    }
}

/// Primitive operations every file backend implements.
pub trait File: std::fmt::Debug + Send + Sync + 'static {
    /// The delegation base providing the derived operations.
    fn base(&self) -> &FileBase;

    /// The absolute path of the file.
    fn path(&self) -> FilekitResult<PathBuf>;

    /// Replace the stored path.
    fn set_path(&self, path: &Path) -> FilekitResult<()>;

    fn host_description(&self) -> FilekitResult<String>;

    fn is_running_on_localhost(&self) -> FilekitResult<bool> {
        Ok(self.host_description()? == LOCALHOST)
    }

    /// True if a regular file exists at the path. Absence is not an error.
    fn exists(&self, ctx: &Context) -> FilekitResult<bool>;

    /// Create an empty file unless it already exists.
    fn create(&self, ctx: &Context) -> FilekitResult<ChangeSummary>;

    /// Delete the file; deleting an absent file is a no-op.
    fn delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary>;

    fn read_as_bytes(&self, ctx: &Context) -> FilekitResult<Vec<u8>>;

    /// Read at most `count` bytes from the start of the file.
    fn read_first_bytes(&self, ctx: &Context, count: usize) -> FilekitResult<Vec<u8>>;

    /// Replace the whole content of the file, creating it if needed.
    fn write_bytes(&self, ctx: &Context, content: &[u8]) -> FilekitResult<()>;

    fn size_bytes(&self, ctx: &Context) -> FilekitResult<u64>;

    /// Truncate or extend the file to exactly `size` bytes.
    fn truncate(&self, ctx: &Context, size: u64) -> FilekitResult<ChangeSummary>;

    /// Permission bits of the file (`0o7777` mask).
    fn access_permissions(&self, ctx: &Context) -> FilekitResult<u32>;

    fn chmod(&self, ctx: &Context, options: &ChmodOptions) -> FilekitResult<ChangeSummary>;

    fn chown(&self, ctx: &Context, options: &ChownOptions) -> FilekitResult<ChangeSummary>;

    /// Move the file and return a handle to the new location.
    fn move_to_path(
        &self,
        ctx: &Context,
        destination: &Path,
        use_sudo: bool,
    ) -> FilekitResult<FileHandle>;

    /// Overwrite the content before removing the file. No-op if absent.
    fn securely_delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary>;

    fn parent_directory(&self) -> FilekitResult<DirectoryHandle>;

    /// The description printed by the `file` utility for this file.
    fn file_type_description(&self, ctx: &Context) -> FilekitResult<String>;
}

/// Shared handle to a file of any backend.
pub type FileHandle = Arc<dyn File>;
