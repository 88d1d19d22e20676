use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;

use filekit_base::{Context, FilekitError, FilekitResult};

use crate::change_summary::ChangeSummary;
use crate::directory_base::DirectoryBase;
use crate::executor::LOCALHOST;
use crate::file::{ChmodOptions, ChownOptions, FileHandle};

/// Filters and output shape of directory listings, shared by both backends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListDirectoryOptions {
    /// Regexes on the base name; if any are given, at least one must match.
    pub match_base_name_patterns: Vec<String>,
    /// Regexes on the base name; entries matching any of them are dropped.
    pub exclude_base_name_patterns: Vec<String>,
    /// Regexes on the absolute path; entries matching any of them are dropped.
    pub exclude_path_patterns: Vec<String>,
    /// Return paths relative to the listed directory instead of absolute ones.
    pub return_relative_paths: bool,
    /// Only list direct children.
    pub non_recursive: bool,
}

fn compile_patterns(patterns: &[String]) -> FilekitResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| {
                FilekitError::invalid_argument(format!("invalid pattern '{}': {}", pattern, e))
            })
        })
        .collect()
}

impl ListDirectoryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the filters to `paths` found below `root`, sorts the survivors
    /// lexicographically and renders them absolute or relative to `root`.
    pub fn filter_and_sort(&self, root: &Path, paths: Vec<PathBuf>) -> FilekitResult<Vec<String>> {
        let match_base_name = compile_patterns(&self.match_base_name_patterns)?;
        let exclude_base_name = compile_patterns(&self.exclude_base_name_patterns)?;
        let exclude_path = compile_patterns(&self.exclude_path_patterns)?;

        let mut selected: Vec<String> = paths
            .into_iter()
            .filter(|path| path.as_path() != root)
            .filter_map(|path| {
                let base_name = path.file_name()?.to_string_lossy().into_owned();
                let full = path.to_string_lossy().into_owned();
                if !match_base_name.is_empty()
                    && !match_base_name.iter().any(|re| re.is_match(&base_name))
                {
                    return None;
                }
                if exclude_base_name.iter().any(|re| re.is_match(&base_name)) {
                    return None;
                }
                if exclude_path.iter().any(|re| re.is_match(&full)) {
                    return None;
                }
                Some(full)
            })
            .collect();
        selected.sort();

        if !self.return_relative_paths {
            return Ok(selected);
        }
        selected
            .into_iter()
            .map(|full| {
                Path::new(&full)
                    .strip_prefix(root)
                    .map(|relative| relative.to_string_lossy().into_owned())
                    .map_err(|_| {
                        filekit_base::err!(
                            "Listed path '{}' is not below '{}'",
                            full,
                            root.display()
                        )
                    })
            })
            .collect()
    }
}

/// Primitive operations every directory backend implements.
pub trait Directory: std::fmt::Debug + Send + Sync + 'static {
    /// The delegation base providing the derived operations.
    fn base(&self) -> &DirectoryBase;

    fn path(&self) -> FilekitResult<PathBuf>;

    fn set_path(&self, path: &Path) -> FilekitResult<()>;

    fn host_description(&self) -> FilekitResult<String>;

    fn is_running_on_localhost(&self) -> FilekitResult<bool> {
        Ok(self.host_description()? == LOCALHOST)
    }

    /// True if a directory exists at the path. Absence is not an error.
    fn exists(&self, ctx: &Context) -> FilekitResult<bool>;

    /// Create the directory and missing parents unless it already exists.
    fn create(&self, ctx: &Context) -> FilekitResult<ChangeSummary>;

    /// Recursively delete the directory; deleting an absent directory is a no-op.
    fn delete(&self, ctx: &Context) -> FilekitResult<ChangeSummary>;

    /// Handle to a file below this directory; fails if the segments escape it.
    fn file_in_directory(&self, segments: &[&str]) -> FilekitResult<FileHandle>;

    /// Handle to a directory below this directory; fails if the segments escape it.
    fn subdirectory(&self, segments: &[&str]) -> FilekitResult<DirectoryHandle>;

    fn parent_directory(&self) -> FilekitResult<DirectoryHandle>;

    /// Paths of the regular files below this directory.
    fn list_file_paths(
        &self,
        ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<String>>;

    /// Paths of the directories below this directory, excluding the directory itself.
    fn list_subdirectory_paths(
        &self,
        ctx: &Context,
        options: &ListDirectoryOptions,
    ) -> FilekitResult<Vec<String>>;

    fn chmod(&self, ctx: &Context, options: &ChmodOptions) -> FilekitResult<ChangeSummary>;

    fn chown(&self, ctx: &Context, options: &ChownOptions) -> FilekitResult<ChangeSummary>;
}

/// Shared handle to a directory of any backend.
pub type DirectoryHandle = Arc<dyn Directory>;

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(values: &[&str]) -> Vec<PathBuf> {
        values.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_filter_and_sort_absolute() {
        let options = ListDirectoryOptions::new();
        let result = options
            .filter_and_sort(
                Path::new("/r"),
                paths(&["/r/b.txt", "/r/a/c.rs", "/r", "/r/a.txt"]),
            )
            .unwrap();
        assert_eq!(result, vec!["/r/a.txt", "/r/a/c.rs", "/r/b.txt"]);
    }

    #[test]
    fn test_filter_and_sort_relative_with_patterns() {
        let options = ListDirectoryOptions {
            match_base_name_patterns: vec![r"\.rs$".to_string(), r"^README".to_string()],
            exclude_base_name_patterns: vec![r"^skip".to_string()],
            exclude_path_patterns: vec!["/target/".to_string()],
            return_relative_paths: true,
            non_recursive: false,
        };
        let result = options
            .filter_and_sort(
                Path::new("/r"),
                paths(&[
                    "/r/src/main.rs",
                    "/r/README.md",
                    "/r/skip_me.rs",
                    "/r/target/debug/build.rs",
                    "/r/Cargo.toml",
                ]),
            )
            .unwrap();
        assert_eq!(result, vec!["README.md", "src/main.rs"]);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let options = ListDirectoryOptions {
            match_base_name_patterns: vec!["(".to_string()],
            ..ListDirectoryOptions::default()
        };
        let err = options.filter_and_sort(Path::new("/r"), vec![]).unwrap_err();
        assert!(matches!(
            err.kind(),
            filekit_base::ErrorKind::InvalidArgument { .. }
        ));
    }
}
