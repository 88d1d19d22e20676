use std::path::{Component, Path, PathBuf};

use parking_lot::RwLock;

use filekit_base::{ErrorKind, FilekitError, FilekitResult};

/* 📖 # Why resolve paths to absolute immediately?

A relative path is only meaningful together with a working directory, and the working
directory of a process can change at any time. Resolving once, when the path is set,
makes a handle refer to the same file for its whole lifetime.
Resolution is lexical (no symlink lookups), so it also works for paths that do not
exist yet and gives identical results on both backends.
*/

pub fn is_absolute_path(path: impl AsRef<Path>) -> bool {
    path.as_ref().is_absolute()
}

pub fn is_relative_path(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    !path.as_os_str().is_empty() && path.is_relative()
}

/// Lexically normalizes `path`: drops `.` components and resolves `..` against the
/// preceding component. `..` above the root stays at the root.
pub fn clean_path(path: impl AsRef<Path>) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.as_ref().components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let ends_with_normal =
                    matches!(cleaned.components().next_back(), Some(Component::Normal(_)));
                if ends_with_normal {
                    cleaned.pop();
                } else if !cleaned.has_root() {
                    cleaned.push("..");
                }
            }
            other => cleaned.push(other.as_os_str()),
        }
    }
    if cleaned.as_os_str().is_empty() {
        cleaned.push(".");
    }
    cleaned
}

/// Resolves `path` against the current working directory and cleans it.
pub fn get_absolute_path(path: impl AsRef<Path>) -> FilekitResult<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FilekitError::invalid_argument("path is empty"));
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        let cwd = std::env::current_dir().map_err(|e| FilekitError::file_error(path, e))?;
        cwd.join(path)
    };
    let resolved = clean_path(joined);
    if !resolved.is_absolute() {
        return Err(Box::new(FilekitError::new(ErrorKind::NotAbsolutePath {
            path: resolved,
        })));
    }
    Ok(resolved)
}

/// Fails with `NotAbsolutePath` unless `path` is absolute; returns the cleaned path.
pub fn require_absolute_path(path: impl AsRef<Path>) -> FilekitResult<PathBuf> {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return Err(FilekitError::invalid_argument("path is empty"));
    }
    if !path.is_absolute() {
        return Err(Box::new(FilekitError::new(ErrorKind::NotAbsolutePath {
            path: path.to_path_buf(),
        })));
    }
    Ok(clean_path(path))
}

/// Joins `segments` below `parent` and verifies the result is still strictly below it.
///
/// Absolute segments and `..` components that climb out of `parent` are rejected with
/// `PathEscapesParent`.
pub fn join_below(parent: &Path, segments: &[&str]) -> FilekitResult<PathBuf> {
    if segments.is_empty() {
        return Err(FilekitError::invalid_argument("no path segments given"));
    }
    let mut joined = parent.to_path_buf();
    for segment in segments {
        if segment.is_empty() {
            return Err(FilekitError::invalid_argument("empty path segment"));
        }
        joined.push(segment);
    }
    let joined = clean_path(joined);
    if joined == parent || !joined.starts_with(parent) {
        return Err(Box::new(FilekitError::new(ErrorKind::PathEscapesParent {
            parent: parent.to_path_buf(),
            path: joined,
        })));
    }
    Ok(joined)
}

/// Path storage of a file or directory handle.
///
/// Holds nothing until set; once set the stored path is always absolute.
#[derive(Debug, Default)]
pub struct PathSlot(RwLock<Option<PathBuf>>);

impl PathSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `path`, which must already be absolute.
    pub fn set(&self, path: PathBuf) -> FilekitResult<()> {
        let path = require_absolute_path(path)?;
        *self.0.write() = Some(path);
        Ok(())
    }

    pub fn get(&self) -> FilekitResult<PathBuf> {
        let guard = self.0.read();
        let path = guard
            .as_ref()
            .ok_or_else(|| Box::new(FilekitError::new(ErrorKind::PathNotSet)))?;
        if !path.is_absolute() {
            return Err(Box::new(FilekitError::new(ErrorKind::NotAbsolutePath {
                path: path.clone(),
            })));
        }
        Ok(path.clone())
    }
}

/// Returns the final component of `path` as a string.
pub fn base_name(path: &Path) -> FilekitResult<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| filekit_base::err!("Path '{}' has no base name", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(is_absolute_path("/tmp/a"));
        assert!(!is_absolute_path("tmp/a"));
        assert!(is_relative_path("tmp/a"));
        assert!(is_relative_path("."));
        assert!(!is_relative_path(""));
        assert!(!is_relative_path("/"));
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/a/./b/../c"), PathBuf::from("/a/c"));
        assert_eq!(clean_path("/../a"), PathBuf::from("/a"));
        assert_eq!(clean_path("a/../../b"), PathBuf::from("../b"));
        assert_eq!(clean_path("./"), PathBuf::from("."));
        assert_eq!(clean_path("/a/b/"), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_stored_path_stays_stable_after_chdir() {
        use crate::directory::Directory;
        use crate::local::LocalDirectory;

        let original = std::env::current_dir().unwrap();
        let temp_dir = tempfile::TempDir::new().unwrap();

        let dot = LocalDirectory::new(".").unwrap();
        let dot_dot = LocalDirectory::new("..").unwrap();
        let dot_path = dot.path().unwrap().to_string_lossy().into_owned();
        let dot_dot_path = dot_dot.path().unwrap().to_string_lossy().into_owned();
        assert!(Path::new(&dot_path).is_absolute());
        assert!(Path::new(&dot_dot_path).is_absolute());

        std::env::set_current_dir(temp_dir.path()).unwrap();
        let dot_after = dot.path().unwrap().to_string_lossy().into_owned();
        let dot_dot_after = dot_dot.path().unwrap().to_string_lossy().into_owned();
        let fresh_dot = get_absolute_path(".").unwrap();
        std::env::set_current_dir(original).unwrap();

        assert_eq!(dot_path, dot_after);
        assert_eq!(dot_dot_path, dot_dot_after);
        assert_ne!(Path::new(&dot_path), fresh_dot);
    }

    #[test]
    fn test_get_absolute_path_rejects_empty() {
        assert!(get_absolute_path("").is_err());
    }

    #[test]
    fn test_join_below() {
        let parent = Path::new("/srv/data");
        assert_eq!(
            join_below(parent, &["a", "b.txt"]).unwrap(),
            PathBuf::from("/srv/data/a/b.txt")
        );
        assert_eq!(
            join_below(parent, &["a/../b.txt"]).unwrap(),
            PathBuf::from("/srv/data/b.txt")
        );
    }

    #[test]
    fn test_join_below_rejects_traversal() {
        let parent = Path::new("/srv/data");
        for segments in [
            vec![".."],
            vec!["..", "data2"],
            vec!["a", "..", "..", "etc"],
            vec!["/etc/passwd"],
            vec!["."],
        ] {
            let err = join_below(parent, &segments).unwrap_err();
            assert!(
                matches!(err.kind(), ErrorKind::PathEscapesParent { .. }),
                "{:?} should escape",
                segments
            );
        }
    }

    #[test]
    fn test_join_below_sibling_prefix_is_not_below() {
        let err = join_below(Path::new("/srv/data"), &["../database"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::PathEscapesParent { .. }));
    }

    #[test]
    fn test_path_slot() {
        let slot = PathSlot::new();
        assert!(matches!(slot.get().unwrap_err().kind(), ErrorKind::PathNotSet));

        let err = slot.set(PathBuf::from("relative")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotAbsolutePath { .. }));

        slot.set(PathBuf::from("/tmp/./x")).unwrap();
        assert_eq!(slot.get().unwrap(), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/tmp/x.txt")).unwrap(), "x.txt");
        assert!(base_name(Path::new("/")).is_err());
    }
}
