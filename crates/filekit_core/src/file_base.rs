use std::fmt;
use std::sync::{Arc, Weak};

use chrono::NaiveDateTime;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use filekit_base::{Context, ErrorKind, FilekitError, FilekitResult, ResultExt};

use crate::back_reference::BackReference;
use crate::change_summary::ChangeSummary;
use crate::file::File;
use crate::filename_date::date_from_file_name;
use crate::mime::{MIME_PGP_ENCRYPTED, SNIFF_LEN, sniff_mime_type};
use crate::path::base_name;
use crate::text_blocks::{sort_text_blocks, text_blocks};

/// Derived file operations shared by all backends.
///
/// Every operation here is built on the primitives of the [`File`] the base is bound
/// to. Backends embed a `FileBase` and bind it to themselves when they are constructed.
pub struct FileBase {
    parent: BackReference<dyn File>,
}

impl fmt::Debug for FileBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileBase")
            .field("bound", &self.parent.is_bound())
            .finish()
    }
}

impl Default for FileBase {
    fn default() -> Self {
        Self::new()
    }
}

fn require_non_empty(value: &str, name: &str) -> FilekitResult<()> {
    if value.is_empty() {
        return Err(FilekitError::invalid_argument(format!("{} is empty", name)));
    }
    Ok(())
}

fn require_single_line(value: &str, name: &str) -> FilekitResult<()> {
    if value.contains('\n') {
        return Err(FilekitError::invalid_argument(format!(
            "{} must not contain a line break",
            name
        )));
    }
    Ok(())
}

/// Renders lines newline terminated; no lines render as an empty file.
fn render_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut rendered = String::new();
    for line in lines {
        rendered.push_str(line.as_ref());
        rendered.push('\n');
    }
    rendered
}

impl FileBase {
    /// An unbound base; every derived operation fails with `ParentNotSet` until bound.
    pub fn new() -> Self {
        Self {
            parent: BackReference::unbound(),
        }
    }

    /// A base bound to `parent`, for use inside `Arc::new_cyclic`.
    pub fn bound_to(parent: Weak<dyn File>) -> Self {
        Self {
            parent: BackReference::bound(parent),
        }
    }

    /// Binds the base; fails if it is already bound.
    pub fn set_parent(&self, parent: Weak<dyn File>) -> FilekitResult<()> {
        self.parent.bind(parent)
    }

    pub fn parent(&self) -> FilekitResult<Arc<dyn File>> {
        self.parent.get()
    }

    pub fn read_as_string(&self, ctx: &Context) -> FilekitResult<String> {
        let file = self.parent()?;
        let bytes = file.read_as_bytes(ctx)?;
        String::from_utf8(bytes).map_err(|e| {
            filekit_base::err!(
                "Content of '{}' is not valid UTF-8: {}",
                file.path().map(|p| p.display().to_string()).unwrap_or_default(),
                e
            )
        })
    }

    pub fn write_string(&self, ctx: &Context, content: &str) -> FilekitResult<()> {
        self.parent()?.write_bytes(ctx, content.as_bytes())
    }

    pub fn read_as_lines(&self, ctx: &Context) -> FilekitResult<Vec<String>> {
        Ok(self
            .read_as_string(ctx)?
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Writes `lines`, each terminated by a line break.
    pub fn write_lines<S: AsRef<str>>(&self, ctx: &Context, lines: &[S]) -> FilekitResult<()> {
        self.write_string(ctx, &render_lines(lines))
    }

    /// The first line without its line break; empty for an empty file.
    pub fn read_first_line(&self, ctx: &Context) -> FilekitResult<String> {
        Ok(self
            .read_as_string(ctx)?
            .lines()
            .next()
            .unwrap_or_default()
            .to_string())
    }

    /// Appends `content` to the file, creating it if missing.
    pub fn append_string(&self, ctx: &Context, content: &str) -> FilekitResult<ChangeSummary> {
        require_non_empty(content, "content")?;
        let file = self.parent()?;
        let path = file.path()?;
        let mut new_content = if file.exists(ctx)? {
            self.read_as_string(ctx)?
        } else {
            String::new()
        };
        new_content.push_str(content);
        self.write_string(ctx, &new_content)?;
        ctx.log_changed(format!("Appended {} bytes to '{}'", content.len(), path.display()));
        Ok(ChangeSummary::changed())
    }

    /// Appends `line` on a line of its own, creating the file if missing.
    pub fn append_line(&self, ctx: &Context, line: &str) -> FilekitResult<ChangeSummary> {
        require_single_line(line, "line")?;
        let file = self.parent()?;
        let mut content = if file.exists(ctx)? {
            self.read_as_string(ctx)?
        } else {
            String::new()
        };
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(line);
        content.push('\n');
        self.write_string(ctx, &content)?;
        ctx.log_changed(format!("Appended line to '{}'", file.path()?.display()));
        Ok(ChangeSummary::changed())
    }

    /// True if the file exists and one of its lines equals `line`.
    pub fn contains_line(&self, ctx: &Context, line: &str) -> FilekitResult<bool> {
        require_single_line(line, "line")?;
        if !self.parent()?.exists(ctx)? {
            return Ok(false);
        }
        Ok(self.read_as_lines(ctx)?.iter().any(|l| l == line))
    }

    pub fn is_empty_file(&self, ctx: &Context) -> FilekitResult<bool> {
        Ok(self.parent()?.size_bytes(ctx)? == 0)
    }

    pub fn number_of_lines(&self, ctx: &Context) -> FilekitResult<usize> {
        Ok(self.read_as_lines(ctx)?.len())
    }

    pub fn number_of_non_empty_lines(&self, ctx: &Context) -> FilekitResult<usize> {
        Ok(self
            .read_as_lines(ctx)?
            .iter()
            .filter(|line| !line.trim().is_empty())
            .count())
    }

    #[instrument(skip(self, ctx))]
    pub fn ensure_ends_with_line_break(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let file = self.parent()?;
        let path = file.path()?;

        if !file.exists(ctx)? {
            debug!("file is missing, creating it");
            file.create(ctx)?;
        }
        let content = file.read_as_bytes(ctx)?;
        let changed = content.last() != Some(&b'\n');
        if changed {
            let mut new_content = content;
            new_content.push(b'\n');
            file.write_bytes(ctx, &new_content)?;
        }

        ctx.log_outcome(
            changed,
            format!("Added line break at end of '{}'", path.display()),
            format!("'{}' already ends with a line break", path.display()),
        );
        Ok(ChangeSummary::from_changed(changed))
    }

    #[instrument(skip(self, ctx))]
    pub fn ensure_line_in_file(&self, ctx: &Context, line: &str) -> FilekitResult<ChangeSummary> {
        require_non_empty(line, "line")?;
        require_single_line(line, "line")?;
        let file = self.parent()?;
        let path = file.path()?;

        if !file.exists(ctx)? {
            file.create(ctx)?;
        }
        let mut content = self.read_as_string(ctx)?;
        let present = content.lines().any(|l| l == line);
        if !present {
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(line);
            content.push('\n');
            self.write_string(ctx, &content)?;
        }

        ctx.log_outcome(
            !present,
            format!("Added line '{}' to '{}'", line, path.display()),
            format!("Line '{}' already in '{}'", line, path.display()),
        );
        Ok(ChangeSummary::from_changed(!present))
    }

    /// Replaces every line that directly follows a line equal to `find`.
    ///
    /// If `find` is the last line, `replacement` is appended. Lines already equal to
    /// `replacement` are not counted as changes.
    #[instrument(skip(self, ctx))]
    pub fn replace_line_after_line(
        &self,
        ctx: &Context,
        find: &str,
        replacement: &str,
    ) -> FilekitResult<ChangeSummary> {
        require_non_empty(find, "line to find")?;
        require_single_line(replacement, "replacement")?;
        let path = self.parent()?.path()?;

        let original = self.read_as_lines(ctx)?;
        let mut updated = Vec::with_capacity(original.len() + 1);
        let mut replacements = 0;
        for (index, line) in original.iter().enumerate() {
            let follows_find = index > 0 && original[index - 1] == find;
            if follows_find {
                if line != replacement {
                    replacements += 1;
                }
                updated.push(replacement.to_string());
            } else {
                updated.push(line.clone());
            }
        }
        if original.last().map(String::as_str) == Some(find) {
            replacements += 1;
            updated.push(replacement.to_string());
        }

        let summary = ChangeSummary::new(replacements);
        if summary.is_changed() {
            self.write_lines(ctx, &updated)?;
        }
        ctx.log_outcome(
            summary.is_changed(),
            format!(
                "Replaced {} line(s) after '{}' in '{}'",
                replacements,
                find,
                path.display()
            ),
            format!("No line after '{}' to replace in '{}'", find, path.display()),
        );
        Ok(summary)
    }

    #[instrument(skip(self, ctx))]
    pub fn remove_lines_with_prefix(
        &self,
        ctx: &Context,
        prefix: &str,
    ) -> FilekitResult<ChangeSummary> {
        require_non_empty(prefix, "prefix")?;
        let path = self.parent()?.path()?;

        let lines = self.read_as_lines(ctx)?;
        let original_count = lines.len();
        let kept: Vec<String> = lines
            .into_iter()
            .filter(|line| !line.starts_with(prefix))
            .collect();
        let removed = original_count - kept.len();

        let summary = ChangeSummary::new(removed);
        if summary.is_changed() {
            self.write_lines(ctx, &kept)?;
        }
        ctx.log_outcome(
            summary.is_changed(),
            format!(
                "Removed {} line(s) starting with '{}' from '{}'",
                removed,
                prefix,
                path.display()
            ),
            format!("No lines starting with '{}' in '{}'", prefix, path.display()),
        );
        Ok(summary)
    }

    pub fn trim_spaces_at_beginning_of_file(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.parent()?.path()?;
        let content = self.read_as_string(ctx)?;
        let trimmed = content.trim_start();
        let changed = trimmed.len() != content.len();
        if changed {
            self.write_string(ctx, trimmed)?;
        }
        ctx.log_outcome(
            changed,
            format!("Trimmed leading whitespace of '{}'", path.display()),
            format!("'{}' has no leading whitespace", path.display()),
        );
        Ok(ChangeSummary::from_changed(changed))
    }

    pub fn text_blocks(&self, ctx: &Context) -> FilekitResult<Vec<String>> {
        Ok(text_blocks(&self.read_as_string(ctx)?))
    }

    /// Sorts the text blocks of the file; rewrites only if the order changed.
    #[instrument(skip(self, ctx))]
    pub fn sort_blocks_in_file(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        let path = self.parent()?.path()?;
        let content = self.read_as_string(ctx)?;
        let sorted = sort_text_blocks(&content);
        let changed = sorted != content;
        if changed {
            self.write_string(ctx, &sorted)?;
        }
        ctx.log_outcome(
            changed,
            format!("Sorted blocks in '{}'", path.display()),
            format!("Blocks in '{}' already sorted", path.display()),
        );
        Ok(ChangeSummary::from_changed(changed))
    }

    /// Lowercase hex encoded SHA-256 of the file content.
    pub fn sha256_sum(&self, ctx: &Context) -> FilekitResult<String> {
        let content = self.parent()?.read_as_bytes(ctx)?;
        let mut hasher = Sha256::new();
        hasher.update(&content);
        Ok(hex::encode(hasher.finalize()))
    }

    pub fn is_matching_sha256_sum(&self, ctx: &Context, expected: &str) -> FilekitResult<bool> {
        require_non_empty(expected, "expected checksum")?;
        Ok(self.sha256_sum(ctx)?.eq_ignore_ascii_case(expected.trim()))
    }

    /// Compares content with `other`, which may live on another backend.
    pub fn is_content_equal_by_sha256(&self, ctx: &Context, other: &dyn File) -> FilekitResult<bool> {
        Ok(self.sha256_sum(ctx)? == other.base().sha256_sum(ctx)?)
    }

    pub fn mime_type(&self, ctx: &Context) -> FilekitResult<String> {
        let head = self.parent()?.read_first_bytes(ctx, SNIFF_LEN)?;
        Ok(sniff_mime_type(&head))
    }

    /// True if the content sniffs as OpenPGP, or the `file` utility reports gpg/pgp.
    pub fn is_pgp_encrypted(&self, ctx: &Context) -> FilekitResult<bool> {
        if self.mime_type(ctx)? == MIME_PGP_ENCRYPTED {
            return Ok(true);
        }
        let description = self
            .parent()?
            .file_type_description(ctx)
            .context("Failed to determine file type")?
            .to_lowercase();
        Ok(description.contains("gpg") || description.contains("pgp"))
    }

    /// Creation date encoded in the base name; fails with `NoDateInFileName` if no known
    /// naming scheme yields a valid date.
    pub fn creation_date_by_file_name(&self) -> FilekitResult<NaiveDateTime> {
        let file_name = self.base_name()?;
        date_from_file_name(&file_name)?.ok_or_else(|| {
            Box::new(FilekitError::new(ErrorKind::NoDateInFileName { file_name }))
        })
    }

    pub fn base_name(&self) -> FilekitResult<String> {
        base_name(&self.parent()?.path()?)
    }

    pub fn ensure_parent_directory_exists(&self, ctx: &Context) -> FilekitResult<ChangeSummary> {
        self.parent()?.parent_directory()?.create(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbound_base_reports_parent_not_set() {
        let ctx = Context::default();
        let base = FileBase::new();
        for result in [
            base.read_as_string(&ctx).map(|_| ()),
            base.ensure_ends_with_line_break(&ctx).map(|_| ()),
            base.mime_type(&ctx).map(|_| ()),
            base.base_name().map(|_| ()),
        ] {
            assert!(matches!(result.unwrap_err().kind(), ErrorKind::ParentNotSet));
        }
    }

    #[test]
    fn test_preconditions_checked_before_parent() {
        let ctx = Context::default();
        let base = FileBase::new();
        let err = base.ensure_line_in_file(&ctx, "").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        let err = base.remove_lines_with_prefix(&ctx, "").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
        let err = base.replace_line_after_line(&ctx, "a", "b\nc").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidArgument { .. }));
    }

    #[test]
    fn test_render_lines() {
        assert_eq!(render_lines::<&str>(&[]), "");
        assert_eq!(render_lines(&["a", "", "b"]), "a\n\nb\n");
    }

    #[test]
    fn test_debug_shows_binding() {
        assert_eq!(format!("{:?}", FileBase::new()), "FileBase { bound: false }");
    }
}
