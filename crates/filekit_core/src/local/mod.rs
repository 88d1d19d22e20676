/* 📖 # How does the local backend work?

The local backend implements the file and directory primitives with direct calls into
the operating system: `std::fs` for content and metadata, `walkdir` for listings and
`nix` for ownership lookups and changes.

Operations that ask for elevated privileges cannot be performed in-process, so they are
run as commands through the configured privilege escalation wrapper (`sudo chmod ...`)
using the local command executor.
*/

mod directory;
mod file;

use std::fs;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

use nix::unistd::{Gid, Group, Uid, User};
use tracing::debug;

use filekit_base::{Context, FilekitError, FilekitResult};

use crate::change_summary::ChangeSummary;
use crate::executor::{CommandExecutor, LocalCommandExecutor, RunCommandOptions};
use crate::file::{ChmodOptions, ChownOptions};

pub use directory::LocalDirectory;
pub use file::LocalFile;

/// Metadata of `path`, or `None` if nothing exists there.
///
/// A missing path component or a file where a directory is expected counts as absent,
/// the same way `test -e` treats it.
fn metadata_if_exists(path: &Path) -> FilekitResult<Option<fs::Metadata>> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(Some(metadata)),
        Err(e)
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::NotADirectory
            ) =>
        {
            Ok(None)
        }
        Err(e) => Err(FilekitError::file_error(path, e)),
    }
}

fn metadata(path: &Path) -> FilekitResult<fs::Metadata> {
    fs::metadata(path).map_err(|e| FilekitError::file_error(path, e))
}

/// Runs `command` through the privilege escalation wrapper.
fn run_privileged(ctx: &Context, command: Vec<String>) -> FilekitResult<()> {
    let command = ctx.config().wrap_privileged(true, command);
    debug!(command = ?command, "running privileged command");
    LocalCommandExecutor.run_command(ctx, &RunCommandOptions::new(command))?;
    Ok(())
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn permission_bits(metadata: &fs::Metadata) -> u32 {
    metadata.permissions().mode() & 0o7777
}

fn chmod_path(ctx: &Context, path: &Path, options: &ChmodOptions) -> FilekitResult<ChangeSummary> {
    options.validate()?;
    let current = permission_bits(&metadata(path)?);
    if current == options.mode {
        ctx.log_info(format!(
            "'{}' already has mode {:o}",
            path.display(),
            options.mode
        ));
        return Ok(ChangeSummary::unchanged());
    }

    if options.use_sudo {
        run_privileged(
            ctx,
            vec![
                "chmod".to_string(),
                format!("{:o}", options.mode),
                path_arg(path),
            ],
        )?;
    } else {
        fs::set_permissions(path, fs::Permissions::from_mode(options.mode))
            .map_err(|e| FilekitError::file_error(path, e))?;
    }
    ctx.log_changed(format!(
        "Changed mode of '{}' from {:o} to {:o}",
        path.display(),
        current,
        options.mode
    ));
    Ok(ChangeSummary::changed())
}

fn lookup_uid(user: &str) -> FilekitResult<Uid> {
    User::from_name(user)
        .map_err(|e| filekit_base::err!("Failed to look up user '{}': {}", user, e))?
        .map(|user| user.uid)
        .ok_or_else(|| FilekitError::invalid_argument(format!("unknown user '{}'", user)))
}

fn lookup_gid(group: &str) -> FilekitResult<Gid> {
    Group::from_name(group)
        .map_err(|e| filekit_base::err!("Failed to look up group '{}': {}", group, e))?
        .map(|group| group.gid)
        .ok_or_else(|| FilekitError::invalid_argument(format!("unknown group '{}'", group)))
}

fn chown_path(ctx: &Context, path: &Path, options: &ChownOptions) -> FilekitResult<ChangeSummary> {
    options.validate()?;
    let uid = lookup_uid(&options.user)?;
    let gid = options.group.as_deref().map(lookup_gid).transpose()?;

    let metadata = metadata(path)?;
    let owner_matches = Uid::from_raw(metadata.uid()) == uid;
    let group_matches = gid.is_none_or(|gid| Gid::from_raw(metadata.gid()) == gid);
    if owner_matches && group_matches {
        ctx.log_info(format!(
            "'{}' is already owned by {}",
            path.display(),
            options.owner_spec()
        ));
        return Ok(ChangeSummary::unchanged());
    }

    if options.use_sudo {
        run_privileged(
            ctx,
            vec!["chown".to_string(), options.owner_spec(), path_arg(path)],
        )?;
    } else {
        nix::unistd::chown(path, Some(uid), gid)
            .map_err(|e| FilekitError::file_error(path, std::io::Error::from(e)))?;
    }
    ctx.log_changed(format!(
        "Changed owner of '{}' to {}",
        path.display(),
        options.owner_spec()
    ));
    Ok(ChangeSummary::changed())
}
