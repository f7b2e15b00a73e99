use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use super::MANAGED_HEADER;
use crate::error::ArtifactError;

/// What currently occupies the well-known supervisor config location.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkState {
    Missing,
    /// A symlink resolving to the generated primary config.
    Active,
    /// A symlink pointing somewhere else.
    OtherLink(PathBuf),
    /// A regular file carrying the managed-by header.
    ManagedFile,
    ForeignFile,
    Directory,
}

impl LinkState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Missing => "missing",
            LinkState::Active => "active",
            LinkState::OtherLink(_) => "other-link",
            LinkState::ManagedFile => "managed-file",
            LinkState::ForeignFile => "foreign-file",
            LinkState::Directory => "directory",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LinkOutcome {
    Created,
    AlreadyActive,
    /// Replaced a symlink or a file generated by this tool.
    Replaced,
    /// Replaced a foreign config after copying it to `backup`.
    BackedUp { backup: PathBuf },
}

impl LinkOutcome {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkOutcome::Created => "created",
            LinkOutcome::AlreadyActive => "already-active",
            LinkOutcome::Replaced => "replaced",
            LinkOutcome::BackedUp { .. } => "backed-up",
        }
    }
}

#[must_use]
pub fn backup_path(link: &Path) -> PathBuf {
    let mut name = link.file_name().unwrap_or_default().to_os_string();
    name.push(".ossmount.bak");
    link.with_file_name(name)
}

pub fn inspect(primary: &Path, link: &Path) -> Result<LinkState> {
    let meta = match fs::symlink_metadata(link) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(LinkState::Missing),
        Err(err) => return Err(err).with_context(|| format!("failed to stat {}", link.display())),
    };
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        let target =
            fs::read_link(link).with_context(|| format!("failed to read link {}", link.display()))?;
        let resolved = if target.is_absolute() {
            target.clone()
        } else {
            link.parent().unwrap_or(Path::new("/")).join(&target)
        };
        if same_file(&resolved, primary) {
            return Ok(LinkState::Active);
        }
        return Ok(LinkState::OtherLink(target));
    }
    if file_type.is_dir() {
        return Ok(LinkState::Directory);
    }
    let contents = fs::read(link).with_context(|| format!("failed to read {}", link.display()))?;
    if contents.starts_with(MANAGED_HEADER.as_bytes()) {
        Ok(LinkState::ManagedFile)
    } else {
        Ok(LinkState::ForeignFile)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Points `link` at `primary`.
///
/// Symlinks and files generated by this tool are replaced. A foreign config is
/// refused with [`ArtifactError::ForeignConfig`] unless `force` is set, in
/// which case it is copied to [`backup_path`] first. Directories are always
/// refused.
pub fn activate(primary: &Path, link: &Path, force: bool) -> Result<LinkOutcome> {
    let outcome = match inspect(primary, link)? {
        LinkState::Active => {
            debug!(link = %link.display(), "supervisor config link already active");
            return Ok(LinkOutcome::AlreadyActive);
        }
        LinkState::Directory => {
            return Err(ArtifactError::LinkTargetIsDirectory {
                path: link.display().to_string(),
            }
            .into())
        }
        LinkState::ForeignFile if !force => {
            return Err(ArtifactError::ForeignConfig {
                path: link.display().to_string(),
            }
            .into())
        }
        LinkState::ForeignFile => {
            let backup = backup_path(link);
            fs::copy(link, &backup).with_context(|| {
                format!("failed to back up {} to {}", link.display(), backup.display())
            })?;
            warn!(
                link = %link.display(),
                backup = %backup.display(),
                "replacing supervisor config not generated by ossmount"
            );
            LinkOutcome::BackedUp { backup }
        }
        LinkState::OtherLink(_) | LinkState::ManagedFile => LinkOutcome::Replaced,
        LinkState::Missing => LinkOutcome::Created,
    };

    swap_symlink(primary, link)?;
    info!(
        link = %link.display(),
        primary = %primary.display(),
        result = outcome.as_str(),
        "supervisor config link activated"
    );
    Ok(outcome)
}

/// Creates the link under a temporary name and renames it over `link`, so the
/// location never goes missing.
#[cfg(unix)]
fn swap_symlink(target: &Path, link: &Path) -> Result<()> {
    use std::os::unix::fs::symlink;

    let parent = link.parent().unwrap_or(Path::new("/"));
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
    let mut staged_name = std::ffi::OsString::from(".");
    staged_name.push(link.file_name().unwrap_or_default());
    staged_name.push(".ossmount-link");
    let staged = parent.join(staged_name);
    match fs::remove_file(&staged) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => {
            return Err(err).with_context(|| format!("failed to remove {}", staged.display()))
        }
    }
    symlink(target, &staged).with_context(|| {
        format!(
            "failed to create symlink {} -> {}",
            staged.display(),
            target.display()
        )
    })?;
    fs::rename(&staged, link).with_context(|| {
        format!(
            "failed to move symlink into place at {}",
            link.display()
        )
    })
}

#[cfg(not(unix))]
fn swap_symlink(target: &Path, link: &Path) -> Result<()> {
    anyhow::bail!(
        "symlinking {} -> {} is only supported on unix hosts",
        link.display(),
        target.display()
    )
}
