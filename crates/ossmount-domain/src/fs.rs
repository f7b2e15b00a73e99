use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Mode for the credential store.
pub const OWNER_READ_WRITE: u32 = 0o600;
/// Mode for generated mount scripts.
pub const OWNER_EXECUTABLE: u32 = 0o700;
/// Mode for supervisor configs and the mount manifest.
pub const SHARED_READ: u32 = 0o644;

/// Replaces `path` with `contents` by staging a sibling temp file and renaming
/// it into place, so readers see either the old or the new bytes.
pub fn write_atomic(path: &Path, contents: &[u8], mode: u32) -> Result<()> {
    let parent = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;

    let mut staged = tempfile::Builder::new()
        .prefix(".ossmount-")
        .suffix(".tmp")
        .tempfile_in(parent)
        .with_context(|| format!("failed to stage write for {}", path.display()))?;
    staged
        .write_all(contents)
        .with_context(|| format!("failed to write {}", path.display()))?;
    staged
        .as_file()
        .sync_all()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    set_mode(staged.path(), mode)?;
    staged
        .persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("failed to replace {}", path.display()))?;
    // rename keeps the staged mode, but re-apply in case umask or ACLs interfered
    set_mode(path, mode)?;
    Ok(())
}

/// Reads `path`, returning `None` when it does not exist.
pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(err).with_context(|| format!("failed to read {}", path.display())),
    }
}

#[cfg(unix)]
pub fn set_mode(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .with_context(|| format!("failed to set mode {mode:o} on {}", path.display()))
}

#[cfg(not(unix))]
pub fn set_mode(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

#[cfg(unix)]
pub fn file_mode(path: &Path) -> Result<u32> {
    use std::os::unix::fs::PermissionsExt;
    let meta = fs::metadata(path).with_context(|| format!("failed to stat {}", path.display()))?;
    Ok(meta.permissions().mode() & 0o777)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_replaces_contents_and_leaves_no_staging_files() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("nested").join("artifact.conf");

        write_atomic(&target, b"first\n", SHARED_READ).expect("first write");
        write_atomic(&target, b"second\n", SHARED_READ).expect("second write");

        assert_eq!(fs::read_to_string(&target).expect("read"), "second\n");
        let leftovers: Vec<_> = fs::read_dir(target.parent().expect("parent"))
            .expect("read dir")
            .flatten()
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty(), "staging files left behind");
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_applies_requested_mode() {
        let temp = tempfile::tempdir().expect("tempdir");
        let target = temp.path().join("script.sh");
        write_atomic(&target, b"#!/bin/bash\n", OWNER_EXECUTABLE).expect("write");
        assert_eq!(file_mode(&target).expect("mode"), 0o700);
    }

    #[test]
    fn read_optional_maps_missing_to_none() {
        let temp = tempfile::tempdir().expect("tempdir");
        assert!(read_optional(&temp.path().join("absent"))
            .expect("read")
            .is_none());
    }
}
