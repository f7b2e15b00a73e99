//! Mount definitions and the manifest of mounts configured on this host.

mod registry;

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub use registry::{MountRecord, MountRegistry, MANIFEST_VERSION};

/// One bucket-to-directory binding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountDefinition {
    pub bucket: String,
    pub local_path: PathBuf,
    pub region_endpoint: String,
    pub passwd_file: PathBuf,
}

impl MountDefinition {
    /// Validates operator input. `local_path` is normalized so `/mnt/media/`
    /// and `/mnt/media` name the same mount.
    pub fn new(
        bucket: &str,
        local_path: &Path,
        region_endpoint: &str,
        passwd_file: &Path,
    ) -> Result<Self, ValidationError> {
        let bucket = bucket.trim();
        if bucket.is_empty() {
            return Err(ValidationError::MissingField { field: "bucket" });
        }
        let region_endpoint = region_endpoint.trim();
        if region_endpoint.is_empty() {
            return Err(ValidationError::MissingField { field: "region" });
        }
        if region_endpoint.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidField {
                field: "region",
                reason: "must not contain whitespace".to_string(),
            });
        }
        Ok(Self {
            bucket: bucket.to_string(),
            local_path: normalize_mount_path(local_path)?,
            region_endpoint: region_endpoint.to_string(),
            passwd_file: passwd_file.to_path_buf(),
        })
    }

    /// The mount path as text; normalization guarantees it is UTF-8.
    #[must_use]
    pub fn local_path_str(&self) -> &str {
        self.local_path.to_str().unwrap_or_default()
    }
}

/// Normalizes an absolute mount path, rejecting relative paths, `..`
/// segments, and anything that cannot be written into a shell script.
pub fn normalize_mount_path(raw: &Path) -> Result<PathBuf, ValidationError> {
    let text = raw.to_str().ok_or_else(|| ValidationError::InvalidField {
        field: "path",
        reason: "must be valid UTF-8".to_string(),
    })?;
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::MissingField { field: "path" });
    }
    if text.contains(['\n', '\r']) {
        return Err(ValidationError::InvalidField {
            field: "path",
            reason: "must be a single line".to_string(),
        });
    }
    let path = Path::new(text);
    if !path.is_absolute() {
        return Err(ValidationError::RelativeMountPath {
            path: text.to_string(),
        });
    }
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                return Err(ValidationError::InvalidField {
                    field: "path",
                    reason: "must not contain '..'".to_string(),
                })
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized)
}

/// Supervisor program name for a mount path: `/mnt/media` becomes
/// `ossfs_mnt_media`.
#[must_use]
pub fn program_slug(local_path: &Path) -> String {
    let segments: Vec<String> = local_path
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(
                part.to_string_lossy()
                    .chars()
                    .map(|ch| {
                        if ch.is_ascii_alphanumeric() || matches!(ch, '-' | '.') {
                            ch
                        } else {
                            '_'
                        }
                    })
                    .collect(),
            ),
            _ => None,
        })
        .collect();
    if segments.is_empty() {
        "ossfs_root".to_string()
    } else {
        format!("ossfs_{}", segments.join("_"))
    }
}
