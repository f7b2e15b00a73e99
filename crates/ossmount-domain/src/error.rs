/// Problems with operator-supplied input. These are reported and the operator
/// is asked again; they never abort a run on their own.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("no credentials stored in {path}")]
    EmptyStore { path: String },
    #[error("selection {index} is out of range (choose 1-{count})")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} is invalid: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("bucket '{bucket}' already has credentials in {path}")]
    DuplicateBucket { bucket: String, path: String },
    #[error("mount path must be absolute: {path}")]
    RelativeMountPath { path: String },
    #[error("{local_path} is already configured for bucket '{bucket}' ({region})")]
    MountConflict {
        local_path: String,
        bucket: String,
        region: String,
    },
    #[error("{path}:{line}: expected bucket:access_key_id:access_key_secret")]
    MalformedRecord { path: String, line: usize },
    #[error("{path} exists but does not match the recorded mount")]
    UnrecordedScript { path: String },
}

impl ValidationError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::EmptyStore { .. } => "empty_store",
            ValidationError::IndexOutOfRange { .. } => "index_out_of_range",
            ValidationError::MissingField { .. } => "missing_field",
            ValidationError::InvalidField { .. } => "invalid_field",
            ValidationError::DuplicateBucket { .. } => "duplicate_bucket",
            ValidationError::RelativeMountPath { .. } => "relative_mount_path",
            ValidationError::MountConflict { .. } => "mount_conflict",
            ValidationError::MalformedRecord { .. } => "malformed_record",
            ValidationError::UnrecordedScript { .. } => "unrecorded_script",
        }
    }

    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            ValidationError::EmptyStore { .. } => {
                Some("Add credentials first with `ossmount secret add`.")
            }
            ValidationError::IndexOutOfRange { .. } => {
                Some("Run `ossmount secret list` to see the available buckets.")
            }
            ValidationError::DuplicateBucket { .. } => {
                Some("Each bucket may be stored once; edit the store by hand to rotate keys.")
            }
            ValidationError::MountConflict { .. } | ValidationError::UnrecordedScript { .. } => {
                Some("Pass --replace to regenerate the mount for this path.")
            }
            ValidationError::MalformedRecord { .. } => {
                Some("Fix or remove the line, then rerun the command.")
            }
            _ => None,
        }
    }
}

/// Refusals to touch an existing artifact that this tool does not own.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ArtifactError {
    #[error("{path} is a directory; refusing to replace it with a link")]
    LinkTargetIsDirectory { path: String },
    #[error("{path} holds a supervisor config not generated by ossmount")]
    ForeignConfig { path: String },
}

impl ArtifactError {
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            ArtifactError::LinkTargetIsDirectory { .. } => "link_target_is_directory",
            ArtifactError::ForeignConfig { .. } => "foreign_config",
        }
    }

    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            ArtifactError::LinkTargetIsDirectory { .. } => {
                "Move the directory aside or point OSSMOUNT_SUPERVISOR_LINK elsewhere."
            }
            ArtifactError::ForeignConfig { .. } => {
                "Pass --force to back it up and link the generated config instead."
            }
        }
    }
}
