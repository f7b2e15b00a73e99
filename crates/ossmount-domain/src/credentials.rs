//! The `passwd-ossfs` credential store.
//!
//! One record per line, `bucket:access_key_id:access_key_secret`, in the order
//! the operator added them. The 1-based position of a record is the index the
//! operator uses to pick a bucket for mounting.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::info;

use crate::error::ValidationError;
use crate::fs::{read_optional, write_atomic, OWNER_READ_WRITE};

#[derive(Clone, PartialEq, Eq)]
pub struct CredentialRecord {
    pub bucket: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl CredentialRecord {
    /// Builds a record from operator input, trimming surrounding whitespace.
    pub fn new(
        bucket: &str,
        access_key_id: &str,
        access_key_secret: &str,
    ) -> Result<Self, ValidationError> {
        let bucket = required_field("bucket", bucket)?;
        let access_key_id = required_field("access_key_id", access_key_id)?;
        let access_key_secret = required_field("access_key_secret", access_key_secret)?;
        for (field, value) in [("bucket", &bucket), ("access_key_id", &access_key_id)] {
            if value.contains(':') {
                return Err(ValidationError::InvalidField {
                    field,
                    reason: "must not contain ':'".to_string(),
                });
            }
        }
        Ok(Self {
            bucket,
            access_key_id,
            access_key_secret,
        })
    }

    #[must_use]
    pub fn to_line(&self) -> String {
        format!(
            "{}:{}:{}",
            self.bucket, self.access_key_id, self.access_key_secret
        )
    }

    fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.splitn(3, ':');
        let bucket = parts.next()?;
        let access_key_id = parts.next()?;
        let access_key_secret = parts.next()?;
        if bucket.is_empty() || access_key_id.is_empty() || access_key_secret.is_empty() {
            return None;
        }
        Some(Self {
            bucket: bucket.to_string(),
            access_key_id: access_key_id.to_string(),
            access_key_secret: access_key_secret.to_string(),
        })
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

fn required_field(field: &'static str, raw: &str) -> Result<String, ValidationError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    if value.contains(['\n', '\r']) {
        return Err(ValidationError::InvalidField {
            field,
            reason: "must be a single line".to_string(),
        });
    }
    Ok(value.to_string())
}

#[derive(Clone, Debug)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when the store file exists and holds at least one byte.
    #[must_use]
    pub fn exists_nonempty(&self) -> bool {
        fs::metadata(&self.path).is_ok_and(|meta| meta.len() > 0)
    }

    /// Parses every record in file order. Blank lines are skipped and do not
    /// consume an index.
    pub fn list(&self) -> Result<Vec<CredentialRecord>> {
        let Some(contents) = read_optional(&self.path)? else {
            return Ok(Vec::new());
        };
        let mut records = Vec::new();
        for (idx, raw) in contents.lines().enumerate() {
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let record =
                CredentialRecord::parse_line(line).ok_or_else(|| ValidationError::MalformedRecord {
                    path: self.path.display().to_string(),
                    line: idx + 1,
                })?;
            records.push(record);
        }
        Ok(records)
    }

    /// Appends one record. See [`CredentialStore::append_all`].
    pub fn append(&self, bucket: &str, access_key_id: &str, access_key_secret: &str) -> Result<()> {
        let record = CredentialRecord::new(bucket, access_key_id, access_key_secret)?;
        self.append_all(std::slice::from_ref(&record))
    }

    /// Appends a batch of records and resets the file to owner-only
    /// read/write. A bucket that is already stored, or repeated within the
    /// batch, is rejected before anything is written.
    pub fn append_all(&self, records: &[CredentialRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        self.check_new(records)?;

        let mut contents = read_optional(&self.path)?.unwrap_or_default();
        if !contents.is_empty() && !contents.ends_with('\n') {
            contents.push('\n');
        }
        for record in records {
            contents.push_str(&record.to_line());
            contents.push('\n');
        }
        write_atomic(&self.path, contents.as_bytes(), OWNER_READ_WRITE)?;
        info!(
            store = %self.path.display(),
            added = records.len(),
            "credentials stored"
        );
        Ok(())
    }

    /// Rejects a bucket that is already stored or repeated within `records`.
    pub fn check_new(&self, records: &[CredentialRecord]) -> Result<()> {
        let existing = self.list()?;
        let mut seen: Vec<&str> = existing.iter().map(|r| r.bucket.as_str()).collect();
        for record in records {
            if seen.contains(&record.bucket.as_str()) {
                return Err(ValidationError::DuplicateBucket {
                    bucket: record.bucket.clone(),
                    path: self.path.display().to_string(),
                }
                .into());
            }
            seen.push(record.bucket.as_str());
        }
        Ok(())
    }

    /// Returns the record at 1-based `index`.
    pub fn select(&self, index: usize) -> Result<CredentialRecord> {
        let records = self.list()?;
        if records.is_empty() {
            return Err(ValidationError::EmptyStore {
                path: self.path.display().to_string(),
            }
            .into());
        }
        Ok(select_record(&records, index)?.clone())
    }
}

/// Picks the record at 1-based `index`, rejecting 0 and anything past the end.
pub fn select_record(
    records: &[CredentialRecord],
    index: usize,
) -> Result<&CredentialRecord, ValidationError> {
    index
        .checked_sub(1)
        .and_then(|pos| records.get(pos))
        .ok_or(ValidationError::IndexOutOfRange {
            index,
            count: records.len(),
        })
}
