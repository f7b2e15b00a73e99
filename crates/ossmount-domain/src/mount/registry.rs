use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::debug;

use super::{program_slug, MountDefinition};
use crate::fs::{read_optional, write_atomic, SHARED_READ};

pub const MANIFEST_VERSION: u32 = 1;

/// A configured mount as persisted in `mounts.json`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRecord {
    pub local_path: PathBuf,
    pub bucket: String,
    pub region_endpoint: String,
    pub passwd_file: PathBuf,
    pub program: String,
    pub script: PathBuf,
    pub fragment: PathBuf,
    pub configured_at: String,
}

impl MountRecord {
    #[must_use]
    pub fn definition(&self) -> MountDefinition {
        MountDefinition {
            bucket: self.bucket.clone(),
            local_path: self.local_path.clone(),
            region_endpoint: self.region_endpoint.clone(),
            passwd_file: self.passwd_file.clone(),
        }
    }

    #[must_use]
    pub fn matches(&self, def: &MountDefinition) -> bool {
        self.definition() == *def
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ManifestFile {
    version: u32,
    #[serde(default)]
    mounts: Vec<MountRecord>,
}

/// The set of mounts configured on this host, keyed by local path.
///
/// This manifest, not the generated scripts, is what decides whether a path
/// is already configured.
#[derive(Debug)]
pub struct MountRegistry {
    path: PathBuf,
    mounts: IndexMap<PathBuf, MountRecord>,
}

impl MountRegistry {
    /// Loads the manifest at `path`; a missing file is an empty registry.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let mut mounts = IndexMap::new();
        if let Some(contents) = read_optional(&path)? {
            let manifest: ManifestFile = serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?;
            if manifest.version != MANIFEST_VERSION {
                bail!(
                    "unsupported mount manifest version {} in {} (expected {MANIFEST_VERSION})",
                    manifest.version,
                    path.display()
                );
            }
            for record in manifest.mounts {
                mounts.insert(record.local_path.clone(), record);
            }
        }
        Ok(Self { path, mounts })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn get(&self, local_path: &Path) -> Option<&MountRecord> {
        self.mounts.get(local_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MountRecord> {
        self.mounts.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Program name for `local_path`: the recorded one if the path is known,
    /// otherwise the path slug, suffixed when another path already owns it.
    #[must_use]
    pub fn program_name_for(&self, local_path: &Path) -> String {
        if let Some(record) = self.get(local_path) {
            return record.program.clone();
        }
        let base = program_slug(local_path);
        let taken = |name: &str| {
            self.mounts
                .values()
                .any(|record| record.program == name && record.local_path != local_path)
        };
        if !taken(&base) {
            return base;
        }
        (2..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| base.clone())
    }

    /// Builds the record for `def`, stamping the current time.
    #[must_use]
    pub fn record_for(
        &self,
        def: &MountDefinition,
        program: &str,
        script: &Path,
        fragment: &Path,
    ) -> MountRecord {
        let configured_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        MountRecord {
            local_path: def.local_path.clone(),
            bucket: def.bucket.clone(),
            region_endpoint: def.region_endpoint.clone(),
            passwd_file: def.passwd_file.clone(),
            program: program.to_string(),
            script: script.to_path_buf(),
            fragment: fragment.to_path_buf(),
            configured_at,
        }
    }

    /// Inserts or replaces the record for its local path, keeping the
    /// original position of a replaced entry.
    pub fn upsert(&mut self, record: MountRecord) -> Option<MountRecord> {
        debug!(path = %record.local_path.display(), program = %record.program, "recording mount");
        self.mounts.insert(record.local_path.clone(), record)
    }

    pub fn save(&self) -> Result<()> {
        let manifest = ManifestFile {
            version: MANIFEST_VERSION,
            mounts: self.mounts.values().cloned().collect(),
        };
        let mut contents = serde_json::to_vec_pretty(&manifest)?;
        contents.push(b'\n');
        write_atomic(&self.path, &contents, SHARED_READ)
    }
}
