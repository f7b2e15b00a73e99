//! Supervisor configuration owned by this tool.
//!
//! A primary config holds the daemon's global settings and an `[include]` of
//! the fragment directory. Each mount gets its own fragment file with a single
//! `[program:...]` block, so adding a mount never edits another mount's bytes.
//! The daemon's well-known config location is a symlink to the primary config.

mod fragment;
pub mod ini;
mod link;
mod primary;

use std::path::{Path, PathBuf};

use anyhow::Result;

pub use fragment::{fragment_path, render_fragment, LoggingOptions, ProgramSpec};
pub use link::{backup_path, LinkOutcome, LinkState};
pub use primary::{
    merge_include, render_primary, InetHttpServer, IncludeMerge, PrimarySettings,
};

/// First line of every config this tool generates.
pub const MANAGED_HEADER: &str = "; managed by ossmount\n";

#[derive(Clone, Debug)]
pub struct SupervisorConfigManager {
    primary: PathBuf,
    fragments_dir: PathBuf,
    link: PathBuf,
}

impl SupervisorConfigManager {
    pub fn new(
        primary: impl Into<PathBuf>,
        fragments_dir: impl Into<PathBuf>,
        link: impl Into<PathBuf>,
    ) -> Self {
        Self {
            primary: primary.into(),
            fragments_dir: fragments_dir.into(),
            link: link.into(),
        }
    }

    #[must_use]
    pub fn primary(&self) -> &Path {
        &self.primary
    }

    #[must_use]
    pub fn link(&self) -> &Path {
        &self.link
    }

    #[must_use]
    pub fn fragment_path(&self, program: &str) -> PathBuf {
        fragment_path(&self.fragments_dir, program)
    }

    /// The include entry covering every fragment in the fragment directory.
    #[must_use]
    pub fn include_glob(&self) -> String {
        self.fragments_dir.join("*.conf").display().to_string()
    }

    /// Writes the primary config or merges the fragment include into it.
    pub fn ensure_primary_config(&self, settings: &PrimarySettings) -> Result<IncludeMerge> {
        primary::ensure_primary_config(&self.primary, settings, &self.include_glob())
    }

    /// Overwrites the fragment for `spec.name`; returns whether it changed.
    pub fn write_fragment(&self, spec: &ProgramSpec) -> Result<bool> {
        fragment::write_fragment(&self.fragment_path(&spec.name), spec)
    }

    pub fn activate(&self, force: bool) -> Result<LinkOutcome> {
        link::activate(&self.primary, &self.link, force)
    }

    pub fn link_state(&self) -> Result<LinkState> {
        link::inspect(&self.primary, &self.link)
    }
}
