//! Per-mount start scripts run by the supervisor.
//!
//! Each mount path owns one script, `start_<program>.sh`. The script unmounts
//! any stale mount at the path and then execs the mount driver in the
//! foreground, so the supervisor sees the driver's exit and can restart it.

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::error::ValidationError;
use crate::fs::{read_optional, write_atomic, OWNER_EXECUTABLE};
use crate::mount::{MountDefinition, MountRegistry};

pub const MOUNT_DRIVER: &str = "ossfs";

const SCRIPT_MARKER: &str = "# ossmount: mount script for ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptEditResult {
    Created,
    /// The path was configured for a different bucket, region, or store.
    Replaced,
    /// The recorded mount was unchanged but its script was missing or edited.
    Restored,
    AlreadyConfigured,
}

impl ScriptEditResult {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptEditResult::Created => "created",
            ScriptEditResult::Replaced => "replaced",
            ScriptEditResult::Restored => "restored",
            ScriptEditResult::AlreadyConfigured => "already-configured",
        }
    }

    #[must_use]
    pub fn is_noop(self) -> bool {
        self == ScriptEditResult::AlreadyConfigured
    }
}

#[derive(Clone, Debug)]
pub struct ScriptOutcome {
    pub result: ScriptEditResult,
    pub script: PathBuf,
    pub program: String,
}

#[derive(Clone, Debug)]
pub struct MountScriptSynthesizer {
    scripts_dir: PathBuf,
}

impl MountScriptSynthesizer {
    pub fn new(scripts_dir: impl Into<PathBuf>) -> Self {
        Self {
            scripts_dir: scripts_dir.into(),
        }
    }

    #[must_use]
    pub fn script_path(&self, program: &str) -> PathBuf {
        self.scripts_dir.join(format!("start_{program}.sh"))
    }

    /// Emits the script for `def` unless the registry already records the
    /// same mount and the script on disk is current.
    ///
    /// The registry is updated in memory; the caller saves it once the rest of
    /// the mount's artifacts are in place. A path recorded with different
    /// settings is a [`ValidationError::MountConflict`] unless `replace` is set.
    pub fn synthesize(
        &self,
        registry: &mut MountRegistry,
        def: &MountDefinition,
        fragment: impl FnOnce(&str) -> PathBuf,
        replace: bool,
    ) -> Result<ScriptOutcome> {
        let recorded = registry.get(&def.local_path).cloned();
        if let Some(record) = &recorded {
            if !record.matches(def) && !replace {
                return Err(ValidationError::MountConflict {
                    local_path: def.local_path_str().to_string(),
                    bucket: record.bucket.clone(),
                    region: record.region_endpoint.clone(),
                }
                .into());
            }
        }

        let program = registry.program_name_for(&def.local_path);
        let script = self.script_path(&program);
        let rendered = render_script(def);
        let on_disk = read_optional(&script)?;

        let result = match (&recorded, on_disk.as_deref()) {
            (Some(record), Some(current)) if record.matches(def) && current == rendered => {
                debug!(script = %script.display(), "mount script already current");
                return Ok(ScriptOutcome {
                    result: ScriptEditResult::AlreadyConfigured,
                    script,
                    program,
                });
            }
            (Some(record), _) if record.matches(def) => ScriptEditResult::Restored,
            (Some(_), _) => ScriptEditResult::Replaced,
            (None, Some(current)) if current == rendered => ScriptEditResult::AlreadyConfigured,
            (None, Some(current)) if replace || is_script_for(current, &def.local_path) => {
                ScriptEditResult::Replaced
            }
            (None, Some(_)) => {
                return Err(ValidationError::UnrecordedScript {
                    path: script.display().to_string(),
                }
                .into());
            }
            (None, None) => ScriptEditResult::Created,
        };

        if result.is_noop() {
            // identical script from an earlier run that never reached the manifest
            debug!(script = %script.display(), "adopting existing mount script");
        } else {
            write_atomic(&script, rendered.as_bytes(), OWNER_EXECUTABLE)?;
            info!(
                script = %script.display(),
                result = result.as_str(),
                "mount script written"
            );
        }
        let fragment_path = fragment(&program);
        let record = registry.record_for(def, &program, &script, &fragment_path);
        registry.upsert(record);
        Ok(ScriptOutcome {
            result,
            script,
            program,
        })
    }
}

/// Renders the start script for one mount.
#[must_use]
pub fn render_script(def: &MountDefinition) -> String {
    let local_path = def.local_path_str();
    let passwd_file = def.passwd_file.display().to_string();
    let status = format!("Mounting {} at {local_path}...", def.bucket);
    let mut script = String::new();
    script.push_str("#!/bin/bash\n");
    script.push_str(&format!("{SCRIPT_MARKER}{local_path}\n"));
    script.push_str(&format!("echo {}\n", shell_quote(&status)));
    script.push_str(&format!(
        "umount {} 2>/dev/null || true\n",
        shell_quote(local_path)
    ));
    script.push_str(&format!(
        "exec {MOUNT_DRIVER} {} {} -ourl={} -f -o passwd_file={} -o allow_other\n",
        shell_quote(&def.bucket),
        shell_quote(local_path),
        shell_quote(&def.region_endpoint),
        shell_quote(&passwd_file),
    ));
    script
}

/// True when `contents` is a script this tool generated for `local_path`.
#[must_use]
pub fn is_script_for(contents: &str, local_path: &Path) -> bool {
    let marker = format!("{SCRIPT_MARKER}{}", local_path.display());
    contents.lines().any(|line| line == marker)
}

pub(crate) fn shell_quote(value: &str) -> String {
    let safe = !value.is_empty()
        && value.chars().all(|ch| {
            ch.is_ascii_alphanumeric()
                || matches!(ch, '/' | '.' | '_' | '-' | ':' | '=' | '@' | ',' | '+' | '%')
        });
    if safe {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}
