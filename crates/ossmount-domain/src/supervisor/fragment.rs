use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info};

use crate::fs::{read_optional, write_atomic, SHARED_READ};
use crate::script::shell_quote;

/// Log destination and rotation for a supervised program.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingOptions {
    pub stdout_logfile: PathBuf,
    pub maxbytes: String,
    pub backups: u32,
}

impl LoggingOptions {
    /// Per-program log under `log_dir`, rotated at 1MB with ten backups.
    #[must_use]
    pub fn in_dir(log_dir: &Path, program: &str) -> Self {
        Self {
            stdout_logfile: log_dir.join(format!("{program}.log")),
            maxbytes: "1MB".to_string(),
            backups: 10,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgramSpec {
    pub name: String,
    pub command: String,
    /// Shown in the fragment header so an operator can find the owner.
    pub local_path: PathBuf,
    pub logging: LoggingOptions,
}

impl ProgramSpec {
    /// A program that runs `script` under bash. Supervisor splits `command`
    /// like a shell, so the path is quoted.
    #[must_use]
    pub fn for_script(name: &str, script: &Path, local_path: &Path, log_dir: &Path) -> Self {
        Self {
            name: name.to_string(),
            command: format!("bash {}", shell_quote(&script.display().to_string())),
            local_path: local_path.to_path_buf(),
            logging: LoggingOptions::in_dir(log_dir, name),
        }
    }
}

#[must_use]
pub fn fragment_path(fragments_dir: &Path, program: &str) -> PathBuf {
    fragments_dir.join(format!("{program}.conf"))
}

#[must_use]
pub fn render_fragment(spec: &ProgramSpec) -> String {
    let mut out = String::new();
    out.push_str(super::MANAGED_HEADER);
    out.push_str(&format!("; mount: {}\n", spec.local_path.display()));
    out.push_str(&format!("[program:{}]\n", spec.name));
    out.push_str(&format!("command={}\n", spec.command));
    out.push_str("autostart=true\n");
    out.push_str("autorestart=true\n");
    out.push_str("stopasgroup=true\n");
    out.push_str("killasgroup=true\n");
    out.push_str(&format!(
        "stdout_logfile={}\n",
        spec.logging.stdout_logfile.display()
    ));
    out.push_str(&format!(
        "stdout_logfile_maxbytes={}\n",
        spec.logging.maxbytes
    ));
    out.push_str(&format!(
        "stdout_logfile_backups={}\n",
        spec.logging.backups
    ));
    out.push_str("redirect_stderr=true\n");
    out
}

/// Overwrites the fragment at `path`. Returns whether the bytes changed.
pub fn write_fragment(path: &Path, spec: &ProgramSpec) -> Result<bool> {
    let rendered = render_fragment(spec);
    if read_optional(path)?.as_deref() == Some(rendered.as_str()) {
        debug!(fragment = %path.display(), "fragment unchanged");
        return Ok(false);
    }
    write_atomic(path, rendered.as_bytes(), SHARED_READ)?;
    info!(fragment = %path.display(), program = %spec.name, "fragment written");
    Ok(true)
}
