use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::info;

use super::process::{run_checked, run_command, RunOutput};
use crate::outcome::ExternalCommandError;

const USER_AGENT: &str = concat!("ossmount/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Installs system packages.
pub trait PackageManager: Send + Sync {
    fn install(&self, packages: &[&str]) -> Result<()>;
    /// Installs a package file that is already on disk, pulling its
    /// dependencies from the package repositories.
    fn install_local(&self, package: &Path) -> Result<()>;
}

/// Fetches a remote file.
pub trait Downloader: Send + Sync {
    /// Downloads `url` to `dest`, returning the number of bytes written.
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64>;
}

/// Drives the supervisor daemon for a given primary config.
pub trait SupervisorControl: Send + Sync {
    /// Starts `supervisord -c <config>`.
    fn start(&self, config: &Path) -> Result<RunOutput>;
    /// Runs `supervisorctl -c <config> <args>` and returns its raw output.
    fn ctl(&self, config: &Path, args: &[&str]) -> Result<RunOutput>;
}

pub trait ToolLocator: Send + Sync {
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

pub trait Effects: Send + Sync {
    fn packages(&self) -> &dyn PackageManager;
    fn downloader(&self) -> &dyn Downloader;
    fn supervisor(&self) -> &dyn SupervisorControl;
    fn tools(&self) -> &dyn ToolLocator;
}

pub struct SystemEffects {
    packages: Arc<SystemPackageManager>,
    downloader: Arc<HttpDownloader>,
    supervisor: Arc<SystemSupervisor>,
    tools: Arc<PathLocator>,
}

impl SystemEffects {
    #[must_use]
    pub fn new() -> Self {
        Self {
            packages: Arc::new(SystemPackageManager),
            downloader: Arc::new(HttpDownloader),
            supervisor: Arc::new(SystemSupervisor),
            tools: Arc::new(PathLocator),
        }
    }
}

impl Default for SystemEffects {
    fn default() -> Self {
        Self::new()
    }
}

impl Effects for SystemEffects {
    fn packages(&self) -> &dyn PackageManager {
        self.packages.as_ref()
    }

    fn downloader(&self) -> &dyn Downloader {
        self.downloader.as_ref()
    }

    fn supervisor(&self) -> &dyn SupervisorControl {
        self.supervisor.as_ref()
    }

    fn tools(&self) -> &dyn ToolLocator {
        self.tools.as_ref()
    }
}

struct SystemPackageManager;

fn apt_env() -> Vec<(String, String)> {
    vec![(
        "DEBIAN_FRONTEND".to_string(),
        "noninteractive".to_string(),
    )]
}

impl PackageManager for SystemPackageManager {
    fn install(&self, packages: &[&str]) -> Result<()> {
        let env = apt_env();
        run_checked("apt-get", &["update".to_string()], &env)?;
        let mut args = vec!["install".to_string(), "-y".to_string()];
        args.extend(packages.iter().map(ToString::to_string));
        run_checked("apt-get", &args, &env)?;
        info!(packages = %packages.join(" "), "system packages installed");
        Ok(())
    }

    fn install_local(&self, package: &Path) -> Result<()> {
        let args = vec!["-n".to_string(), package.display().to_string()];
        run_checked("gdebi", &args, &apt_env())?;
        info!(package = %package.display(), "package file installed");
        Ok(())
    }
}

struct HttpDownloader;

fn http_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(HTTP_TIMEOUT)
        .build()
        .context("failed to build http client")
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let client = http_client()?;
        let mut response = client
            .get(url)
            .send()
            .with_context(|| format!("failed to fetch {url}"))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExternalCommandError {
                command: format!("GET {url}"),
                code: i32::from(status.as_u16()),
                stderr: status.canonical_reason().unwrap_or_default().to_string(),
            }
            .into());
        }

        let mut tmp = NamedTempFile::new_in(parent)?;
        let mut written: u64 = 0;
        let mut buffer = vec![0_u8; 64 * 1024];
        loop {
            let read = response
                .read(&mut buffer)
                .with_context(|| format!("stream error for {url}"))?;
            if read == 0 {
                break;
            }
            tmp.write_all(&buffer[..read])
                .with_context(|| format!("failed to write {}", dest.display()))?;
            written += read as u64;
        }
        tmp.persist(dest)
            .map_err(|err| err.error)
            .with_context(|| format!("failed to persist {}", dest.display()))?;
        info!(url, dest = %dest.display(), bytes = written, "downloaded");
        Ok(written)
    }
}

struct SystemSupervisor;

impl SupervisorControl for SystemSupervisor {
    fn start(&self, config: &Path) -> Result<RunOutput> {
        run_checked(
            "supervisord",
            &["-c".to_string(), config.display().to_string()],
            &[],
        )
    }

    fn ctl(&self, config: &Path, args: &[&str]) -> Result<RunOutput> {
        let mut full = vec!["-c".to_string(), config.display().to_string()];
        full.extend(args.iter().map(ToString::to_string));
        run_command("supervisorctl", &full, &[])
    }
}

struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

pub type SharedEffects = Arc<dyn Effects>;
