//! In-process host for command tests: a temp base directory plus effects
//! that record what they were asked to do instead of touching the system.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use tempfile::TempDir;

use crate::config::{EnvSnapshot, GlobalOptions, Layout};
use crate::effects::{Downloader, Effects, PackageManager, SupervisorControl, ToolLocator};
use crate::outcome::ExternalCommandError;
use crate::process::RunOutput;
use crate::CommandContext;

#[derive(Default)]
pub(crate) struct FakeEffects {
    calls: Mutex<Vec<String>>,
    pub(crate) ossfs: Mutex<Option<PathBuf>>,
    pub(crate) running: AtomicBool,
    /// Calls starting with this text fail.
    pub(crate) failing: Mutex<Option<String>>,
}

impl FakeEffects {
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }

    fn record(&self, call: String) -> Result<()> {
        let fails = self
            .failing
            .lock()
            .ok()
            .and_then(|failing| failing.clone())
            .is_some_and(|prefix| call.starts_with(&prefix));
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call.clone());
        }
        if fails {
            return Err(ExternalCommandError {
                command: call,
                code: 2,
                stderr: "simulated failure".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn output(code: i32, stdout: &str) -> RunOutput {
    RunOutput {
        code,
        stdout: stdout.to_string(),
        stderr: String::new(),
    }
}

impl PackageManager for FakeEffects {
    fn install(&self, packages: &[&str]) -> Result<()> {
        self.record(format!("install {}", packages.join(" ")))
    }

    fn install_local(&self, package: &Path) -> Result<()> {
        let name = package
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let present = if package.is_file() { "present" } else { "missing" };
        self.record(format!("install-local {name} {present}"))
    }
}

impl Downloader for FakeEffects {
    fn fetch(&self, url: &str, dest: &Path) -> Result<u64> {
        self.record(format!("fetch {url}"))?;
        fs::write(dest, b"deb")?;
        Ok(3)
    }
}

impl SupervisorControl for FakeEffects {
    fn start(&self, _config: &Path) -> Result<RunOutput> {
        self.record("supervisord".to_string())?;
        self.running.store(true, Ordering::SeqCst);
        Ok(output(0, ""))
    }

    fn ctl(&self, _config: &Path, args: &[&str]) -> Result<RunOutput> {
        let call = format!("supervisorctl {}", args.join(" "));
        if self.record(call).is_err() {
            return Ok(output(2, ""));
        }
        if args == ["status"] {
            return Ok(if self.running.load(Ordering::SeqCst) {
                output(0, "ossfs_mnt_media RUNNING pid 42, uptime 0:00:01\n")
            } else {
                output(4, "unix:///home/ossfs/run/supervisor.sock no such file\n")
            });
        }
        Ok(output(0, ""))
    }
}

impl ToolLocator for FakeEffects {
    fn locate(&self, _program: &str) -> Option<PathBuf> {
        self.ossfs.lock().ok().and_then(|path| path.clone())
    }
}

impl Effects for FakeEffects {
    fn packages(&self) -> &dyn PackageManager {
        self
    }

    fn downloader(&self) -> &dyn Downloader {
        self
    }

    fn supervisor(&self) -> &dyn SupervisorControl {
        self
    }

    fn tools(&self) -> &dyn ToolLocator {
        self
    }
}

pub(crate) struct TestHost {
    temp: TempDir,
    global: GlobalOptions,
    env: Vec<(String, String)>,
    pub(crate) effects: Arc<FakeEffects>,
}

impl TestHost {
    pub(crate) fn new() -> Self {
        Self::with_env(&[])
    }

    pub(crate) fn with_env(extra: &[(&str, &str)]) -> Self {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut env = vec![
            (
                "OSSMOUNT_HOME".to_string(),
                temp.path().join("home").display().to_string(),
            ),
            (
                "OSSMOUNT_SUPERVISOR_LINK".to_string(),
                temp.path().join("etc").join("supervisord.conf").display().to_string(),
            ),
        ];
        env.extend(
            extra
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string())),
        );
        Self {
            temp,
            global: GlobalOptions::default(),
            env,
            effects: Arc::new(FakeEffects::default()),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        self.temp.path()
    }

    pub(crate) fn layout(&self) -> Layout {
        Layout::new(self.temp.path().join("home"))
    }

    pub(crate) fn context(&self) -> CommandContext<'_> {
        let pairs: Vec<(&str, &str)> = self
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        CommandContext::with_snapshot(
            &self.global,
            &EnvSnapshot::testing(&pairs),
            self.effects.clone(),
        )
        .expect("context")
    }
}
