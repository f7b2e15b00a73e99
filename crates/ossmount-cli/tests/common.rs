#![allow(dead_code)]

use std::path::{Path, PathBuf};

use assert_cmd::{assert::Assert, cargo::cargo_bin_cmd, Command};
use serde_json::Value;
use tempfile::TempDir;

/// A throwaway base directory with supervisord control disabled.
pub struct Host {
    temp: TempDir,
}

impl Host {
    pub fn new() -> Self {
        let temp = tempfile::Builder::new()
            .prefix("ossmount-cli")
            .tempdir()
            .expect("tempdir");
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn home(&self) -> PathBuf {
        self.root().join("home")
    }

    pub fn store(&self) -> PathBuf {
        self.home().join("passwd").join("passwd-ossfs")
    }

    pub fn link(&self) -> PathBuf {
        self.root().join("etc").join("supervisord.conf")
    }

    pub fn mount_point(&self, name: &str) -> PathBuf {
        self.root().join("mnt").join(name)
    }

    pub fn cmd(&self, args: &[&str]) -> Command {
        self.cmd_at(&self.home(), args)
    }

    /// Like [`Host::cmd`] with another base directory.
    pub fn cmd_at(&self, home: &Path, args: &[&str]) -> Command {
        let mut cmd = cargo_bin_cmd!("ossmount");
        cmd.env_remove("OSSMOUNT_HOME")
            .env_remove("OSSMOUNT_KEY_SECRET")
            .env("OSSMOUNT_SKIP_SUPERVISOR", "1")
            .env("OSSMOUNT_SUPERVISOR_LINK", self.link())
            .env("NO_COLOR", "1")
            .arg("--home")
            .arg(home)
            .args(args)
            .write_stdin("");
        cmd
    }

    pub fn add_secret(&self, bucket: &str, key_id: &str, key_secret: &str) -> Assert {
        self.cmd(&[
            "secret",
            "add",
            "--bucket",
            bucket,
            "--key-id",
            key_id,
            "--key-secret",
            key_secret,
        ])
        .assert()
    }
}

pub fn parse_json(assert: &Assert) -> Value {
    let stdout = &assert.get_output().stdout;
    serde_json::from_slice(stdout).unwrap_or_else(|err| {
        panic!(
            "stdout is not json ({err}): {}",
            String::from_utf8_lossy(stdout)
        )
    })
}
