use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ossmount_domain::{InetHttpServer, PrimarySettings, ValidationError};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HOME: &str = "/home/ossfs";
pub const DEFAULT_SUPERVISOR_LINK: &str = "/etc/supervisor/supervisord.conf";
pub const DEFAULT_DRIVER_URL: &str =
    "https://github.com/aliyun/ossfs/releases/download/v1.91.3/ossfs_1.91.3_ubuntu20.04_amd64.deb";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalOptions {
    pub quiet: bool,
    pub verbose: u8,
    pub trace: bool,
    pub json: bool,
    pub no_color: bool,
    pub home: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub(crate) struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub(crate) fn capture() -> Self {
        Self {
            vars: env::vars().collect(),
        }
    }

    pub(crate) fn flag_is_enabled(&self, key: &str) -> bool {
        matches!(self.vars.get(key).map(String::as_str), Some("1"))
    }

    /// The variable's value, treating an empty value as unset.
    pub(crate) fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    #[cfg(test)]
    pub(crate) fn testing(pairs: &[(&str, &str)]) -> Self {
        let vars = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Self { vars }
    }
}

/// Where every artifact lives under the base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    home: PathBuf,
}

impl Layout {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }

    #[must_use]
    pub fn home(&self) -> &Path {
        &self.home
    }

    #[must_use]
    pub fn passwd_file(&self) -> PathBuf {
        self.home.join("passwd").join("passwd-ossfs")
    }

    #[must_use]
    pub fn scripts_dir(&self) -> PathBuf {
        self.home.join("scripts")
    }

    #[must_use]
    pub fn primary_config(&self) -> PathBuf {
        self.home.join("supervisord").join("supervisord.conf")
    }

    #[must_use]
    pub fn fragments_dir(&self) -> PathBuf {
        self.home.join("supervisord").join("conf.d")
    }

    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.home.join("log")
    }

    #[must_use]
    pub fn run_dir(&self) -> PathBuf {
        self.home.join("run")
    }

    #[must_use]
    pub fn pidfile(&self) -> PathBuf {
        self.run_dir().join("supervisord.pid")
    }

    #[must_use]
    pub fn manifest(&self) -> PathBuf {
        self.home.join("mounts.json")
    }
}

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub link: PathBuf,
    /// False when daemon control is switched off; configs are still written.
    pub enabled: bool,
    pub user: String,
    pub inet: Option<InetHttpServer>,
}

#[derive(Debug, Clone)]
pub struct DriverConfig {
    pub url: String,
}

#[derive(Debug)]
pub struct Config {
    pub(crate) layout: Layout,
    pub(crate) supervisor: SupervisorConfig,
    pub(crate) driver: DriverConfig,
}

impl Config {
    pub(crate) fn from_snapshot(snapshot: &EnvSnapshot, global: &GlobalOptions) -> Result<Self> {
        let home = global
            .home
            .clone()
            .or_else(|| snapshot.var("OSSMOUNT_HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_HOME));
        let home = std::path::absolute(&home)
            .with_context(|| format!("failed to resolve home directory {}", home.display()))?;
        // Supervisor splits `[include] files` and `command` on whitespace.
        if home.to_string_lossy().chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidField {
                field: "home",
                reason: format!("{} must not contain whitespace", home.display()),
            }
            .into());
        }

        let inet = snapshot
            .var("OSSMOUNT_INET_PORT")
            .map(|port| InetHttpServer {
                port: port.trim().to_string(),
                username: snapshot.var("OSSMOUNT_INET_USERNAME").map(ToOwned::to_owned),
                password: snapshot.var("OSSMOUNT_INET_PASSWORD").map(ToOwned::to_owned),
            });

        Ok(Self {
            layout: Layout::new(home),
            supervisor: SupervisorConfig {
                link: snapshot
                    .var("OSSMOUNT_SUPERVISOR_LINK")
                    .map_or_else(|| PathBuf::from(DEFAULT_SUPERVISOR_LINK), PathBuf::from),
                enabled: !snapshot.flag_is_enabled("OSSMOUNT_SKIP_SUPERVISOR"),
                user: snapshot
                    .var("OSSMOUNT_SUPERVISOR_USER")
                    .unwrap_or("root")
                    .to_string(),
                inet,
            },
            driver: DriverConfig {
                url: snapshot
                    .var("OSSMOUNT_DRIVER_URL")
                    .unwrap_or(DEFAULT_DRIVER_URL)
                    .to_string(),
            },
        })
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn supervisor(&self) -> &SupervisorConfig {
        &self.supervisor
    }

    #[must_use]
    pub fn driver(&self) -> &DriverConfig {
        &self.driver
    }

    /// Daemon settings for a freshly generated primary config.
    #[must_use]
    pub fn primary_settings(&self) -> PrimarySettings {
        let layout = &self.layout;
        PrimarySettings {
            nodaemon: false,
            logfile: layout.log_dir().join("supervisord.log"),
            pidfile: layout.pidfile(),
            socket: layout.run_dir().join("supervisor.sock"),
            user: self.supervisor.user.clone(),
            inet: self.supervisor.inet.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stock_install() {
        let config =
            Config::from_snapshot(&EnvSnapshot::testing(&[]), &GlobalOptions::default())
                .expect("config");
        assert_eq!(config.layout().home(), Path::new(DEFAULT_HOME));
        assert_eq!(
            config.layout().passwd_file(),
            PathBuf::from("/home/ossfs/passwd/passwd-ossfs")
        );
        assert_eq!(config.supervisor().link, PathBuf::from(DEFAULT_SUPERVISOR_LINK));
        assert!(config.supervisor().enabled);
        assert!(config.supervisor().inet.is_none());
        assert_eq!(config.driver().url, DEFAULT_DRIVER_URL);
    }

    #[test]
    fn flag_overrides_environment_home() {
        let snapshot = EnvSnapshot::testing(&[("OSSMOUNT_HOME", "/srv/env")]);
        let global = GlobalOptions {
            home: Some(PathBuf::from("/srv/flag")),
            ..GlobalOptions::default()
        };
        let config = Config::from_snapshot(&snapshot, &global).expect("config");
        assert_eq!(config.layout().home(), Path::new("/srv/flag"));

        let config =
            Config::from_snapshot(&snapshot, &GlobalOptions::default()).expect("config");
        assert_eq!(config.layout().home(), Path::new("/srv/env"));
    }

    #[test]
    fn environment_controls_supervisor_and_inet_panel() {
        let snapshot = EnvSnapshot::testing(&[
            ("OSSMOUNT_SKIP_SUPERVISOR", "1"),
            ("OSSMOUNT_SUPERVISOR_LINK", "/tmp/supervisord.conf"),
            ("OSSMOUNT_INET_PORT", "*:9001"),
            ("OSSMOUNT_INET_USERNAME", "admin"),
            ("OSSMOUNT_SUPERVISOR_USER", ""),
        ]);
        let config =
            Config::from_snapshot(&snapshot, &GlobalOptions::default()).expect("config");
        assert!(!config.supervisor().enabled);
        assert_eq!(config.supervisor().link, PathBuf::from("/tmp/supervisord.conf"));
        assert_eq!(config.supervisor().user, "root");
        let settings = config.primary_settings();
        let inet = settings.inet.expect("inet");
        assert_eq!(inet.port, "*:9001");
        assert_eq!(inet.username.as_deref(), Some("admin"));
        assert!(inet.password.is_none());
        assert_eq!(
            settings.pidfile,
            PathBuf::from("/home/ossfs/run/supervisord.pid")
        );
    }

    #[test]
    fn home_with_whitespace_is_rejected() {
        let global = GlobalOptions {
            home: Some(PathBuf::from("/srv/oss home")),
            ..GlobalOptions::default()
        };
        let err = Config::from_snapshot(&EnvSnapshot::testing(&[]), &global)
            .expect_err("whitespace home");
        assert!(matches!(
            err.downcast_ref::<ValidationError>(),
            Some(ValidationError::InvalidField { field: "home", .. })
        ));

        let snapshot = EnvSnapshot::testing(&[("OSSMOUNT_HOME", "/srv/oss\thome")]);
        assert!(Config::from_snapshot(&snapshot, &GlobalOptions::default()).is_err());
    }
}
