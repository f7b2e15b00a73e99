use anyhow::{Context, Result};
use ossmount_domain::MOUNT_DRIVER;
use serde_json::json;
use tracing::info;
use url::Url;

use crate::outcome::UserError;
use crate::{CommandContext, ExecutionOutcome};

/// Packages the mount driver and its supervisor need on the host.
pub const PREREQUISITES: &[&str] = &["supervisor", "gdebi-core"];

#[derive(Clone, Debug)]
pub struct DriverInstallRequest {
    pub url: Option<String>,
    /// Reinstall even when the driver is already on `PATH`.
    pub force: bool,
}

/// Installs the ossfs driver package and the supervisor daemon.
///
/// # Errors
/// Returns an error for an invalid URL or when the package manager or the
/// download fails.
pub fn driver_install(
    ctx: &CommandContext,
    request: &DriverInstallRequest,
) -> Result<ExecutionOutcome> {
    if !request.force {
        if let Some(existing) = ctx.tools().locate(MOUNT_DRIVER) {
            return Ok(ExecutionOutcome::success(
                format!("{MOUNT_DRIVER} already installed at {}", existing.display()),
                json!({
                    "result": "already-installed",
                    "path": existing.display().to_string(),
                    "hint": "Pass --force to reinstall.",
                }),
            ));
        }
    }

    let raw = request
        .url
        .as_deref()
        .unwrap_or(&ctx.config().driver().url)
        .trim()
        .to_string();
    let url = Url::parse(&raw).map_err(|err| {
        UserError::new(
            format!("invalid driver URL {raw}: {err}"),
            json!({ "reason": "invalid_url", "field": "url" }),
        )
    })?;
    let file_name = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("ossfs.deb")
        .to_string();

    ctx.packages().install(PREREQUISITES)?;

    let staging = tempfile::tempdir().context("failed to create download directory")?;
    let package = staging.path().join(&file_name);
    let bytes = ctx.downloader().fetch(url.as_str(), &package)?;
    ctx.packages().install_local(&package)?;
    info!(package = %file_name, "{MOUNT_DRIVER} installed");

    Ok(ExecutionOutcome::success(
        format!("installed {MOUNT_DRIVER} from {file_name}"),
        json!({
            "result": "installed",
            "url": url.as_str(),
            "package": file_name,
            "bytes": bytes,
            "prerequisites": PREREQUISITES,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::outcome_from_error;
    use crate::testing::TestHost;

    #[test]
    fn existing_driver_is_left_alone() {
        let host = TestHost::new();
        *host.effects.ossfs.lock().expect("lock") = Some(PathBuf::from("/usr/local/bin/ossfs"));
        let outcome = driver_install(
            &host.context(),
            &DriverInstallRequest {
                url: None,
                force: false,
            },
        )
        .expect("install");
        assert_eq!(outcome.details["result"], "already-installed");
        assert!(host.effects.calls().is_empty());
    }

    #[test]
    fn installs_prerequisites_then_downloaded_package() {
        let host = TestHost::new();
        let outcome = driver_install(
            &host.context(),
            &DriverInstallRequest {
                url: None,
                force: false,
            },
        )
        .expect("install");
        assert_eq!(outcome.details["package"], "ossfs_1.91.3_ubuntu20.04_amd64.deb");
        assert_eq!(
            host.effects.calls(),
            [
                "install supervisor gdebi-core".to_string(),
                format!("fetch {}", crate::config::DEFAULT_DRIVER_URL),
                "install-local ossfs_1.91.3_ubuntu20.04_amd64.deb present".to_string(),
            ]
        );
    }

    #[test]
    fn invalid_url_is_a_user_error() {
        let host = TestHost::new();
        let err = driver_install(
            &host.context(),
            &DriverInstallRequest {
                url: Some("not a url".to_string()),
                force: true,
            },
        )
        .expect_err("invalid");
        assert_eq!(outcome_from_error(&err).reason(), Some("invalid_url"));
        assert!(host.effects.calls().is_empty());
    }
}
