use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use ossmount_domain::{select_record, MountDefinition, ProgramSpec, ValidationError};
use serde_json::{json, Value};
use tracing::warn;

use super::supervisor::{is_control_failure, restart_daemon};
use crate::{outcome_from_error, CommandContext, ExecutionOutcome};

#[derive(Clone, Debug)]
pub struct MountAddRequest {
    /// 1-based credential index; may be omitted when exactly one is stored.
    pub index: Option<usize>,
    pub local_path: PathBuf,
    pub region: String,
    /// Regenerate a path already configured with different settings.
    pub replace: bool,
    /// Back up and replace a foreign config at the link location.
    pub force_link: bool,
    pub restart: bool,
}

/// Configures one bucket mount end to end: manifest entry, start script,
/// supervisor fragment, primary config include, link, and daemon reload.
///
/// Re-running with the same inputs changes nothing on disk and reports
/// `already-configured`.
///
/// # Errors
/// Returns validation errors for bad input before anything is written, and
/// I/O errors naming the artifact that could not be written.
pub fn mount_add(ctx: &CommandContext, request: &MountAddRequest) -> Result<ExecutionOutcome> {
    let layout = ctx.layout();
    let store = ctx.credential_store();
    let records = store.list()?;
    if records.is_empty() {
        return Err(ValidationError::EmptyStore {
            path: store.path().display().to_string(),
        }
        .into());
    }
    let index = match (request.index, records.len()) {
        (Some(index), _) => index,
        (None, 1) => 1,
        (None, _) => return Err(ValidationError::MissingField { field: "index" }.into()),
    };
    let record = select_record(&records, index)?;
    let def = MountDefinition::new(
        &record.bucket,
        &request.local_path,
        &request.region,
        store.path(),
    )?;

    let mut registry = ctx.mount_registry()?;
    let was_recorded = registry.get(&def.local_path).is_some();
    let synthesizer = ctx.script_synthesizer();
    let manager = ctx.supervisor_configs();
    let script = synthesizer.synthesize(
        &mut registry,
        &def,
        |program| manager.fragment_path(program),
        request.replace,
    )?;

    fs::create_dir_all(&def.local_path)
        .with_context(|| format!("failed to create mount point {}", def.local_path.display()))?;
    for dir in [layout.log_dir(), layout.run_dir()] {
        fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let program = ProgramSpec::for_script(
        &script.program,
        &script.script,
        &def.local_path,
        &layout.log_dir(),
    );
    let fragment_changed = manager.write_fragment(&program)?;
    let include = manager.ensure_primary_config(&ctx.config().primary_settings())?;
    if !(script.result.is_noop() && was_recorded) {
        registry.save()?;
    }
    let link = manager.activate(request.force_link)?;

    let mut details = json!({
        "result": script.result.as_str(),
        "local_path": def.local_path_str(),
        "bucket": def.bucket,
        "region": def.region_endpoint,
        "index": index,
        "program": script.program,
        "script": script.script.display().to_string(),
        "fragment": manager.fragment_path(&script.program).display().to_string(),
        "fragment_changed": fragment_changed,
        "primary_config": manager.primary().display().to_string(),
        "include": include.as_str(),
        "link": manager.link().display().to_string(),
        "link_result": link.as_str(),
    });

    let message = if script.result.is_noop() {
        format!("{} already configured for bucket {}", def.local_path_str(), def.bucket)
    } else {
        format!("configured {} for bucket {}", def.local_path_str(), def.bucket)
    };

    if !request.restart || !ctx.config().supervisor().enabled {
        details["daemon"] = Value::Null;
        return Ok(ExecutionOutcome::success(message, details));
    }
    match restart_daemon(ctx) {
        Ok(report) => {
            details["daemon"] = json!(report);
            Ok(ExecutionOutcome::success(message, details))
        }
        Err(err) if is_control_failure(&err) => {
            warn!(error = %err, "configuration written but supervisord did not reload");
            let failure = outcome_from_error(&err);
            details["reason"] = json!("supervisor_control_failed");
            details["daemon_error"] = failure.details;
            details["hint"] =
                json!("The mount is configured; fix supervisord and run `ossmount supervisor restart`.");
            Ok(ExecutionOutcome::failure(
                format!("{message}, but {err}"),
                details,
            ))
        }
        Err(err) => Err(err),
    }
}

/// Lists configured mounts from the manifest.
///
/// # Errors
/// Returns an error if the manifest cannot be read.
pub fn mount_list(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let registry = ctx.mount_registry()?;
    let mounts: Vec<_> = registry
        .iter()
        .map(|record| {
            json!({
                "local_path": record.local_path.display().to_string(),
                "bucket": record.bucket,
                "region": record.region_endpoint,
                "program": record.program,
                "script": record.script.display().to_string(),
                "fragment": record.fragment.display().to_string(),
                "configured_at": record.configured_at,
            })
        })
        .collect();
    let message = if mounts.is_empty() {
        "no mounts configured".to_string()
    } else {
        format!("{} mount(s) configured", mounts.len())
    };
    Ok(ExecutionOutcome::success(
        message,
        json!({
            "manifest": registry.path().display().to_string(),
            "mounts": mounts,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use ossmount_domain::supervisor::ini::IniDocument;

    use super::*;
    use crate::outcome::CommandStatus;
    use crate::secrets::{secret_add, SecretAddRequest};
    use crate::testing::TestHost;

    fn add_secret(host: &TestHost, bucket: &str) {
        secret_add(
            &host.context(),
            &SecretAddRequest {
                bucket: bucket.to_string(),
                access_key_id: "AK123".to_string(),
                access_key_secret: "SK456".to_string(),
            },
        )
        .expect("secret");
    }

    fn request(host: &TestHost, index: Option<usize>, name: &str) -> MountAddRequest {
        MountAddRequest {
            index,
            local_path: host.root().join("mnt").join(name),
            region: "oss-cn-hongkong.aliyuncs.com".to_string(),
            replace: false,
            force_link: false,
            restart: true,
        }
    }

    #[test]
    fn index_bounds_are_validation_errors() {
        let host = TestHost::new();
        add_secret(&host, "media");
        add_secret(&host, "backup");

        for index in [Some(0), Some(3), None] {
            let err = mount_add(&host.context(), &request(&host, index, "media"))
                .expect_err("out of range");
            let outcome = outcome_from_error(&err);
            assert_eq!(outcome.status, CommandStatus::UserError);
            assert_eq!(outcome.details["field"], "index");
        }
        assert!(!host.layout().manifest().exists());
        assert!(!host.layout().scripts_dir().exists());
    }

    #[test]
    fn empty_store_is_reported() {
        let host = TestHost::new();
        let err = mount_add(&host.context(), &request(&host, Some(1), "media")).expect_err("empty");
        assert_eq!(outcome_from_error(&err).reason(), Some("empty_store"));
    }

    #[test]
    fn pipeline_writes_every_artifact_and_restarts() {
        let host = TestHost::new();
        add_secret(&host, "media");

        let outcome =
            mount_add(&host.context(), &request(&host, None, "media")).expect("mount add");
        assert_eq!(outcome.status, CommandStatus::Ok);
        assert_eq!(outcome.details["result"], "created");
        assert_eq!(outcome.details["include"], "created");
        assert_eq!(outcome.details["link_result"], "created");
        assert_eq!(outcome.details["daemon"]["action"], "started");

        let local = host.root().join("mnt").join("media");
        assert!(local.is_dir());
        let script = PathBuf::from(outcome.details["script"].as_str().expect("script"));
        let body = fs::read_to_string(&script).expect("script body");
        assert!(body.contains(&format!("umount {}", local.display())));
        assert!(body.contains("oss-cn-hongkong.aliyuncs.com"));

        let primary = fs::read_to_string(host.layout().primary_config()).expect("primary");
        let doc = IniDocument::parse(&primary);
        assert_eq!(doc.values("include", "files").len(), 1);
        let fragment = PathBuf::from(outcome.details["fragment"].as_str().expect("fragment"));
        assert!(fragment.starts_with(host.layout().fragments_dir()));
        assert!(host.layout().log_dir().is_dir());
        assert!(host.layout().run_dir().is_dir());
    }

    #[test]
    fn rerun_is_already_configured_and_leaves_files_alone() {
        let host = TestHost::new();
        add_secret(&host, "media");
        let first = mount_add(&host.context(), &request(&host, Some(1), "media")).expect("first");
        let script = PathBuf::from(first.details["script"].as_str().expect("script"));
        let snapshot = |path: &Path| fs::read(path).expect("read");
        let before = [
            snapshot(&script),
            snapshot(&host.layout().primary_config()),
            snapshot(&host.layout().manifest()),
        ];

        let second = mount_add(&host.context(), &request(&host, Some(1), "media")).expect("second");
        assert_eq!(second.status, CommandStatus::Ok);
        assert_eq!(second.details["result"], "already-configured");
        assert_eq!(second.details["fragment_changed"], false);
        assert_eq!(second.details["include"], "already-present");
        assert_eq!(second.details["link_result"], "already-active");
        let after = [
            snapshot(&script),
            snapshot(&host.layout().primary_config()),
            snapshot(&host.layout().manifest()),
        ];
        assert_eq!(before, after);
    }

    #[test]
    fn second_mount_gets_its_own_script_and_fragment() {
        let host = TestHost::new();
        add_secret(&host, "media");
        add_secret(&host, "backup");
        let a = mount_add(&host.context(), &request(&host, Some(1), "media")).expect("a");
        let a_script = PathBuf::from(a.details["script"].as_str().expect("script"));
        let a_bytes = fs::read(&a_script).expect("read");

        let b = mount_add(&host.context(), &request(&host, Some(2), "backup")).expect("b");
        assert_ne!(a.details["script"], b.details["script"]);
        assert_ne!(a.details["fragment"], b.details["fragment"]);
        assert_eq!(fs::read(&a_script).expect("read"), a_bytes);

        let listed = mount_list(&host.context()).expect("list");
        let buckets: Vec<_> = listed.details["mounts"]
            .as_array()
            .expect("mounts")
            .iter()
            .map(|m| m["bucket"].as_str().unwrap_or_default().to_string())
            .collect();
        assert_eq!(buckets, ["media", "backup"]);
    }

    #[test]
    fn changed_bucket_for_same_path_needs_replace() {
        let host = TestHost::new();
        add_secret(&host, "media");
        add_secret(&host, "archive");
        mount_add(&host.context(), &request(&host, Some(1), "shared")).expect("first");

        let err = mount_add(&host.context(), &request(&host, Some(2), "shared"))
            .expect_err("conflict");
        assert_eq!(outcome_from_error(&err).reason(), Some("mount_conflict"));

        let mut replace = request(&host, Some(2), "shared");
        replace.replace = true;
        let outcome = mount_add(&host.context(), &replace).expect("replace");
        assert_eq!(outcome.details["result"], "replaced");
        assert_eq!(outcome.details["bucket"], "archive");
    }

    #[test]
    fn daemon_failure_keeps_written_configuration() {
        let host = TestHost::new();
        add_secret(&host, "media");
        *host.effects.failing.lock().expect("lock") = Some("supervisord".to_string());

        let outcome =
            mount_add(&host.context(), &request(&host, Some(1), "media")).expect("outcome");
        assert_eq!(outcome.status, CommandStatus::Failure);
        assert_eq!(outcome.reason(), Some("supervisor_control_failed"));
        assert!(host.layout().primary_config().is_file());
        assert!(host.layout().manifest().is_file());
    }

    #[test]
    fn skipped_supervisor_writes_config_without_daemon_calls() {
        let host = TestHost::with_env(&[("OSSMOUNT_SKIP_SUPERVISOR", "1")]);
        add_secret(&host, "media");
        let outcome =
            mount_add(&host.context(), &request(&host, Some(1), "media")).expect("mount add");
        assert!(outcome.details["daemon"].is_null());
        assert!(host.effects.calls().is_empty());
        assert!(host.layout().primary_config().is_file());
    }
}
