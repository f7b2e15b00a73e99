use anyhow::Result;
use ossmount_domain::{LinkState, MOUNT_DRIVER};
use serde_json::{json, Value};

use crate::{CommandContext, ExecutionOutcome};

/// Read-only report of what is configured under the base directory.
///
/// # Errors
/// Returns an error if the store or manifest cannot be read.
pub fn status(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    let layout = ctx.layout();
    let store = ctx.credential_store();
    let records = store.list()?;
    let registry = ctx.mount_registry()?;
    let manager = ctx.supervisor_configs();
    let link = manager.link_state()?;

    let mounts: Vec<_> = registry
        .iter()
        .map(|record| {
            json!({
                "local_path": record.local_path.display().to_string(),
                "bucket": record.bucket,
                "program": record.program,
                "script_present": record.script.is_file(),
                "fragment_present": record.fragment.is_file(),
            })
        })
        .collect();

    let mut details = json!({
        "home": layout.home().display().to_string(),
        "store": {
            "path": store.path().display().to_string(),
            "records": records.len(),
            "mode": store_mode(store.path()),
        },
        "mounts": mounts,
        "primary_config": {
            "path": manager.primary().display().to_string(),
            "present": manager.primary().is_file(),
        },
        "link": {
            "path": manager.link().display().to_string(),
            "state": link.as_str(),
        },
        "supervisor_enabled": ctx.config().supervisor().enabled,
        "driver": ctx
            .tools()
            .locate(MOUNT_DRIVER)
            .map(|path| path.display().to_string()),
    });
    if let LinkState::OtherLink(target) = &link {
        details["link"]["target"] = json!(target.display().to_string());
    }
    if records.is_empty() {
        details["hint"] = json!("Add credentials with `ossmount secret add`.");
    } else if registry.is_empty() {
        details["hint"] = json!("Configure a mount with `ossmount mount add`.");
    } else if link != LinkState::Active {
        details["hint"] = json!("Run `ossmount supervisor activate` to use the generated config.");
    }

    let message = format!(
        "{} credential(s), {} mount(s), link {}",
        records.len(),
        registry.len(),
        link.as_str()
    );
    Ok(ExecutionOutcome::success(message, details))
}

#[cfg(unix)]
fn store_mode(path: &std::path::Path) -> Value {
    ossmount_domain::fs::file_mode(path)
        .map(|mode| json!(format!("{mode:04o}")))
        .unwrap_or(Value::Null)
}

#[cfg(not(unix))]
fn store_mode(_path: &std::path::Path) -> Value {
    Value::Null
}
