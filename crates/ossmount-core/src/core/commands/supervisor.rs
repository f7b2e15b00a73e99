use anyhow::Result;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::outcome::{ExternalCommandError, UserError};
use crate::{CommandContext, ExecutionOutcome};

/// `supervisorctl status` exits 3 when some programs are not running; the
/// daemon still answered.
const STATUS_NOT_ALL_RUNNING: i32 = 3;

#[derive(Clone, Debug)]
pub struct SupervisorActivateRequest {
    pub force: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct DaemonReport {
    /// `started` or `reloaded`.
    pub action: &'static str,
    pub status: String,
}

/// Points the well-known supervisor config location at the generated config.
///
/// # Errors
/// Returns an error when the location holds a directory or a foreign config
/// (without `force`), or when the link cannot be replaced.
pub fn supervisor_activate(
    ctx: &CommandContext,
    request: &SupervisorActivateRequest,
) -> Result<ExecutionOutcome> {
    let manager = ctx.supervisor_configs();
    require_primary(ctx)?;
    let outcome = manager.activate(request.force)?;
    let mut details = json!({
        "result": outcome.as_str(),
        "link": manager.link().display().to_string(),
        "primary_config": manager.primary().display().to_string(),
    });
    if let ossmount_domain::LinkOutcome::BackedUp { backup } = &outcome {
        details["backup"] = json!(backup.display().to_string());
    }
    let message = if outcome == ossmount_domain::LinkOutcome::AlreadyActive {
        format!("{} already points at the generated config", manager.link().display())
    } else {
        format!("{} -> {}", manager.link().display(), manager.primary().display())
    };
    Ok(ExecutionOutcome::success(message, details))
}

/// Starts or reloads the daemon and reports its status.
///
/// # Errors
/// Returns an error when daemon control is disabled, the config is missing,
/// or a supervisor command fails.
pub fn supervisor_restart(ctx: &CommandContext) -> Result<ExecutionOutcome> {
    if !ctx.config().supervisor().enabled {
        return Err(UserError::new(
            "supervisor control is disabled",
            json!({
                "reason": "supervisor_disabled",
                "hint": "Unset OSSMOUNT_SKIP_SUPERVISOR to let ossmount drive supervisord.",
            }),
        )
        .into());
    }
    require_primary(ctx)?;
    let report = restart_daemon(ctx)?;
    Ok(ExecutionOutcome::success(
        format!("supervisord {}", report.action),
        json!({
            "action": report.action,
            "status": report.status,
            "primary_config": ctx.layout().primary_config().display().to_string(),
        }),
    ))
}

fn require_primary(ctx: &CommandContext) -> Result<()> {
    let primary = ctx.layout().primary_config();
    if primary.is_file() {
        return Ok(());
    }
    Err(UserError::new(
        format!("no supervisor config at {}", primary.display()),
        json!({
            "reason": "missing_supervisor_config",
            "hint": "Configure a mount first with `ossmount mount add`.",
        }),
    )
    .into())
}

/// Reloads a running daemon (`reread` + `update`) or starts a new one, then
/// asks it for program status.
pub(crate) fn restart_daemon(ctx: &CommandContext) -> Result<DaemonReport> {
    let control = ctx.supervisor();
    let primary = ctx.layout().primary_config();

    let answering = ctx.layout().pidfile().is_file() && {
        let reply = control.ctl(&primary, &["status"])?;
        reply.succeeded() || reply.code == STATUS_NOT_ALL_RUNNING
    };

    let action = if answering {
        for step in ["reread", "update"] {
            control
                .ctl(&primary, &[step])?
                .checked(&format!("supervisorctl {step}"))?;
        }
        "reloaded"
    } else {
        debug!(config = %primary.display(), "supervisord not answering; starting it");
        control.start(&primary)?;
        "started"
    };

    let status = control.ctl(&primary, &["status"])?;
    info!(action, code = status.code, "supervisord {action}");
    Ok(DaemonReport {
        action,
        status: status.stdout.trim_end().to_string(),
    })
}

/// True when `err` came from a supervisor control command.
pub(crate) fn is_control_failure(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ExternalCommandError>()
        .is_some_and(|failure| failure.command.starts_with("supervisor"))
}
