use std::fmt;

use ossmount_domain::{ArtifactError, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::CommandInfo;
use crate::outcome::{CommandStatus, ExecutionOutcome, ExternalCommandError, UserError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandGroup {
    Secret,
    Mount,
    Supervisor,
    Driver,
    Status,
}

impl fmt::Display for CommandGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandGroup::Secret => "secret",
            CommandGroup::Mount => "mount",
            CommandGroup::Supervisor => "supervisor",
            CommandGroup::Driver => "driver",
            CommandGroup::Status => "status",
        };
        f.write_str(name)
    }
}

/// Maps a command error to the outcome the operator sees.
///
/// Input problems and refusals become user errors; failing external commands
/// and filesystem errors become failures naming what failed.
#[must_use]
pub fn outcome_from_error(err: &anyhow::Error) -> ExecutionOutcome {
    if let Some(invalid) = err.downcast_ref::<ValidationError>() {
        let mut details = json!({ "reason": invalid.reason() });
        if let Some(hint) = invalid.hint() {
            details["hint"] = json!(hint);
        }
        if let Some(field) = validation_field(invalid) {
            details["field"] = json!(field);
        }
        return ExecutionOutcome::user_error(invalid.to_string(), details);
    }
    if let Some(refusal) = err.downcast_ref::<ArtifactError>() {
        return ExecutionOutcome::user_error(
            refusal.to_string(),
            json!({ "reason": refusal.reason(), "hint": refusal.hint() }),
        );
    }
    if let Some(user) = err.downcast_ref::<UserError>() {
        return ExecutionOutcome::user_error(user.message().to_string(), user.details().clone());
    }
    if let Some(external) = err.downcast_ref::<ExternalCommandError>() {
        return ExecutionOutcome::failure(
            err.to_string(),
            json!({
                "reason": "external_command_failed",
                "command": external.command,
                "code": external.code,
                "stderr": external.stderr,
            }),
        );
    }
    let issues: Vec<String> = err.chain().map(ToString::to_string).collect();
    ExecutionOutcome::failure(
        err.to_string(),
        json!({
            "reason": "internal_error",
            "error": err.to_string(),
            "issues": issues,
            "hint": "Re-run with `-v` for more detail.",
        }),
    )
}

/// The operator-supplied value a validation error is about, when re-asking
/// for that one value can fix it.
fn validation_field(err: &ValidationError) -> Option<&'static str> {
    match err {
        ValidationError::IndexOutOfRange { .. } => Some("index"),
        ValidationError::MissingField { field } | ValidationError::InvalidField { field, .. } => {
            Some(*field)
        }
        ValidationError::RelativeMountPath { .. } => Some("path"),
        ValidationError::DuplicateBucket { .. } => Some("bucket"),
        _ => None,
    }
}

#[must_use]
pub fn to_json_response(info: CommandInfo, outcome: &ExecutionOutcome) -> Value {
    let status = match outcome.status {
        CommandStatus::Ok => "ok",
        CommandStatus::UserError => "user-error",
        CommandStatus::Failure => "error",
    };
    let details = match &outcome.details {
        Value::Object(_) => outcome.details.clone(),
        Value::Null => json!({}),
        other => json!({ "value": other }),
    };
    json!({
        "status": status,
        "message": format_status_message(info, &outcome.message),
        "details": details,
    })
}

#[must_use]
pub fn format_status_message(info: CommandInfo, message: &str) -> String {
    let group_name = info.group.to_string();
    let prefix = if group_name == info.name {
        format!("ossmount {}", info.name)
    } else {
        format!("ossmount {} {}", group_name, info.name)
    };
    if message.is_empty() {
        prefix
    } else if message.starts_with(&prefix) {
        message.to_string()
    } else {
        format!("{prefix}: {message}")
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn validation_errors_are_user_errors_with_field() {
        let err = anyhow::Error::from(ValidationError::IndexOutOfRange { index: 0, count: 2 });
        let outcome = outcome_from_error(&err);
        assert_eq!(outcome.status, CommandStatus::UserError);
        assert_eq!(outcome.reason(), Some("index_out_of_range"));
        assert_eq!(outcome.details["field"], "index");
        assert!(outcome.details["hint"].is_string());
    }

    #[test]
    fn io_failures_name_the_artifact() {
        let err = Err::<(), _>(std::io::Error::from(std::io::ErrorKind::PermissionDenied))
            .context("failed to replace /home/ossfs/passwd/passwd-ossfs")
            .expect_err("error");
        let outcome = outcome_from_error(&err);
        assert_eq!(outcome.status, CommandStatus::Failure);
        assert!(outcome.message.contains("/home/ossfs/passwd/passwd-ossfs"));
        assert_eq!(outcome.details["issues"].as_array().map(Vec::len), Some(2));
    }

    #[test]
    fn external_command_failures_carry_the_command() {
        let err = anyhow::Error::from(ExternalCommandError {
            command: "apt-get install -y supervisor".to_string(),
            code: 100,
            stderr: "E: Unable to locate package".to_string(),
        });
        let outcome = outcome_from_error(&err);
        assert_eq!(outcome.status, CommandStatus::Failure);
        assert_eq!(outcome.details["command"], "apt-get install -y supervisor");
        assert_eq!(outcome.details["code"], 100);
    }

    #[test]
    fn status_message_prefix() {
        let info = CommandInfo::new(CommandGroup::Mount, "add");
        assert_eq!(
            format_status_message(info, "configured /mnt/media"),
            "ossmount mount add: configured /mnt/media"
        );
        let status = CommandInfo::new(CommandGroup::Status, "status");
        assert_eq!(format_status_message(status, ""), "ossmount status");
    }
}
