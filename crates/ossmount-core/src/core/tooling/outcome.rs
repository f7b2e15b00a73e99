use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub status: CommandStatus,
    pub message: String,
    #[serde(default)]
    pub details: Value,
}

impl ExecutionOutcome {
    pub fn success(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Ok,
            message: message.into(),
            details,
        }
    }

    pub fn failure(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::Failure,
            message: message.into(),
            details,
        }
    }

    pub fn user_error(message: impl Into<String>, details: Value) -> Self {
        Self {
            status: CommandStatus::UserError,
            message: message.into(),
            details,
        }
    }

    /// The `details.reason` code, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.details.get("reason").and_then(Value::as_str)
    }
}

/// A failure the operator can fix, carried through `anyhow` until the
/// command boundary turns it into an [`ExecutionOutcome::user_error`].
#[derive(thiserror::Error, Debug)]
#[error("{message}")]
pub struct UserError {
    pub(crate) message: String,
    pub(crate) details: Value,
}

impl UserError {
    pub fn new(message: impl Into<String>, details: Value) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn details(&self) -> &Value {
        &self.details
    }
}

/// An external program (package manager, downloader, supervisor control)
/// finished unsuccessfully.
#[derive(thiserror::Error, Debug, Clone)]
#[error("`{command}` failed with exit code {code}")]
pub struct ExternalCommandError {
    pub command: String,
    pub code: i32,
    pub stderr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum CommandStatus {
    Ok,
    UserError,
    Failure,
}
