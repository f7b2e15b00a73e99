#![deny(clippy::all)]

mod core;

pub(crate) use crate::core::config;
pub(crate) use crate::core::config::context;
pub(crate) use crate::core::runtime::effects;
pub(crate) use crate::core::tooling::outcome;

#[cfg(test)]
pub(crate) use crate::core::commands::{mounts, secrets};
#[cfg(test)]
pub(crate) use crate::core::runtime::process;
#[cfg(test)]
pub(crate) use crate::core::testing;

pub use crate::core::config::context::{CommandContext, CommandInfo};
pub use crate::core::config::{Config, GlobalOptions, Layout};
pub use crate::core::runtime::effects::{
    Downloader, Effects, PackageManager, SharedEffects, SupervisorControl, SystemEffects,
    ToolLocator,
};
pub use crate::core::runtime::process::RunOutput;
pub use crate::core::runtime::{
    format_status_message, outcome_from_error, to_json_response, CommandGroup,
};
pub use crate::core::tooling::outcome::{
    CommandStatus, ExecutionOutcome, ExternalCommandError, UserError,
};

pub use crate::core::commands::driver::{driver_install, DriverInstallRequest};
pub use crate::core::commands::mounts::{mount_add, mount_list, MountAddRequest};
pub use crate::core::commands::secrets::{
    credentials_present, secret_add, secret_add_all, secret_check, secret_list, SecretAddRequest,
};
pub use crate::core::commands::status::status;
pub use crate::core::commands::supervisor::{
    supervisor_activate, supervisor_restart, SupervisorActivateRequest,
};
