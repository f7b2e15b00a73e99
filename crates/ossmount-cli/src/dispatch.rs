use color_eyre::Result;
use ossmount_core::{
    credentials_present, driver_install, mount_add, mount_list, outcome_from_error,
    secret_add_all, secret_check, secret_list, status, supervisor_activate, supervisor_restart,
    CommandContext, CommandGroup, CommandInfo, CommandStatus, DriverInstallRequest,
    ExecutionOutcome, MountAddRequest, SecretAddRequest, SupervisorActivateRequest,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{
    CommandGroupCli, DriverCommand, MountAddArgs, MountCommand, SecretAddArgs, SecretCommand,
    SupervisorCommand,
};
use crate::prompt::Prompter;

/// Upper bound on re-asking for a rejected value before giving up.
const MAX_PROMPTS: usize = 5;

/// Names the command for output before anything runs.
pub fn command_info(group: &CommandGroupCli) -> CommandInfo {
    match group {
        CommandGroupCli::Secret { command } => match command {
            SecretCommand::Add(_) => CommandInfo::new(CommandGroup::Secret, "add"),
            SecretCommand::List => CommandInfo::new(CommandGroup::Secret, "list"),
        },
        CommandGroupCli::Mount { command } => match command {
            MountCommand::Add(_) => CommandInfo::new(CommandGroup::Mount, "add"),
            MountCommand::List => CommandInfo::new(CommandGroup::Mount, "list"),
        },
        CommandGroupCli::Supervisor { command } => match command {
            SupervisorCommand::Activate(_) => CommandInfo::new(CommandGroup::Supervisor, "activate"),
            SupervisorCommand::Restart => CommandInfo::new(CommandGroup::Supervisor, "restart"),
        },
        CommandGroupCli::Driver {
            command: DriverCommand::Install(_),
        } => CommandInfo::new(CommandGroup::Driver, "install"),
        CommandGroupCli::Status => CommandInfo::new(CommandGroup::Status, "status"),
    }
}

pub fn dispatch_command(
    ctx: &CommandContext,
    group: &CommandGroupCli,
    prompter: &Prompter,
) -> Result<(CommandInfo, ExecutionOutcome)> {
    let info = command_info(group);
    match group {
        CommandGroupCli::Secret { command } => match command {
            SecretCommand::Add(args) => Ok((info, dispatch_secret_add(ctx, info, args, prompter)?)),
            SecretCommand::List => core_call(info, || secret_list(ctx)),
        },
        CommandGroupCli::Mount { command } => match command {
            MountCommand::Add(args) => Ok((info, dispatch_mount_add(ctx, info, args, prompter)?)),
            MountCommand::List => core_call(info, || mount_list(ctx)),
        },
        CommandGroupCli::Supervisor { command } => match command {
            SupervisorCommand::Activate(args) => {
                let request = SupervisorActivateRequest { force: args.force };
                core_call(info, || supervisor_activate(ctx, &request))
            }
            SupervisorCommand::Restart => core_call(info, || supervisor_restart(ctx)),
        },
        CommandGroupCli::Driver {
            command: DriverCommand::Install(args),
        } => {
            let request = DriverInstallRequest {
                url: args.url.clone(),
                force: args.force,
            };
            core_call(info, || driver_install(ctx, &request))
        }
        CommandGroupCli::Status => core_call(info, || status(ctx)),
    }
}

enum Collected {
    Entry(SecretAddRequest),
    Rejected(ExecutionOutcome),
}

/// Collects one or more entries, asking "another?" between them, and stores
/// them in a single write.
fn dispatch_secret_add(
    ctx: &CommandContext,
    info: CommandInfo,
    args: &SecretAddArgs,
    prompter: &Prompter,
) -> Result<ExecutionOutcome> {
    let blank = SecretAddArgs::default();
    let mut batch: Vec<SecretAddRequest> = Vec::new();
    loop {
        let given = if batch.is_empty() { args } else { &blank };
        match collect_secret(ctx, &batch, given, prompter)? {
            Collected::Entry(request) => batch.push(request),
            Collected::Rejected(outcome) => return Ok(outcome),
        }
        if !prompter.confirm("Add credentials for another bucket?")? {
            break;
        }
    }
    Ok(core_call(info, || secret_add_all(ctx, &batch))?.1)
}

fn collect_secret(
    ctx: &CommandContext,
    pending: &[SecretAddRequest],
    given: &SecretAddArgs,
    prompter: &Prompter,
) -> Result<Collected> {
    let mut bucket = given.bucket.clone();
    let mut key_id = given.key_id.clone();
    let mut key_secret = given.key_secret.clone();
    prompter.fill(&mut bucket, "Bucket name")?;
    prompter.fill(&mut key_id, "AccessKey ID")?;
    prompter.fill(&mut key_secret, "AccessKey secret")?;

    let mut attempts = 0;
    loop {
        let request = SecretAddRequest {
            bucket: bucket.clone().unwrap_or_default(),
            access_key_id: key_id.clone().unwrap_or_default(),
            access_key_secret: key_secret.clone().unwrap_or_default(),
        };
        let mut candidate = pending.to_vec();
        candidate.push(request.clone());
        let Err(err) = secret_check(ctx, &candidate) else {
            return Ok(Collected::Entry(request));
        };
        let outcome = outcome_from_error(&err);
        attempts += 1;
        let slot = match rejected_field(&outcome, prompter) {
            Some("bucket") => &mut bucket,
            Some("access_key_id") => &mut key_id,
            Some("access_key_secret") => &mut key_secret,
            _ => return Ok(Collected::Rejected(outcome)),
        };
        if attempts >= MAX_PROMPTS {
            return Ok(Collected::Rejected(outcome));
        }
        prompter.note(&outcome.message);
        match prompter.ask(field_label(&outcome))? {
            Some(answer) => *slot = Some(answer),
            None => return Ok(Collected::Rejected(outcome)),
        }
    }
}

fn dispatch_mount_add(
    ctx: &CommandContext,
    info: CommandInfo,
    args: &MountAddArgs,
    prompter: &Prompter,
) -> Result<ExecutionOutcome> {
    if let Some(failed) = ensure_credentials(ctx, args, prompter)? {
        return Ok(failed);
    }
    let mut request = MountAddRequest {
        index: args.index,
        local_path: args.path.clone().unwrap_or_default(),
        region: args.region.clone().unwrap_or_default(),
        replace: args.replace,
        force_link: args.force_link,
        restart: !args.no_restart,
    };

    let mut attempts = 0;
    loop {
        let (_, outcome) = core_call(info, || mount_add(ctx, &request))?;
        attempts += 1;
        let Some(field) = rejected_field(&outcome, prompter) else {
            return Ok(outcome);
        };
        if attempts >= MAX_PROMPTS {
            return Ok(outcome);
        }
        prompter.note(&outcome.message);
        let answered = match field {
            "index" => {
                show_buckets(ctx, prompter);
                prompter
                    .ask_index("Bucket index")?
                    .map(|index| request.index = Some(index))
            }
            "path" => prompter
                .ask("Local mount path")?
                .map(|answer| request.local_path = answer.into()),
            "region" => prompter
                .ask("Region endpoint (e.g. oss-cn-hongkong.aliyuncs.com)")?
                .map(|answer| request.region = answer),
            _ => return Ok(outcome),
        };
        if answered.is_none() {
            return Ok(outcome);
        }
    }
}

/// With someone at the terminal, an empty store starts the secret-add flow
/// before a bucket is chosen; a populated one offers to add more when no
/// index was given. Returns the outcome only when that flow did not store.
fn ensure_credentials(
    ctx: &CommandContext,
    args: &MountAddArgs,
    prompter: &Prompter,
) -> Result<Option<ExecutionOutcome>> {
    if !prompter.is_interactive() {
        return Ok(None);
    }
    if credentials_present(ctx) {
        if args.index.is_some()
            || !prompter.confirm("Add credentials for another bucket first?")?
        {
            return Ok(None);
        }
    } else {
        prompter.note("No bucket credentials stored yet.");
    }
    let info = CommandInfo::new(CommandGroup::Secret, "add");
    let stored = dispatch_secret_add(ctx, info, &SecretAddArgs::default(), prompter)?;
    if stored.status == CommandStatus::Ok {
        prompter.note(&stored.message);
        return Ok(None);
    }
    Ok(Some(stored))
}

/// The field to re-ask for, when the outcome is a user error about one
/// operator-supplied value and someone is there to answer.
fn rejected_field<'o>(outcome: &'o ExecutionOutcome, prompter: &Prompter) -> Option<&'o str> {
    if outcome.status != CommandStatus::UserError || !prompter.is_interactive() {
        return None;
    }
    outcome.details.get("field").and_then(Value::as_str)
}

fn field_label(outcome: &ExecutionOutcome) -> &'static str {
    match outcome.details.get("field").and_then(Value::as_str) {
        Some("bucket") => "Bucket name",
        Some("access_key_id") => "AccessKey ID",
        _ => "AccessKey secret",
    }
}

fn show_buckets(ctx: &CommandContext, prompter: &Prompter) {
    let Ok(listing) = secret_list(ctx) else {
        return;
    };
    let Some(secrets) = listing.details.get("secrets").and_then(Value::as_array) else {
        return;
    };
    for entry in secrets {
        let index = entry.get("index").and_then(Value::as_u64).unwrap_or_default();
        let bucket = entry.get("bucket").and_then(Value::as_str).unwrap_or_default();
        prompter.note(&format!("  {index}) {bucket}"));
    }
}

fn core_call<F>(info: CommandInfo, action: F) -> Result<(CommandInfo, ExecutionOutcome)>
where
    F: FnOnce() -> anyhow::Result<ExecutionOutcome>,
{
    match action() {
        Ok(outcome) => Ok((info, outcome)),
        Err(err) => {
            debug!(command = info.name, error = ?err, "command returned an error");
            Ok((info, outcome_from_error(&err)))
        }
    }
}
