mod tables;

use atty::Stream;
use color_eyre::Result;
use ossmount_core::{
    format_status_message, to_json_response, CommandInfo, CommandStatus, ExecutionOutcome,
};
use serde_json::Value;

use crate::style::Style;

#[derive(Clone, Copy, Debug)]
pub struct OutputOptions {
    pub quiet: bool,
    pub json: bool,
    pub no_color: bool,
}

/// Prints the outcome and returns the process exit code.
pub fn emit_output(
    opts: &OutputOptions,
    info: CommandInfo,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = exit_code(&outcome.status);

    if opts.json {
        let payload = to_json_response(info, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(code);
    }

    let failed = outcome.status != CommandStatus::Ok;
    if opts.quiet && !failed {
        return Ok(code);
    }
    // Errors go to stderr so a redirected stdout stays clean.
    let style = if failed {
        Style::new(opts.no_color, atty::is(Stream::Stderr))
    } else {
        Style::new(opts.no_color, atty::is(Stream::Stdout))
    };
    let mut lines = vec![style.status(
        &outcome.status,
        &format_status_message(info, &outcome.message),
    )];
    if !failed {
        lines.extend(tables::render(&style, info, &outcome.details));
    } else if let Some(stderr) = external_stderr(&outcome.details) {
        lines.push(stderr.to_string());
    }
    if let Some(hint) = hint_from_details(&outcome.details) {
        lines.push(style.hint(hint));
    }
    for line in lines {
        if failed {
            eprintln!("{line}");
        } else {
            println!("{line}");
        }
    }
    Ok(code)
}

fn exit_code(status: &CommandStatus) -> i32 {
    match status {
        CommandStatus::Ok => 0,
        CommandStatus::UserError => 1,
        CommandStatus::Failure => 2,
    }
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn external_stderr(details: &Value) -> Option<&str> {
    let nested = details.get("daemon_error").unwrap_or(details);
    nested
        .get("stderr")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
}
