use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use ossmount_core::{outcome_from_error, CommandContext, GlobalOptions, SystemEffects};

mod cli;
mod dispatch;
mod output;
mod prompt;
mod style;

use cli::OssmountCli;
use dispatch::{command_info, dispatch_command};
use output::{emit_output, OutputOptions};
use prompt::Prompter;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = OssmountCli::parse();
    init_tracing(cli.trace, cli.verbose, cli.quiet);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
        no_color: cli.no_color,
        home: cli.home.clone(),
    };

    let output_opts = OutputOptions {
        quiet: cli.quiet,
        json: cli.json,
        no_color: cli.no_color,
    };

    let ctx = match CommandContext::new(&global, Arc::new(SystemEffects::new())) {
        Ok(ctx) => ctx,
        Err(err) => {
            let outcome = outcome_from_error(&err);
            let code = emit_output(&output_opts, command_info(&cli.command), &outcome)?;
            std::process::exit(code);
        }
    };
    let prompter = Prompter::detect(cli.json);
    let (info, outcome) = dispatch_command(&ctx, &cli.command, &prompter)?;
    let code = emit_output(&output_opts, info, &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, verbose: u8, quiet: bool) {
    let level = if trace {
        "trace"
    } else if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("ossmount_cli={level},ossmount_core={level},ossmount_domain={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
