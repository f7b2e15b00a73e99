use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

pub const OSSMOUNT_HELP_TEMPLATE: &str =
    "{before-help}\nUsage:\n    {usage}\n\nGlobal options:\n{options}\n";

pub const OSSMOUNT_BEFORE_HELP: &str = concat!(
    "ossmount ",
    env!("CARGO_PKG_VERSION"),
    " - Provision supervised ossfs bucket mounts\n\n",
    "\x1b[1;36mSetup\x1b[0m\n",
    "  driver install   Install ossfs and supervisor on this host.\n",
    "  secret add       Store bucket credentials in passwd-ossfs (mode 0600).\n",
    "  mount add        Generate the mount script and supervisor program, then reload.\n\n",
    "\x1b[1;36mInspect\x1b[0m\n",
    "  secret list      Show stored buckets and their selection index.\n",
    "  mount list       Show configured mounts.\n",
    "  status           Summarize credentials, mounts, and the supervisor link.\n\n",
    "\x1b[1;36mSupervisor\x1b[0m\n",
    "  supervisor activate  Point the system supervisord.conf at the generated config.\n",
    "  supervisor restart   Start or reload supervisord.\n",
);

#[derive(Parser, Debug)]
#[command(
    name = "ossmount",
    author,
    version,
    propagate_version = false,
    disable_help_subcommand = true,
    before_help = OSSMOUNT_BEFORE_HELP,
    help_template = OSSMOUNT_HELP_TEMPLATE
)]
#[allow(clippy::struct_excessive_bools)]
pub struct OssmountCli {
    #[arg(
        short,
        long,
        help = "Suppress human output (errors still print to stderr)",
        global = true
    )]
    pub quiet: bool,
    #[arg(short, long, action = ArgAction::Count, help = "Increase logging (-vv reaches trace)", global = true)]
    pub verbose: u8,
    #[arg(long, help = "Force trace logging regardless of -v/-q", global = true)]
    pub trace: bool,
    #[arg(
        long,
        help = "Emit {status,message,details} JSON envelopes",
        global = true
    )]
    pub json: bool,
    #[arg(long, help = "Disable colored human output", global = true)]
    pub no_color: bool,
    #[arg(
        long,
        value_name = "DIR",
        help = "Base directory for credentials, scripts, and supervisor configs [env: OSSMOUNT_HOME, default: /home/ossfs]",
        global = true
    )]
    pub home: Option<PathBuf>,
    #[command(subcommand)]
    pub command: CommandGroupCli,
}

#[derive(Subcommand, Debug)]
pub enum CommandGroupCli {
    #[command(about = "Manage bucket credentials.")]
    Secret {
        #[command(subcommand)]
        command: SecretCommand,
    },
    #[command(about = "Configure supervised bucket mounts.")]
    Mount {
        #[command(subcommand)]
        command: MountCommand,
    },
    #[command(about = "Activate or reload the supervisor daemon.")]
    Supervisor {
        #[command(subcommand)]
        command: SupervisorCommand,
    },
    #[command(about = "Install the ossfs mount driver.")]
    Driver {
        #[command(subcommand)]
        command: DriverCommand,
    },
    #[command(about = "Summarize credentials, mounts, and the supervisor link.")]
    Status,
}

#[derive(Subcommand, Debug)]
pub enum SecretCommand {
    #[command(
        about = "Append credentials for one bucket; missing values are prompted for.",
        override_usage = "ossmount secret add [--bucket NAME] [--key-id ID] [--key-secret SECRET]",
        after_help = "Example:\n  ossmount secret add --bucket media --key-id AK123 --key-secret SK456"
    )]
    Add(SecretAddArgs),
    #[command(about = "List stored buckets with their selection index.")]
    List,
}

#[derive(Args, Debug, Default)]
pub struct SecretAddArgs {
    #[arg(long, value_name = "NAME")]
    pub bucket: Option<String>,
    #[arg(long, value_name = "ID")]
    pub key_id: Option<String>,
    #[arg(
        long,
        value_name = "SECRET",
        env = "OSSMOUNT_KEY_SECRET",
        hide_env_values = true
    )]
    pub key_secret: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum MountCommand {
    #[command(
        about = "Mount a stored bucket at a local path under supervisord.",
        override_usage = "ossmount mount add [--index N] --path DIR --region ENDPOINT",
        after_help = "Example:\n  ossmount mount add --index 1 --path /mnt/media --region oss-cn-hongkong.aliyuncs.com"
    )]
    Add(MountAddArgs),
    #[command(about = "List configured mounts.")]
    List,
}

#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct MountAddArgs {
    #[arg(
        long,
        value_name = "N",
        help = "1-based credential index from `ossmount secret list`"
    )]
    pub index: Option<usize>,
    #[arg(long, value_name = "DIR", help = "Absolute mount point")]
    pub path: Option<PathBuf>,
    #[arg(
        long,
        value_name = "ENDPOINT",
        help = "Region endpoint, e.g. oss-cn-hongkong.aliyuncs.com"
    )]
    pub region: Option<String>,
    #[arg(long, help = "Regenerate a path already configured with other settings")]
    pub replace: bool,
    #[arg(long, help = "Back up and replace a foreign supervisord.conf at the link location")]
    pub force_link: bool,
    #[arg(long, help = "Write configuration without touching supervisord")]
    pub no_restart: bool,
}

#[derive(Subcommand, Debug)]
pub enum SupervisorCommand {
    #[command(about = "Point the system supervisord.conf at the generated config.")]
    Activate(ActivateArgs),
    #[command(about = "Start supervisord, or reread and update a running one.")]
    Restart,
}

#[derive(Args, Debug)]
pub struct ActivateArgs {
    #[arg(long, help = "Back up and replace a config not generated by ossmount")]
    pub force: bool,
}

#[derive(Subcommand, Debug)]
pub enum DriverCommand {
    #[command(about = "Install supervisor, gdebi-core, and the ossfs package.")]
    Install(DriverInstallArgs),
}

#[derive(Args, Debug)]
pub struct DriverInstallArgs {
    #[arg(long, value_name = "URL", help = "Package URL [env: OSSMOUNT_DRIVER_URL]")]
    pub url: Option<String>,
    #[arg(long, help = "Reinstall even if ossfs is already on PATH")]
    pub force: bool,
}
