use std::env;

use color_eyre::owo_colors::OwoColorize;
use ossmount_core::CommandStatus;

/// Terminal coloring for human output. Plain text when `NO_COLOR` is set,
/// `--no-color` was passed, or the stream is not a terminal.
pub struct Style {
    color: bool,
}

impl Style {
    pub fn new(no_color: bool, is_tty: bool) -> Self {
        Self {
            color: is_tty && !no_color && env::var_os("NO_COLOR").is_none(),
        }
    }

    /// The leading line of every human report.
    pub fn status(&self, status: &CommandStatus, text: &str) -> String {
        let line = match status {
            CommandStatus::Ok => format!("✔ {text}"),
            CommandStatus::UserError => format!("✗ {text}"),
            CommandStatus::Failure => format!("✖ {text}"),
        };
        if !self.color {
            return line;
        }
        match status {
            CommandStatus::Ok => line.green().bold().to_string(),
            CommandStatus::UserError => line.yellow().bold().to_string(),
            CommandStatus::Failure => line.red().bold().to_string(),
        }
    }

    pub fn hint(&self, hint: &str) -> String {
        let line = format!("Hint: {hint}");
        if self.color {
            line.cyan().to_string()
        } else {
            line
        }
    }

    pub fn header(&self, text: &str) -> String {
        if self.color {
            text.bold().to_string()
        } else {
            text.to_string()
        }
    }
}
