use std::{
    io::Read,
    process::{Command, Stdio},
    thread,
};

use anyhow::{Context, Result};

use crate::outcome::ExternalCommandError;

const MAX_CAPTURE_BYTES: usize = 1024 * 1024;

#[derive(Debug, Clone)]
pub struct RunOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl RunOutput {
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.code == 0
    }

    /// Turns a non-zero exit into an [`ExternalCommandError`] naming `command`.
    pub fn checked(self, command: &str) -> Result<Self> {
        if self.succeeded() {
            return Ok(self);
        }
        Err(ExternalCommandError {
            command: command.to_string(),
            code: self.code,
            stderr: self.stderr.trim().to_string(),
        }
        .into())
    }
}

/// Render `program args...` for messages.
#[must_use]
pub fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Execute a program and capture stdout/stderr.
///
/// # Errors
///
/// Returns an error when the program cannot be spawned or the I/O streams cannot
/// be read entirely.
pub fn run_command(program: &str, args: &[String], envs: &[(String, String)]) -> Result<RunOutput> {
    let mut command = Command::new(program);
    command.args(args);
    for (key, value) in envs {
        command.env(key, value);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    tracing::debug!(command = %command_line(program, args), "spawning");
    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start {program}"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow::anyhow!("stdout missing for {program}"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow::anyhow!("stderr missing for {program}"))?;
    let stdout_handle = thread::spawn(move || read_to_string_limited(stdout, MAX_CAPTURE_BYTES));
    let stderr_handle = thread::spawn(move || read_to_string_limited(stderr, MAX_CAPTURE_BYTES));

    let status = child
        .wait()
        .with_context(|| format!("failed to wait for {program}"))?;
    let code = status.code().unwrap_or(-1);
    let stdout = stdout_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stdout thread panicked"))??;
    let stderr = stderr_handle
        .join()
        .map_err(|_| anyhow::anyhow!("stderr thread panicked"))??;
    Ok(RunOutput {
        code,
        stdout,
        stderr,
    })
}

/// Runs a program and fails with [`ExternalCommandError`] on a non-zero exit.
pub fn run_checked(program: &str, args: &[String], envs: &[(String, String)]) -> Result<RunOutput> {
    run_command(program, args, envs)?.checked(&command_line(program, args))
}

fn read_to_string_limited(mut reader: impl Read, limit: usize) -> Result<String> {
    let mut buffer = Vec::new();
    let mut truncated = false;
    let mut chunk = [0u8; 8192];
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        let room = limit.saturating_sub(buffer.len());
        if read > room {
            truncated = true;
        }
        buffer.extend_from_slice(&chunk[..read.min(room)]);
    }
    let mut text = String::from_utf8_lossy(&buffer).to_string();
    if truncated {
        text.push_str("\n[...truncated...]\n");
    }
    Ok(text)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn captures_output_and_status() -> Result<()> {
        let output = run_command(
            "sh",
            &["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
            &[],
        )?;
        assert_eq!(output.code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
        Ok(())
    }

    #[test]
    fn checked_names_the_failing_command() {
        let err = run_checked("sh", &["-c".to_string(), "exit 7".to_string()], &[])
            .expect_err("non-zero exit");
        let external = err
            .downcast_ref::<ExternalCommandError>()
            .expect("external command error");
        assert_eq!(external.code, 7);
        assert_eq!(external.command, "sh -c exit 7");
    }
}
