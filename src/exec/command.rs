// src/exec/command.rs

//! Shell command runner shared by the external collaborators (compilers,
//! test runner, packager).

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Build a shell command appropriate for the platform.
pub fn shell_command(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}

/// Quote an argument for `sh -c` when it contains anything but plain path
/// characters.
pub fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:@+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Run `cmd` through the shell in `cwd`, feed `stdin` to it and capture
/// stdout/stderr.
///
/// Stdin is written from a separate task so a compiler that streams output
/// while still reading input cannot deadlock against us.
pub async fn run_captured(
    cmd: &str,
    cwd: &Path,
    stdin: Option<Vec<u8>>,
    env: &BTreeMap<String, String>,
) -> Result<CommandOutput> {
    let mut command = shell_command(cmd);
    command
        .current_dir(cwd)
        .envs(env)
        .stdin(if stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command
        .spawn()
        .with_context(|| format!("spawning `{cmd}`"))?;

    let writer = match (stdin, child.stdin.take()) {
        (Some(input), Some(mut pipe)) => Some(tokio::spawn(async move {
            if let Err(e) = pipe.write_all(&input).await {
                // The child may legitimately exit before reading everything.
                debug!(error = %e, "failed to write command stdin");
            }
            drop(pipe);
        })),
        _ => None,
    };

    let output = child
        .wait_with_output()
        .await
        .with_context(|| format!("waiting for `{cmd}`"))?;

    if let Some(writer) = writer {
        if let Err(e) = writer.await {
            warn!(error = %e, "stdin writer task failed");
        }
    }

    let code = output.status.code().unwrap_or(-1);
    debug!(cmd, exit_code = code, "command finished");

    Ok(CommandOutput {
        success: output.status.success(),
        code,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Run `cmd` with inherited stdout/stderr (test runner, packager) and return
/// its exit status.
pub async fn run_inherited(
    cmd: &str,
    cwd: &Path,
    env: &BTreeMap<String, String>,
) -> Result<CommandOutput> {
    let mut command = shell_command(cmd);
    command
        .current_dir(cwd)
        .envs(env)
        .stdin(Stdio::null())
        .kill_on_drop(true);

    let status = command
        .status()
        .await
        .with_context(|| format!("running `{cmd}`"))?;

    Ok(CommandOutput {
        success: status.success(),
        code: status.code().unwrap_or(-1),
        stdout: String::new(),
        stderr: String::new(),
    })
}
