//! Bounded subprocess execution.

use std::process::Stdio;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// A command line to run under a timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Label used in errors and logs.
    pub name: String,

    /// Executable followed by its arguments.
    pub command: Vec<String>,

    /// Zero disables the timeout.
    pub timeout_secs: u64,

    /// Written to the child's stdin, which is then closed.
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(name: impl Into<String>, command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            name: name.into(),
            command,
            timeout_secs,
            stdin: None,
        }
    }

    pub fn with_stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }
}

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub name: String,
    /// `-1` when the child was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration_ms: u64,
    pub success: bool,
}

impl CommandOutput {
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }
}

/// Run a command to completion.
///
/// Spawn failures and timeouts are errors; a non-zero exit is not. The
/// child is killed when the timeout elapses.
pub async fn run_command(spec: &CommandSpec) -> anyhow::Result<CommandOutput> {
    let start = Instant::now();

    let Some((exe, args)) = spec.command.split_first() else {
        anyhow::bail!("command {} is empty", spec.name);
    };

    let mut child = Command::new(exe)
        .args(args)
        .stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| anyhow::anyhow!("failed to spawn {} ({exe}): {e}", spec.name))?;

    // Stdin is fed while output is drained, both under the timeout.
    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut stdin)) = (spec.stdin.as_deref(), stdin) {
            // A child that exits without reading its input is not an error.
            let _ = stdin.write_all(input.as_bytes()).await;
        }
    };
    let interaction = async move {
        let ((), output) = tokio::join!(feed, child.wait_with_output());
        output
    };

    let output = if spec.timeout_secs > 0 {
        tokio::time::timeout(Duration::from_secs(spec.timeout_secs), interaction)
            .await
            .map_err(|_| {
                anyhow::anyhow!(
                    "{} timed out after {} seconds",
                    spec.name,
                    spec.timeout_secs
                )
            })??
    } else {
        interaction.await?
    };

    Ok(CommandOutput {
        name: spec.name.clone(),
        exit_code: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        duration_ms: start.elapsed().as_millis() as u64,
        success: output.status.success(),
    })
}
