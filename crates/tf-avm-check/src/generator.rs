//! A [`TextGenerator`] backed by an external command.

use async_trait::async_trait;
use tf_avm_core::correction::TextGenerator;
use tf_avm_core::error::{AvmError, Result};
use tracing::info;

use crate::command::{run_command, CommandSpec};

/// Sends each prompt on the command's stdin and takes stdout as the
/// response. A non-zero exit, a timeout or a spawn failure is a generation
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTextGenerator {
    command: Vec<String>,
    timeout_secs: u64,
}

impl CommandTextGenerator {
    pub fn new(command: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            command,
            timeout_secs,
        }
    }

    /// Split a command line on whitespace. No quoting rules.
    pub fn from_command_line(line: &str, timeout_secs: u64) -> Self {
        Self::new(line.split_whitespace().map(str::to_string).collect(), timeout_secs)
    }
}

#[async_trait]
impl TextGenerator for CommandTextGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let spec = CommandSpec::new("generator", self.command.clone(), self.timeout_secs)
            .with_stdin(prompt);
        let output = run_command(&spec)
            .await
            .map_err(|e| AvmError::Generation(e.to_string()))?;

        info!(
            event = "generator.responded",
            exit_code = output.exit_code,
            duration_ms = output.duration_ms,
            bytes = output.stdout.len(),
        );
        if !output.passed() {
            return Err(AvmError::Generation(format!(
                "generator exited with code {}: {}",
                output.exit_code,
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}
