//! `terraform fmt -check` as a [`FormatChecker`].

use async_trait::async_trait;
use tf_avm_core::reward::{FormatCheck, FormatChecker};
use tf_avm_core::settings::CheckerSettings;
use tracing::debug;

use crate::command::{run_command, CommandSpec};

/// Runs the formatter binary against a scratch copy of each file.
///
/// Anything that keeps the formatter from giving a verdict, such as a
/// missing binary, a timeout or an unwritable temp dir, is reported as
/// [`FormatCheck::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerraformFmt {
    binary: String,
    timeout_secs: u64,
}

impl TerraformFmt {
    pub fn new(binary: impl Into<String>, timeout_secs: u64) -> Self {
        Self {
            binary: binary.into(),
            timeout_secs,
        }
    }

    pub fn from_settings(settings: &CheckerSettings) -> Self {
        Self::new(settings.binary.clone(), settings.timeout_secs)
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    async fn check_file(&self, content: &str) -> anyhow::Result<FormatCheck> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("main.tf");
        tokio::fs::write(&path, content).await?;

        let spec = CommandSpec::new(
            "fmt_check",
            vec![
                self.binary.clone(),
                "fmt".to_string(),
                "-check".to_string(),
                "-diff".to_string(),
                path.to_string_lossy().to_string(),
            ],
            self.timeout_secs,
        );
        let output = run_command(&spec).await?;
        debug!(exit_code = output.exit_code, duration_ms = output.duration_ms, "fmt check finished");

        if output.passed() {
            return Ok(FormatCheck::Formatted);
        }
        let detail = if output.stdout.trim().is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(FormatCheck::Unformatted(detail.trim().to_string()))
    }
}

#[async_trait]
impl FormatChecker for TerraformFmt {
    async fn is_available(&self) -> bool {
        let spec = CommandSpec::new(
            "fmt_version",
            vec![self.binary.clone(), "version".to_string()],
            self.timeout_secs,
        );
        match run_command(&spec).await {
            Ok(output) => output.passed(),
            Err(e) => {
                debug!(binary = %self.binary, error = %e, "formatter not available");
                false
            }
        }
    }

    async fn check(&self, content: &str) -> FormatCheck {
        match self.check_file(content).await {
            Ok(check) => check,
            Err(e) => FormatCheck::Unknown(e.to_string()),
        }
    }
}
