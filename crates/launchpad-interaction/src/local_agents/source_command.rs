//! CommandSourceCollector - collects release data by running an external command.
//!
//! The command is invoked as `<command> <args...> <project_ref>` and must print one
//! JSON `ReleaseData` document on stdout.

use async_trait::async_trait;
use launchpad_core::{CollaboratorError, ProgressSink, ReleaseData, SourceCollector};
use std::path::PathBuf;
use tokio::process::Command;

pub struct CommandSourceCollector {
    command: PathBuf,
    args: Vec<String>,
}

impl CommandSourceCollector {
    pub fn new(command: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[async_trait]
impl SourceCollector for CommandSourceCollector {
    async fn collect(
        &self,
        project_ref: &str,
        progress: &dyn ProgressSink,
    ) -> Result<ReleaseData, CollaboratorError> {
        progress.report(5, "Starting release collector").await;
        log::info!(
            "Collecting release data for {} via {}",
            project_ref,
            self.command.display()
        );

        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(project_ref)
            .output()
            .await
            .map_err(|e| {
                log::error!("Failed to spawn collector: {}", e);
                CollaboratorError::Unavailable(format!(
                    "Failed to spawn {}: {e}",
                    self.command.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("Collector failed: {}", stderr);
            return Err(CollaboratorError::Process {
                status_code: output.status.code().and_then(|c| u16::try_from(c).ok()),
                message: format!("Collector exited with {}: {}", output.status, stderr.trim()),
                is_retryable: false,
            });
        }

        progress.report(80, "Parsing release data").await;
        let data: ReleaseData = serde_json::from_slice(&output.stdout).map_err(|e| {
            log::error!("Collector output is not valid release data: {}", e);
            CollaboratorError::InvalidResponse(format!("Collector output is not valid JSON: {e}"))
        })?;

        log::debug!(
            "Collected {} commits and {} assets for {}",
            data.commits.len(),
            data.assets.len(),
            data.version
        );
        progress.report(100, "Release data collected").await;
        Ok(data)
    }
}
