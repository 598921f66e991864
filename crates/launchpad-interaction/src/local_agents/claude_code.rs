//! ClaudeCliGenerator - a text generator that wraps the Claude CLI.
//!
//! Spawns the `claude` command with the `-p` flag and returns its stdout.

use async_trait::async_trait;
use launchpad_core::{CollaboratorError, PromptMessage, PromptRole, TextGenerator};
use std::path::PathBuf;
use tokio::process::Command;

/// Supported Claude models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClaudeModel {
    /// Claude Sonnet 4.5 - Balanced performance and speed
    #[default]
    Sonnet45,
    /// Claude Sonnet 4 - Previous generation balanced model
    Sonnet4,
    /// Claude Opus 4 - Most capable model
    Opus4,
}

impl ClaudeModel {
    fn as_str(&self) -> &str {
        match self {
            ClaudeModel::Sonnet45 => "claude-sonnet-4.5",
            ClaudeModel::Sonnet4 => "claude-sonnet-4",
            ClaudeModel::Opus4 => "claude-opus-4",
        }
    }

    /// Accepts: "sonnet", "sonnet-4.5", "sonnet-4", "opus", "opus-4", etc.
    pub fn from_name(model: &str) -> Self {
        match model {
            "sonnet-4" | "claude-sonnet-4" => ClaudeModel::Sonnet4,
            "opus" | "opus-4" | "claude-opus-4" => ClaudeModel::Opus4,
            _ => ClaudeModel::Sonnet45,
        }
    }
}

/// Text generator backed by the local `claude` executable.
pub struct ClaudeCliGenerator {
    /// Path to the `claude` executable. If None, searches in PATH.
    claude_path: Option<PathBuf>,
    model: Option<ClaudeModel>,
}

impl ClaudeCliGenerator {
    pub fn new() -> Self {
        Self {
            claude_path: None,
            model: None,
        }
    }

    /// Creates a generator with a custom path to the claude executable.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            claude_path: Some(path),
            model: None,
        }
    }

    pub fn with_model(mut self, model: ClaudeModel) -> Self {
        self.model = Some(model);
        self
    }

    /// Flattens role-tagged messages into the single prompt the CLI accepts.
    fn render_prompt(messages: &[PromptMessage]) -> String {
        messages
            .iter()
            .map(|message| match message.role {
                PromptRole::System => format!("[Instructions]\n{}", message.content),
                PromptRole::User => message.content.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl Default for ClaudeCliGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for ClaudeCliGenerator {
    fn name(&self) -> &str {
        "claude_cli"
    }

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, CollaboratorError> {
        let claude_cmd = self
            .claude_path
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_else(|| "claude".to_string());

        let prompt = Self::render_prompt(messages);
        log::info!("ClaudeCliGenerator executing...");
        log::debug!("Prompt length: {} chars", prompt.len());
        log::trace!("Full prompt: {}", prompt);

        let mut cmd = Command::new(&claude_cmd);
        cmd.arg("-p").arg(&prompt);
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model.as_str());
            log::debug!("Using model: {}", model.as_str());
        }

        let output = cmd.output().await.map_err(|e| {
            log::error!("Failed to spawn claude process: {}", e);
            CollaboratorError::Unavailable(format!(
                "Failed to spawn claude process: {e}. Make sure 'claude' CLI is installed \
                 and in PATH, or set generator.claude_path in config.toml."
            ))
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("Claude command failed: {}", stderr);
            return Err(CollaboratorError::Process {
                status_code: output.status.code().and_then(|c| u16::try_from(c).ok()),
                message: format!("Claude command failed with status {}: {}", output.status, stderr),
                is_retryable: false,
            });
        }

        let stdout = String::from_utf8(output.stdout).map_err(|e| {
            log::error!("Failed to parse output: {}", e);
            CollaboratorError::InvalidResponse(format!("Claude output is not UTF-8: {e}"))
        })?;

        log::info!("ClaudeCliGenerator completed");
        log::debug!("Output length: {} chars", stdout.len());
        Ok(stdout)
    }
}
