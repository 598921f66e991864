//! Application configuration loaded from `config.toml`.
//!
//! ```toml
//! [generator]
//! backend = "gemini"          # "gemini" | "claude_cli" | "none"
//! model = "gemini-2.5-flash"
//!
//! [source]
//! command = "release-collector"
//! args = ["--format", "json"]
//!
//! [publisher]
//! endpoint = "https://store.example.com/api/releases"
//! dry_run = false
//!
//! [retry]
//! max_retries = 5
//! initial_backoff_ms = 2000
//! max_backoff_ms = 60000
//! ```
//!
//! Every section is optional. Secrets may be left out of the file and supplied
//! through `GEMINI_API_KEY` and `LAUNCHPAD_PUBLISH_TOKEN`.

use crate::paths::LaunchpadPaths;
use anyhow::Context;
use launchpad_core::LaunchpadError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const GEMINI_API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const PUBLISH_TOKEN_ENV: &str = "LAUNCHPAD_PUBLISH_TOKEN";

#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GeneratorBackend {
    Gemini,
    ClaudeCli,
    /// No classifier; analyzers use their deterministic rules.
    #[default]
    None,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub backend: GeneratorBackend,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Path of the `claude` executable when it is not on `PATH`.
    #[serde(default)]
    pub claude_path: Option<PathBuf>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub command: PathBuf,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct PublisherConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Log the payload instead of submitting it. Implied when no endpoint is set.
    #[serde(default)]
    pub dry_run: bool,
}

impl PublisherConfig {
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.endpoint.is_none()
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            initial_backoff_ms: 2_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl RetryConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchpadConfig {
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub source: Option<SourceConfig>,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

impl LaunchpadConfig {
    /// Loads the configuration and fills secrets from the environment.
    ///
    /// An explicit `path` must exist. Without one the default config file is used when
    /// present, otherwise the defaults apply.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match LaunchpadPaths::config_file() {
                Ok(default_path) if default_path.exists() => Self::from_file(&default_path)?,
                Ok(default_path) => {
                    tracing::debug!("No config file at {}, using defaults", default_path.display());
                    Self::default()
                }
                Err(e) => {
                    tracing::warn!("{}, using default configuration", e);
                    Self::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Fills secrets missing from the file using `lookup` (normally the process environment).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.generator.api_key.is_none() {
            self.generator.api_key = lookup(GEMINI_API_KEY_ENV).filter(|v| !v.is_empty());
        }
        if self.publisher.token.is_none() {
            self.publisher.token = lookup(PUBLISH_TOKEN_ENV).filter(|v| !v.is_empty());
        }
    }

    /// Rejects combinations that cannot work at runtime.
    pub fn validate(&self) -> Result<(), LaunchpadError> {
        if self.generator.backend == GeneratorBackend::Gemini && self.generator.api_key.is_none() {
            return Err(LaunchpadError::config(format!(
                "generator backend 'gemini' needs an api_key or {GEMINI_API_KEY_ENV}"
            )));
        }
        if self.retry.max_backoff_ms < self.retry.initial_backoff_ms {
            return Err(LaunchpadError::config(
                "retry.max_backoff_ms must not be smaller than retry.initial_backoff_ms",
            ));
        }
        if let Some(endpoint) = &self.publisher.endpoint {
            if !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
                return Err(LaunchpadError::config(format!(
                    "publisher.endpoint is not an http(s) URL: {endpoint}"
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let file = write_config("");
        let config = LaunchpadConfig::from_file(file.path()).unwrap();
        assert_eq!(config, LaunchpadConfig::default());
        assert_eq!(config.generator.backend, GeneratorBackend::None);
        assert_eq!(config.retry.max_retries, 5);
        assert!(config.publisher.is_dry_run());
    }

    #[test]
    fn test_full_file() {
        let file = write_config(
            r#"
[generator]
backend = "claude_cli"
model = "sonnet"

[source]
command = "release-collector"
args = ["--json"]

[publisher]
endpoint = "https://store.example.com/releases"

[retry]
max_retries = 2
"#,
        );
        let config = LaunchpadConfig::from_file(file.path()).unwrap();

        assert_eq!(config.generator.backend, GeneratorBackend::ClaudeCli);
        assert_eq!(config.generator.model.as_deref(), Some("sonnet"));
        let source = config.source.as_ref().unwrap();
        assert_eq!(source.command, PathBuf::from("release-collector"));
        assert_eq!(source.args, vec!["--json"]);
        assert!(!config.publisher.is_dry_run());
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.retry.initial_backoff(), Duration::from_millis(2_000));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_backend_is_rejected() {
        let file = write_config("[generator]\nbackend = \"gpt\"\n");
        let err = LaunchpadConfig::from_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(LaunchpadConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_env_fills_missing_secrets_only() {
        let mut config = LaunchpadConfig::default();
        config.publisher.token = Some("from-file".to_string());
        config.apply_env(|key| match key {
            GEMINI_API_KEY_ENV => Some("env-key".to_string()),
            PUBLISH_TOKEN_ENV => Some("env-token".to_string()),
            _ => None,
        });
        assert_eq!(config.generator.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.publisher.token.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_validate_gemini_without_key() {
        let mut config = LaunchpadConfig::default();
        config.generator.backend = GeneratorBackend::Gemini;
        assert!(config.validate().is_err());
        config.generator.api_key = Some("key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_backoff_order() {
        let mut config = LaunchpadConfig::default();
        config.retry.initial_backoff_ms = 10_000;
        config.retry.max_backoff_ms = 1_000;
        assert!(config.validate().is_err());
    }
}
