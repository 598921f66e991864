//! Path management for launchpad configuration files.
//!
//! ```text
//! ~/.config/launchpad/        # Config directory (platform default)
//! └── config.toml             # Application configuration
//! ```

use std::path::PathBuf;
use thiserror::Error;

const APP_DIR: &str = "launchpad";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum PathError {
    #[error("Cannot determine the platform config directory")]
    ConfigDirNotFound,
}

pub struct LaunchpadPaths;

impl LaunchpadPaths {
    /// Returns the launchpad configuration directory (e.g. `~/.config/launchpad/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the path to the main configuration file.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }
}
