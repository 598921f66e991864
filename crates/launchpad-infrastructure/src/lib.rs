//! Infrastructure layer for Launchpad: configuration file and path resolution.

pub mod config;
pub mod paths;

pub use config::{
    GeneratorBackend, GeneratorConfig, LaunchpadConfig, PublisherConfig, RetryConfig, SourceConfig,
};
pub use paths::{LaunchpadPaths, PathError};
