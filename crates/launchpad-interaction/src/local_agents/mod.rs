//! Collaborators backed by local executables.

pub mod claude_code;
pub mod source_command;

pub use claude_code::{ClaudeCliGenerator, ClaudeModel};
pub use source_command::CommandSourceCollector;
