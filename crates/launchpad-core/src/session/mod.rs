//! Release session domain module.
//!
//! # Module Structure
//!
//! - `model`: the session aggregate (`ReleaseSession`) and its state transitions
//! - `status`: `SessionStatus` and the transition table
//! - `request`: outstanding questions (`DataCollectionRequest`, `ValidationType`)
//! - `agent_status`: progress of background collaborators (`AgentStatus`)

mod agent_status;
mod model;
mod request;
mod status;

pub use agent_status::{AgentState, AgentStatus};
pub use model::{CompletionPath, ReleaseSession, SOURCE_AGENT};
pub use request::{DataCollectionRequest, ValidationType};
pub use status::SessionStatus;
