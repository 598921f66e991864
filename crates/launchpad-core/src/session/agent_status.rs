use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

/// Execution state of an asynchronous collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentState {
    Running,
    Completed,
    Failed,
}

/// Progress record for a background collaborator (e.g. the source collector).
///
/// Purely observational: nothing in the workflow branches on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatus {
    pub name: String,
    pub state: AgentState,
    /// 0-100
    pub progress: u8,
    pub message: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl AgentStatus {
    pub fn started(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: AgentState::Running,
            progress: 0,
            message: message.into(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Records intermediate progress. Values above 100 are clamped.
    pub fn update(&mut self, progress: u8, message: impl Into<String>) {
        self.progress = progress.min(100);
        self.message = message.into();
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        self.state = AgentState::Completed;
        self.progress = 100;
        self.message = message.into();
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = AgentState::Failed;
        self.message = message.into();
        self.completed_at = Some(Utc::now());
    }

    pub fn is_running(&self) -> bool {
        self.state == AgentState::Running
    }
}
