//! Release session status and its transition table.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a [`ReleaseSession`](super::ReleaseSession).
///
/// ```text
/// active -> waiting_user <-> (validate/collect) -> publishing -> completed
///                                                     |
///                                                     v
///               waiting_user <- retry_needed -> publishing (identical retry)
///                                   |
///                                   v
///                                 failed
/// ```
///
/// Any non-terminal status may move to `cancelled`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionStatus {
    /// Session created, upstream collection running.
    Active,
    /// Pending requests are waiting for user answers.
    WaitingUser,
    /// A publish attempt is in flight.
    Publishing,
    /// The last publish attempt failed and recovery is being decided.
    RetryNeeded,
    /// Publishing succeeded.
    Completed,
    /// Publishing could not be recovered.
    Failed,
    /// Cancelled by an external command.
    Cancelled,
}

impl SessionStatus {
    /// Returns true when no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if the transition table allows `self -> next`.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;

        if self.is_terminal() {
            return false;
        }
        if next == Cancelled {
            return true;
        }

        matches!(
            (self, next),
            (Active, WaitingUser)
                | (Active, Publishing)
                | (WaitingUser, Publishing)
                | (Publishing, Completed)
                | (Publishing, RetryNeeded)
                | (Publishing, WaitingUser)
                | (Publishing, Failed)
                | (RetryNeeded, WaitingUser)
                | (RetryNeeded, Publishing)
                | (RetryNeeded, Failed)
        )
    }

    /// Statuses an external command may request.
    ///
    /// The remaining statuses are only entered by the workflow itself, which owns the
    /// background work each of them implies.
    pub fn is_caller_settable(self) -> bool {
        matches!(self, Self::Cancelled | Self::Failed)
    }

    /// Statuses in which user answers may be accepted.
    pub fn accepts_responses(self) -> bool {
        matches!(self, Self::WaitingUser)
    }
}
