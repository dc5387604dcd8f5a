//! Operation status enum
//!
//! Transitions are strictly linear: `Pending → Loading → Resolved |
//! Rejected`, with unlimited re-entry (a new invocation restarts at
//! `Loading` from any state — the machine is not one-shot).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current status of an asynchronous operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Created, never invoked (the initial status)
    Pending,
    /// An invocation is in flight
    Loading,
    /// The latest invocation completed successfully
    Resolved,
    /// The latest invocation failed
    Rejected,
}

impl TaskStatus {
    /// True before the first invocation
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }

    /// True while an invocation is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, TaskStatus::Loading)
    }

    /// True when the latest invocation succeeded
    pub fn is_resolved(&self) -> bool {
        matches!(self, TaskStatus::Resolved)
    }

    /// True when the latest invocation failed
    pub fn is_rejected(&self) -> bool {
        matches!(self, TaskStatus::Rejected)
    }

    /// Resolved or rejected
    pub fn is_done(&self) -> bool {
        self.is_resolved() || self.is_rejected()
    }

    /// Lowercase status name
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Loading => "loading",
            TaskStatus::Resolved => "resolved",
            TaskStatus::Rejected => "rejected",
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status_is_pending() {
        assert_eq!(TaskStatus::default(), TaskStatus::Pending);
        assert!(TaskStatus::default().is_pending());
    }

    #[test]
    fn test_done_covers_both_terminal_states() {
        assert!(TaskStatus::Resolved.is_done());
        assert!(TaskStatus::Rejected.is_done());
        assert!(!TaskStatus::Pending.is_done());
        assert!(!TaskStatus::Loading.is_done());
    }

    #[test]
    fn test_status_names() {
        assert_eq!(TaskStatus::Loading.as_str(), "loading");
        assert_eq!(TaskStatus::Rejected.to_string(), "rejected");
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Resolved).unwrap(),
            "\"resolved\""
        );
    }
}
