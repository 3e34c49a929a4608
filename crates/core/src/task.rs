use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::NodeId;

/// Status of a task in the system.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
}

impl TaskStatus {
    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::TimedOut
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Assigned => write!(f, "assigned"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// A unit of work dispatched to a Golem node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    /// Higher value = more urgent.
    #[serde(default)]
    pub priority: i32,
    /// Per-task execution timeout. Zero means the monitor's default applies.
    #[serde(default)]
    pub timeout: Duration,
    #[serde(default)]
    pub assigned_node_id: Option<NodeId>,
    pub status: TaskStatus,
    #[serde(default)]
    pub started_at: Option<SystemTime>,
    #[serde(default)]
    pub completed_at: Option<SystemTime>,
    /// Opaque work description, interpreted only by the executing Golem.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            timeout: Duration::ZERO,
            assigned_node_id: None,
            status: TaskStatus::Pending,
            started_at: None,
            completed_at: None,
            payload: serde_json::Value::Null,
        }
    }

    /// Create a task with a freshly generated unique ID.
    pub fn with_random_id() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }
}

/// Incremental progress report from a running task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskProgress {
    pub task_id: String,
    pub node_id: NodeId,
    pub progress_pct: f32,
    #[serde(default)]
    pub message: Option<String>,
}

/// Final result of a task reported by the executing Golem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub node_id: NodeId,
    pub success: bool,
    #[serde(default)]
    pub payload: Option<serde_json::Value>,
    pub duration_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("t1");
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.started_at.is_none());
        assert!(task.completed_at.is_none());
        assert_eq!(task.timeout, Duration::ZERO);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(TaskStatus::Completed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(TaskStatus::TimedOut.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Assigned.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn test_random_ids_are_unique() {
        assert_ne!(Task::with_random_id().id, Task::with_random_id().id);
    }
}
