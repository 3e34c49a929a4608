use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use hivemind_core::task::{Task, TaskProgress, TaskResult};
use hivemind_core::types::NodeId;

use crate::request::ScheduleDecision;

/// Kinds of task lifecycle events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    /// The task entered the scheduling queue.
    Submitted,
    /// The task was assigned to a Golem node.
    Assigned,
    /// Incremental progress was reported.
    Progress,
    /// The task finished successfully.
    Completed,
    /// The task failed.
    Failed,
    /// The task was cancelled.
    Cancelled,
    /// The task exceeded its timeout.
    TimedOut,
    /// The task was re-queued after its worker stalled.
    Rescheduled,
}

/// A task lifecycle event. Only the fields relevant to the kind are set:
/// `decision` for assignments, `progress` for progress reports, `result`
/// for completions, `error` for failures.
#[derive(Debug, Clone)]
pub struct TaskEvent {
    pub kind: TaskEventKind,
    pub task: Option<Task>,
    pub decision: Option<ScheduleDecision>,
    pub node_id: Option<NodeId>,
    pub progress: Option<TaskProgress>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
    pub timestamp: SystemTime,
}

impl TaskEvent {
    pub fn new(kind: TaskEventKind, task: Option<Task>) -> Self {
        Self {
            kind,
            task,
            decision: None,
            node_id: None,
            progress: None,
            result: None,
            error: None,
            timestamp: SystemTime::now(),
        }
    }
}

/// Receives task lifecycle events. Listeners are invoked synchronously in
/// whichever worker produced the event, so implementations must be fast and
/// internally thread-safe.
pub trait TaskEventListener: Send + Sync {
    fn on_event(&self, event: &TaskEvent);
}

/// Plain functions and closures can serve as listeners directly.
impl<F> TaskEventListener for F
where
    F: Fn(&TaskEvent) + Send + Sync,
{
    fn on_event(&self, event: &TaskEvent) {
        self(event)
    }
}

/// Handle returned by `Scheduler::subscribe`, used to unsubscribe. Closures
/// have no identity to compare, so removal goes through this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_closure_is_a_listener() {
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        let listener = move |_event: &TaskEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        };

        let event = TaskEvent::new(TaskEventKind::Submitted, None);
        listener.on_event(&event);
        listener.on_event(&event);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_new_event_has_no_payload_fields() {
        let event = TaskEvent::new(TaskEventKind::Assigned, Some(Task::new("t1")));
        assert_eq!(event.kind, TaskEventKind::Assigned);
        assert_eq!(event.task.as_ref().unwrap().id, "t1");
        assert!(event.decision.is_none());
        assert!(event.result.is_none());
        assert!(event.error.is_none());
    }
}
