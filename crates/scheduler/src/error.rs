use thiserror::Error;

use hivemind_core::task::TaskStatus;
use hivemind_core::types::NodeId;

use crate::BoxError;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("direct mode requires a non-empty target node ID")]
    EmptyTarget,

    #[error("target node {node_id:?} not found among {candidates} candidates")]
    TargetNotFound { node_id: NodeId, candidates: usize },

    #[error("target node {node_id:?} rejected: {reason}")]
    Rejected { node_id: NodeId, reason: String },

    #[error("no Golem nodes available")]
    NoCandidates,

    #[error("no eligible Golem nodes among {candidates} candidates")]
    NoEligibleNodes { candidates: usize },

    #[error("all {count} selectors failed, last error: {source}")]
    AllSelectorsFailed {
        count: usize,
        #[source]
        source: Box<SchedulerError>,
    },

    #[error("failed to list Golem profiles: {source}")]
    Provider {
        #[source]
        source: BoxError,
    },

    #[error("failed to dispatch task {task_id:?} to node {node_id:?}: {source}")]
    Dispatch {
        task_id: String,
        node_id: NodeId,
        #[source]
        source: BoxError,
    },

    #[error("task {0:?} not found")]
    TaskNotFound(String),

    #[error("task {task_id:?} is already in terminal state \"{status}\"")]
    AlreadyTerminal { task_id: String, status: TaskStatus },

    #[error("immediate dispatch failed ({source}), task {task_id:?} queued for retry")]
    Queued {
        task_id: String,
        #[source]
        source: Box<SchedulerError>,
    },
}
