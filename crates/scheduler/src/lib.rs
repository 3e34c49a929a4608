pub mod ai;
pub mod composite;
pub mod constraint;
pub mod direct;
pub mod error;
pub mod events;
pub mod filter;
pub mod monitor;
pub mod queue;
pub mod request;
pub mod scheduler;
pub mod stats;

#[cfg(test)]
pub(crate) mod tests_common;

use async_trait::async_trait;

use hivemind_core::task::Task;
use hivemind_core::types::GolemProfile;

/// Boxed error type for collaborator seams, so transport and registry
/// implementations can surface their own error types.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Trait for node-selection strategies.
pub trait NodeSelector: Send + Sync {
    /// Pick a node for the request among the candidate profiles.
    fn select(
        &self,
        req: &ScheduleRequest,
        candidates: &[GolemProfile],
    ) -> Result<ScheduleDecision, SchedulerError>;

    /// Name of the selection strategy.
    fn name(&self) -> &str;
}

/// Data source for Golem profiles. The scheduler uses this to obtain the
/// current snapshot of all registered Golem nodes with their capabilities,
/// resources, and installed skills. Implementations typically cache
/// heartbeat state and must return a consistent snapshot.
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    /// All Golem profiles currently known to the registry.
    async fn list_profiles(&self) -> Result<Vec<GolemProfile>, BoxError>;

    /// The profile for a specific Golem node by ID.
    async fn get_profile(&self, node_id: &str) -> Result<GolemProfile, BoxError>;
}

/// Sends a task to a specific Golem node for execution. Abstracts the
/// transport layer (gRPC, WebSocket, ...) from the scheduler's decision
/// logic. A successful return means the task was accepted for execution,
/// not that it completed.
#[async_trait]
pub trait TaskDispatcher: Send + Sync {
    async fn dispatch(&self, node_id: &str, task: &Task) -> Result<(), BoxError>;
}

pub use ai::{AiSelector, ScoringWeights};
pub use composite::CompositeSelector;
pub use direct::DirectSelector;
pub use error::SchedulerError;
pub use events::{SubscriptionId, TaskEvent, TaskEventKind, TaskEventListener};
pub use filter::{feature_filter, healthy_filter, online_filter, FilterSelector, NodeFilter};
pub use monitor::{Monitor, MonitorConfig, MonitorEventHandler};
pub use queue::PriorityQueue;
pub use request::{
    NodeScore, ResourceRequirements, ScheduleDecision, ScheduleHints, ScheduleMode,
    ScheduleRequest, ScheduleRequestBuilder,
};
pub use scheduler::{CompletedSchedulerConfig, Scheduler, SchedulerConfig};
pub use stats::{NodeSchedulerStats, SchedulerStats, StatsCollector};
