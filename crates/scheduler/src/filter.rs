use hivemind_core::types::{GolemProfile, NodeStatus};

use crate::error::SchedulerError;
use crate::request::{ScheduleDecision, ScheduleRequest};
use crate::NodeSelector;

/// Predicate deciding whether a Golem profile stays in the candidate pool.
pub type NodeFilter = Box<dyn Fn(&GolemProfile) -> bool + Send + Sync>;

/// Keeps only online nodes.
pub fn online_filter() -> NodeFilter {
    Box::new(|profile| profile.node_info.status == NodeStatus::Online)
}

/// Keeps only nodes at or above the given health threshold.
pub fn healthy_filter(min_health: f64) -> NodeFilter {
    Box::new(move |profile| profile.health_score >= min_health)
}

/// Keeps only nodes supporting all of the given features.
pub fn feature_filter<I, S>(features: I) -> NodeFilter
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let features: Vec<String> = features.into_iter().map(Into::into).collect();
    Box::new(move |profile| features.iter().all(|f| profile.has_feature(f)))
}

/// Decorator that pre-filters candidates before delegating to an inner
/// selector.
pub struct FilterSelector {
    inner: Box<dyn NodeSelector>,
    filters: Vec<NodeFilter>,
    name: String,
}

impl FilterSelector {
    pub fn new(inner: Box<dyn NodeSelector>, filters: Vec<NodeFilter>) -> Self {
        let name = format!("filtered({})", inner.name());
        Self {
            inner,
            filters,
            name,
        }
    }
}

impl NodeSelector for FilterSelector {
    fn select(
        &self,
        req: &ScheduleRequest,
        candidates: &[GolemProfile],
    ) -> Result<ScheduleDecision, SchedulerError> {
        let filtered: Vec<GolemProfile> = candidates
            .iter()
            .filter(|p| self.filters.iter().all(|f| f(p)))
            .cloned()
            .collect();
        self.inner.select(req, &filtered)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
