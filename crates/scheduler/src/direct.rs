use std::time::{Instant, SystemTime};

use tracing::debug;

use hivemind_core::types::GolemProfile;

use crate::constraint::ConstraintChecker;
use crate::error::SchedulerError;
use crate::request::{ScheduleDecision, ScheduleMode, ScheduleRequest};
use crate::NodeSelector;

/// Selects the Golem the caller explicitly targeted, after validating that
/// it exists and meets all hard constraints.
#[derive(Debug, Default)]
pub struct DirectSelector;

impl DirectSelector {
    pub fn new() -> Self {
        Self
    }
}

impl NodeSelector for DirectSelector {
    fn select(
        &self,
        req: &ScheduleRequest,
        candidates: &[GolemProfile],
    ) -> Result<ScheduleDecision, SchedulerError> {
        let start = Instant::now();

        let target_id = match req.target_node_id.as_deref() {
            Some(id) if !id.is_empty() => id,
            _ => return Err(SchedulerError::EmptyTarget),
        };

        let target = candidates
            .iter()
            .find(|p| p.node_info.id == target_id)
            .ok_or_else(|| SchedulerError::TargetNotFound {
                node_id: target_id.to_string(),
                candidates: candidates.len(),
            })?;

        if let Some(reason) = ConstraintChecker::check(req, target) {
            return Err(SchedulerError::Rejected {
                node_id: target_id.to_string(),
                reason,
            });
        }

        debug!("direct selection of node {} accepted", target_id);

        Ok(ScheduleDecision {
            request_id: req.task.id.clone(),
            mode: ScheduleMode::Direct,
            selected_node_id: target.node_info.id.clone(),
            reason: format!("directly targeted node {target_id:?} passed all constraints"),
            scores: Vec::new(),
            candidate_count: candidates.len(),
            eligible_count: 1,
            decided_at: SystemTime::now(),
            latency: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        "direct"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests_common::*;

    #[test]
    fn test_targets_named_node() {
        let selector = DirectSelector::new();
        let profiles = vec![make_profile("g1"), make_profile("g2")];
        let req = make_direct_request("t1", "g2");

        let decision = selector.select(&req, &profiles).unwrap();
        assert_eq!(decision.mode, ScheduleMode::Direct);
        assert_eq!(decision.selected_node_id, "g2");
        assert_eq!(decision.candidate_count, 2);
        assert_eq!(decision.eligible_count, 1);
        assert!(decision.scores.is_empty());
    }

    #[test]
    fn test_missing_target_fails() {
        let selector = DirectSelector::new();
        let profiles = vec![make_profile("g1")];
        let req = make_direct_request("t1", "g9");

        let err = selector.select(&req, &profiles).unwrap_err();
        assert!(matches!(err, SchedulerError::TargetNotFound { .. }));
        assert!(err.to_string().contains("\"g9\""));
    }

    #[test]
    fn test_constraint_rejection_propagates_reason() {
        let selector = DirectSelector::new();
        let mut profile = make_profile("g1");
        profile.node_info.capabilities.clear();

        let mut req = make_direct_request("t1", "g1");
        req.required_capabilities = vec!["exec".into()];

        let err = selector.select(&req, &[profile]).unwrap_err();
        assert!(err
            .to_string()
            .contains("missing required capability \"exec\""));
    }

    #[test]
    fn test_empty_target_fails() {
        let selector = DirectSelector::new();
        let mut req = make_direct_request("t1", "g1");
        req.target_node_id = None;

        let err = selector.select(&req, &[make_profile("g1")]).unwrap_err();
        assert!(matches!(err, SchedulerError::EmptyTarget));
    }
}
