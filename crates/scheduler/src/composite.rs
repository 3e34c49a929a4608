use hivemind_core::types::GolemProfile;

use crate::error::SchedulerError;
use crate::request::{ScheduleDecision, ScheduleRequest};
use crate::NodeSelector;

/// Chains multiple selectors; the first to return a successful decision wins.
/// Enables layered strategies, e.g. try direct first, fall back to scoring.
pub struct CompositeSelector {
    selectors: Vec<Box<dyn NodeSelector>>,
    name: String,
}

impl CompositeSelector {
    pub fn new(selectors: Vec<Box<dyn NodeSelector>>) -> Self {
        let name = format!(
            "composite[{}]",
            selectors
                .iter()
                .map(|s| s.name())
                .collect::<Vec<_>>()
                .join("\u{2192}")
        );
        Self { selectors, name }
    }
}

impl NodeSelector for CompositeSelector {
    fn select(
        &self,
        req: &ScheduleRequest,
        candidates: &[GolemProfile],
    ) -> Result<ScheduleDecision, SchedulerError> {
        let mut last_err = None;
        for selector in &self.selectors {
            match selector.select(req, candidates) {
                Ok(decision) => return Ok(decision),
                Err(err) => last_err = Some(err),
            }
        }
        Err(SchedulerError::AllSelectorsFailed {
            count: self.selectors.len(),
            source: Box::new(last_err.unwrap_or(SchedulerError::NoCandidates)),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::AiSelector;
    use crate::direct::DirectSelector;
    use crate::request::ScheduleMode;
    use crate::tests_common::*;

    #[test]
    fn test_falls_back_to_next_selector() {
        // Direct fails (target absent), AI succeeds.
        let composite = CompositeSelector::new(vec![
            Box::new(DirectSelector::new()),
            Box::new(AiSelector::default()),
        ]);
        let req = make_direct_request("t1", "g9");
        let profiles = vec![make_profile("g1")];

        let decision = composite.select(&req, &profiles).unwrap();
        assert_eq!(decision.mode, ScheduleMode::Ai);
        assert_eq!(decision.selected_node_id, "g1");
    }

    #[test]
    fn test_first_success_wins() {
        let composite = CompositeSelector::new(vec![
            Box::new(DirectSelector::new()),
            Box::new(AiSelector::default()),
        ]);
        let req = make_direct_request("t1", "g1");
        let profiles = vec![make_profile("g1"), make_profile("g2")];

        let decision = composite.select(&req, &profiles).unwrap();
        assert_eq!(decision.mode, ScheduleMode::Direct);
    }

    #[test]
    fn test_all_fail_wraps_last_error() {
        let composite = CompositeSelector::new(vec![
            Box::new(DirectSelector::new()),
            Box::new(AiSelector::default()),
        ]);
        let req = make_direct_request("t1", "g9");

        let err = composite.select(&req, &[]).unwrap_err();
        match err {
            SchedulerError::AllSelectorsFailed { count, source } => {
                assert_eq!(count, 2);
                assert!(matches!(*source, SchedulerError::NoCandidates));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_name_lists_inner_selectors() {
        let composite = CompositeSelector::new(vec![
            Box::new(DirectSelector::new()),
            Box::new(AiSelector::default()),
        ]);
        assert_eq!(composite.name(), "composite[direct\u{2192}ai]");
    }
}
