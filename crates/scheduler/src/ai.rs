use std::time::{Instant, SystemTime};

use serde::{Deserialize, Serialize};
use tracing::debug;

use hivemind_core::types::GolemProfile;

use crate::constraint::ConstraintChecker;
use crate::error::SchedulerError;
use crate::request::{NodeScore, ScheduleDecision, ScheduleMode, ScheduleRequest};
use crate::NodeSelector;

/// Relative importance of each scoring dimension. Weights should sum to 1.0
/// for normalised totals, but this is not enforced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub capability: f64,
    pub skill: f64,
    pub resource: f64,
    pub load: f64,
    pub tag: f64,
    pub affinity: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            capability: 0.25,
            skill: 0.20,
            resource: 0.20,
            load: 0.20,
            tag: 0.10,
            affinity: 0.05,
        }
    }
}

/// Scores every candidate Golem against a multi-dimensional model covering
/// capabilities, installed skills, system resources, current load, tag
/// preferences, and affinity hints, then picks the best eligible node.
pub struct AiSelector {
    weights: ScoringWeights,
}

impl AiSelector {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Multi-dimensional score for one candidate. Computed for every node
    /// regardless of eligibility, so operators can see why a node lost.
    fn score(&self, req: &ScheduleRequest, profile: &GolemProfile) -> NodeScore {
        let capability_score = Self::score_capabilities(req, profile);
        let skill_score = Self::score_skills(req, profile);
        let resource_score = Self::score_resources(profile);
        let load_score = Self::score_load(profile);
        let tag_score = Self::score_tags(req, profile);
        let affinity_score = Self::score_affinity(req, profile);

        let total_score = capability_score * self.weights.capability
            + skill_score * self.weights.skill
            + resource_score * self.weights.resource
            + load_score * self.weights.load
            + tag_score * self.weights.tag
            + affinity_score * self.weights.affinity;

        NodeScore {
            node_id: profile.node_info.id.clone(),
            total_score,
            capability_score,
            skill_score,
            resource_score,
            load_score,
            tag_score,
            affinity_score,
            eligible: false,
            reject_reason: None,
        }
    }

    /// Fraction of required capabilities the node advertises; 1.0 when the
    /// request has none.
    fn score_capabilities(req: &ScheduleRequest, profile: &GolemProfile) -> f64 {
        if req.required_capabilities.is_empty() {
            return 1.0;
        }
        let matched = req
            .required_capabilities
            .iter()
            .filter(|c| profile.has_capability(c))
            .count();
        matched as f64 / req.required_capabilities.len() as f64
    }

    /// Fraction of required skills installed, matched by ID or name.
    fn score_skills(req: &ScheduleRequest, profile: &GolemProfile) -> f64 {
        if req.required_skills.is_empty() {
            return 1.0;
        }
        let matched = req
            .required_skills
            .iter()
            .filter(|s| profile.has_skill(s))
            .count();
        matched as f64 / req.required_skills.len() as f64
    }

    /// Available system resources, higher is better. Disk saturates at 10 GB.
    fn score_resources(profile: &GolemProfile) -> f64 {
        let cpu_score = 1.0 - (profile.load.cpu_percent / 100.0).clamp(0.0, 1.0);
        let mem_score = 1.0 - (profile.load.memory_percent / 100.0).clamp(0.0, 1.0);
        let disk_score = (profile.node_info.system.disk_free_mb as f64 / 10240.0).clamp(0.0, 1.0);

        (cpu_score + mem_score + disk_score) / 3.0
    }

    /// How busy the node is; exponential decay as active + queued tasks grow.
    fn score_load(profile: &GolemProfile) -> f64 {
        let total = profile.load.active_tasks + profile.load.queued_tasks;
        if total == 0 {
            return 1.0;
        }
        (-0.3 * total as f64).exp()
    }

    /// Fraction of preferred tags matched exactly (key and value).
    fn score_tags(req: &ScheduleRequest, profile: &GolemProfile) -> f64 {
        if req.preferred_tags.is_empty() {
            return 1.0;
        }
        let matched = req
            .preferred_tags
            .iter()
            .filter(|(k, v)| profile.tags.get(*k) == Some(v))
            .count();
        matched as f64 / req.preferred_tags.len() as f64
    }

    /// Affinity / anti-affinity hints: 0.0 for anti-affinity, 1.0 for the
    /// affinity target, otherwise neutral 0.5.
    fn score_affinity(req: &ScheduleRequest, profile: &GolemProfile) -> f64 {
        let Some(hints) = &req.hints else {
            return 0.5;
        };
        let node_id = &profile.node_info.id;

        if hints.anti_affinity.iter().any(|anti| anti == node_id) {
            return 0.0;
        }
        if hints.affinity.as_ref() == Some(node_id) {
            return 1.0;
        }
        0.5
    }

    fn build_reason(best: &NodeScore, eligible_count: usize) -> String {
        format!(
            "selected node {:?} (score={:.3}) from {} eligible candidates; \
             breakdown: capability={:.2}, skill={:.2}, resource={:.2}, load={:.2}, tag={:.2}, affinity={:.2}",
            best.node_id,
            best.total_score,
            eligible_count,
            best.capability_score,
            best.skill_score,
            best.resource_score,
            best.load_score,
            best.tag_score,
            best.affinity_score,
        )
    }
}

impl Default for AiSelector {
    fn default() -> Self {
        Self::new(ScoringWeights::default())
    }
}

impl NodeSelector for AiSelector {
    fn select(
        &self,
        req: &ScheduleRequest,
        candidates: &[GolemProfile],
    ) -> Result<ScheduleDecision, SchedulerError> {
        let start = Instant::now();

        if candidates.is_empty() {
            return Err(SchedulerError::NoCandidates);
        }

        let mut scores = Vec::with_capacity(candidates.len());
        for profile in candidates {
            let mut ns = self.score(req, profile);
            match ConstraintChecker::check(req, profile) {
                Some(reason) => {
                    ns.eligible = false;
                    ns.reject_reason = Some(reason);
                }
                None => ns.eligible = true,
            }
            debug!(
                "scored node {} total={:.3} eligible={}",
                ns.node_id, ns.total_score, ns.eligible
            );
            scores.push(ns);
        }

        // Stable sort keeps input order among equal totals.
        let mut eligible: Vec<&NodeScore> = scores.iter().filter(|s| s.eligible).collect();
        if eligible.is_empty() {
            return Err(SchedulerError::NoEligibleNodes {
                candidates: candidates.len(),
            });
        }
        eligible.sort_by(|a, b| {
            b.total_score
                .partial_cmp(&a.total_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let best = eligible[0];
        let eligible_count = eligible.len();
        let reason = Self::build_reason(best, eligible_count);
        let selected_node_id = best.node_id.clone();

        Ok(ScheduleDecision {
            request_id: req.task.id.clone(),
            mode: ScheduleMode::Ai,
            selected_node_id,
            reason,
            scores,
            candidate_count: candidates.len(),
            eligible_count,
            decided_at: SystemTime::now(),
            latency: start.elapsed(),
        })
    }

    fn name(&self) -> &str {
        "ai"
    }
}
