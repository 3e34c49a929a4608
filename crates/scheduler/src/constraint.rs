use hivemind_core::types::{GolemProfile, NodeStatus};

use crate::request::ScheduleRequest;

/// Validates that a Golem profile meets all hard constraints of a request.
/// Used by both the direct and AI selectors.
#[derive(Debug, Default)]
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Returns `None` if the node passes all constraints, or the first
    /// failing constraint as a human-readable rejection reason.
    pub fn check(req: &ScheduleRequest, profile: &GolemProfile) -> Option<String> {
        // 1. Node must be online.
        if profile.node_info.status != NodeStatus::Online {
            return Some(format!(
                "node status is \"{}\", expected online",
                profile.node_info.status
            ));
        }

        // 2. Required capabilities.
        for cap in &req.required_capabilities {
            if !profile.has_capability(cap) {
                return Some(format!("missing required capability {cap:?}"));
            }
        }

        // 3. Required skills, matched by ID or name.
        for skill in &req.required_skills {
            if !profile.has_skill(skill) {
                return Some(format!("missing required skill {skill:?}"));
            }
        }

        // 4. Required features.
        for feature in &req.required_features {
            if !profile.has_feature(feature) {
                return Some(format!("missing required feature {feature:?}"));
            }
        }

        // 5. Resource requirements.
        if let Some(rr) = &req.resource_requirements {
            let info = &profile.node_info.system;
            let load = &profile.load;

            if rr.min_cpu_cores > 0 && info.cpu_cores < rr.min_cpu_cores {
                return Some(format!(
                    "insufficient CPU cores: have {}, need {}",
                    info.cpu_cores, rr.min_cpu_cores
                ));
            }
            if rr.min_memory_mb > 0 && info.memory_mb < rr.min_memory_mb {
                return Some(format!(
                    "insufficient memory: have {}MB, need {}MB",
                    info.memory_mb, rr.min_memory_mb
                ));
            }
            if rr.min_disk_free_mb > 0 && info.disk_free_mb < rr.min_disk_free_mb {
                return Some(format!(
                    "insufficient disk: have {}MB, need {}MB",
                    info.disk_free_mb, rr.min_disk_free_mb
                ));
            }
            if rr.max_cpu_percent > 0.0 && load.cpu_percent > rr.max_cpu_percent {
                return Some(format!(
                    "CPU usage too high: {:.1}% > {:.1}%",
                    load.cpu_percent, rr.max_cpu_percent
                ));
            }
            if rr.max_memory_percent > 0.0 && load.memory_percent > rr.max_memory_percent {
                return Some(format!(
                    "memory usage too high: {:.1}% > {:.1}%",
                    load.memory_percent, rr.max_memory_percent
                ));
            }
            if rr.max_active_tasks > 0 && load.active_tasks > rr.max_active_tasks {
                return Some(format!(
                    "too many active tasks: {} > {}",
                    load.active_tasks, rr.max_active_tasks
                ));
            }
        }

        None
    }
}
