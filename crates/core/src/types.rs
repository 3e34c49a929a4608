use std::collections::HashMap;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// Golem node identifier. Operators name nodes externally, so IDs are plain
/// strings rather than generated UUIDs.
pub type NodeId = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Online,
    Degraded,
    Offline,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Online => write!(f, "online"),
            NodeStatus::Degraded => write!(f, "degraded"),
            NodeStatus::Offline => write!(f, "offline"),
        }
    }
}

/// A coarse-grained ability a Golem advertises at the node level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl Capability {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SystemInfo {
    pub cpu_cores: u32,
    pub memory_mb: u64,
    pub disk_free_mb: u64,
}

/// Static registration data for a Golem node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInfo {
    pub id: NodeId,
    #[serde(default)]
    pub capabilities: Vec<Capability>,
    #[serde(default)]
    pub system: SystemInfo,
    pub status: NodeStatus,
}

/// Most recent load report from a Golem's heartbeat.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NodeLoadInfo {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub active_tasks: u32,
    pub queued_tasks: u32,
}

/// A fine-grained package installed on a Golem, providing capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillInfo {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
}

/// Denormalised snapshot of everything the scheduler knows about a Golem,
/// assembled from the cluster registry, heartbeat data, and capability reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GolemProfile {
    pub node_info: NodeInfo,
    #[serde(default)]
    pub load: NodeLoadInfo,
    #[serde(default)]
    pub installed_skills: Vec<SkillInfo>,
    #[serde(default)]
    pub supported_features: Vec<String>,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Composite health indicator: 0.0 = dead, 1.0 = perfect.
    pub health_score: f64,
    pub last_updated: SystemTime,
}

impl GolemProfile {
    /// Whether the named capability appears in the node-level capability set.
    pub fn has_capability(&self, name: &str) -> bool {
        self.node_info.capabilities.iter().any(|c| c.name == name)
    }

    /// Whether a skill with the given ID or name is installed.
    pub fn has_skill(&self, id_or_name: &str) -> bool {
        self.installed_skills
            .iter()
            .any(|s| s.id == id_or_name || s.name == id_or_name)
    }

    /// Whether the named feature appears in the supported-feature set.
    pub fn has_feature(&self, name: &str) -> bool {
        self.supported_features.iter().any(|f| f == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> GolemProfile {
        GolemProfile {
            node_info: NodeInfo {
                id: "g1".into(),
                capabilities: vec![Capability::new("exec")],
                system: SystemInfo::default(),
                status: NodeStatus::Online,
            },
            load: NodeLoadInfo::default(),
            installed_skills: vec![SkillInfo {
                id: "skill-001".into(),
                name: "browser".into(),
                version: "1.2.0".into(),
                capabilities: vec!["navigate".into()],
            }],
            supported_features: vec!["sandbox_execution".into()],
            tags: HashMap::new(),
            health_score: 1.0,
            last_updated: SystemTime::now(),
        }
    }

    #[test]
    fn test_skill_matches_id_or_name() {
        let p = profile();
        assert!(p.has_skill("skill-001"));
        assert!(p.has_skill("browser"));
        assert!(!p.has_skill("ffmpeg"));
    }

    #[test]
    fn test_capability_and_feature_lookup() {
        let p = profile();
        assert!(p.has_capability("exec"));
        assert!(!p.has_capability("gpu"));
        assert!(p.has_feature("sandbox_execution"));
    }

    #[test]
    fn test_node_status_display() {
        assert_eq!(NodeStatus::Online.to_string(), "online");
        assert_eq!(NodeStatus::Offline.to_string(), "offline");
    }
}
