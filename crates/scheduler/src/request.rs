use std::collections::HashMap;
use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

use hivemind_core::task::Task;
use hivemind_core::types::NodeId;

/// How a Golem node is selected for task execution.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleMode {
    /// The caller explicitly names the target Golem.
    Direct,
    /// The scheduler scores candidates and picks the best one.
    Ai,
}

impl std::fmt::Display for ScheduleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScheduleMode::Direct => write!(f, "direct"),
            ScheduleMode::Ai => write!(f, "ai"),
        }
    }
}

/// Minimum system resource thresholds a Golem must satisfy for a task.
/// Zero values mean "no constraint".
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub min_cpu_cores: u32,
    pub min_memory_mb: u64,
    pub min_disk_free_mb: u64,
    pub max_cpu_percent: f64,
    pub max_memory_percent: f64,
    pub max_active_tasks: u32,
}

/// Supplementary context the AI selector can use to refine its ranking.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleHints {
    /// Human-readable summary of what the task does.
    #[serde(default)]
    pub description: String,
    /// Favour the node with the lowest expected response time.
    #[serde(default)]
    pub prefer_low_latency: bool,
    /// Favour the node with the most available resources.
    #[serde(default)]
    pub prefer_high_resources: bool,
    /// Prefer this node if it meets all hard constraints. Useful for
    /// session stickiness.
    #[serde(default)]
    pub affinity: Option<NodeId>,
    /// Nodes to avoid if possible.
    #[serde(default)]
    pub anti_affinity: Vec<NodeId>,
    /// Arbitrary key-value metadata the selector may inspect.
    #[serde(default)]
    pub custom_context: HashMap<String, String>,
}

/// Everything the scheduler needs to dispatch a task: the task itself plus
/// the scheduling preferences (mode, constraints, hints).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleRequest {
    pub task: Task,
    pub mode: ScheduleMode,
    /// Explicit node ID when `mode` is `Direct`; ignored in `Ai` mode.
    #[serde(default)]
    pub target_node_id: Option<NodeId>,
    /// Capabilities the target Golem must advertise. Used for validation in
    /// direct mode and candidate filtering in AI mode.
    #[serde(default)]
    pub required_capabilities: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub required_features: Vec<String>,
    /// Soft preferences; matching tags raise a node's score but are not
    /// mandatory.
    #[serde(default)]
    pub preferred_tags: HashMap<String, String>,
    #[serde(default)]
    pub resource_requirements: Option<ResourceRequirements>,
    #[serde(default)]
    pub hints: Option<ScheduleHints>,
    pub requested_at: SystemTime,
}

impl ScheduleRequest {
    /// Start building a request for the given task. AI mode by default.
    pub fn builder(task: Task) -> ScheduleRequestBuilder {
        ScheduleRequestBuilder {
            request: ScheduleRequest {
                task,
                mode: ScheduleMode::Ai,
                target_node_id: None,
                required_capabilities: Vec::new(),
                required_skills: Vec::new(),
                required_features: Vec::new(),
                preferred_tags: HashMap::new(),
                resource_requirements: None,
                hints: None,
                requested_at: SystemTime::now(),
            },
        }
    }
}

/// Fluent builder for [`ScheduleRequest`].
pub struct ScheduleRequestBuilder {
    request: ScheduleRequest,
}

impl ScheduleRequestBuilder {
    /// Switch to direct scheduling, targeting a specific Golem node.
    pub fn direct_mode(mut self, node_id: impl Into<NodeId>) -> Self {
        self.request.mode = ScheduleMode::Direct;
        self.request.target_node_id = Some(node_id.into());
        self
    }

    /// Switch to AI-driven scheduling (the default).
    pub fn ai_mode(mut self) -> Self {
        self.request.mode = ScheduleMode::Ai;
        self.request.target_node_id = None;
        self
    }

    pub fn required_capabilities<I, S>(mut self, caps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.required_capabilities = caps.into_iter().map(Into::into).collect();
        self
    }

    pub fn required_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn required_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.request.required_features = features.into_iter().map(Into::into).collect();
        self
    }

    pub fn preferred_tags(mut self, tags: HashMap<String, String>) -> Self {
        self.request.preferred_tags = tags;
        self
    }

    pub fn resource_requirements(mut self, requirements: ResourceRequirements) -> Self {
        self.request.resource_requirements = Some(requirements);
        self
    }

    pub fn hints(mut self, hints: ScheduleHints) -> Self {
        self.request.hints = Some(hints);
        self
    }

    pub fn build(self) -> ScheduleRequest {
        self.request
    }
}

/// Outcome of the scheduling process for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleDecision {
    /// Task ID linking this decision back to its request.
    pub request_id: String,
    pub mode: ScheduleMode,
    pub selected_node_id: NodeId,
    /// Human-readable explanation of why this node was selected.
    pub reason: String,
    /// Per-node scoring breakdown; only populated in AI mode.
    pub scores: Vec<NodeScore>,
    /// Total number of nodes that were evaluated.
    pub candidate_count: usize,
    /// Number of nodes that passed all hard constraints.
    pub eligible_count: usize,
    pub decided_at: SystemTime,
    /// Wall-clock time it took to reach the decision.
    pub latency: Duration,
}

/// Scoring breakdown for a single candidate node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeScore {
    pub node_id: NodeId,
    /// Weighted aggregate; higher is better.
    pub total_score: f64,
    pub capability_score: f64,
    pub skill_score: f64,
    pub resource_score: f64,
    pub load_score: f64,
    pub tag_score: f64,
    pub affinity_score: f64,
    /// Whether this node passed all hard constraints.
    pub eligible: bool,
    /// Why the node was rejected, when `eligible` is false.
    #[serde(default)]
    pub reject_reason: Option<String>,
}
