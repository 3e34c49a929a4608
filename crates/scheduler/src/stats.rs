use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};

use serde::Serialize;

use hivemind_core::types::NodeId;

/// Rolling sample windows keep at most this many entries; oldest evicted.
const MAX_SAMPLE_COUNT: usize = 1000;

/// Per-node scheduling statistics.
#[derive(Debug, Clone, Default, Serialize)]
pub struct NodeSchedulerStats {
    pub node_id: NodeId,
    pub tasks_assigned: u64,
    pub tasks_completed: u64,
    pub tasks_failed: u64,
    pub last_assigned_at: Option<SystemTime>,
}

/// Aggregate statistics about the scheduler's operation.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStats {
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
    pub total_timed_out: u64,
    pub current_queued: usize,
    pub current_running: usize,
    /// Average time from submission to assignment.
    pub average_latency: Duration,
    /// Average time from assignment to completion.
    pub average_execution_time: Duration,
    pub node_stats: HashMap<NodeId, NodeSchedulerStats>,
    pub collected_at: SystemTime,
}

impl Default for SchedulerStats {
    fn default() -> Self {
        Self {
            total_submitted: 0,
            total_completed: 0,
            total_failed: 0,
            total_cancelled: 0,
            total_timed_out: 0,
            current_queued: 0,
            current_running: 0,
            average_latency: Duration::ZERO,
            average_execution_time: Duration::ZERO,
            node_stats: HashMap::new(),
            collected_at: SystemTime::UNIX_EPOCH,
        }
    }
}

struct StatsInner {
    stats: SchedulerStats,
    /// task ID -> assignedAt, for the running count and execution times.
    running: HashMap<String, Instant>,
    latency_samples: VecDeque<Duration>,
    execution_samples: VecDeque<Duration>,
}

/// Thread-safe aggregator of task lifecycle statistics.
pub struct StatsCollector {
    inner: Mutex<StatsInner>,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(StatsInner {
                stats: SchedulerStats::default(),
                running: HashMap::new(),
                latency_samples: VecDeque::new(),
                execution_samples: VecDeque::new(),
            }),
        }
    }

    pub fn record_submission(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.total_submitted += 1;
    }

    pub fn record_assignment(&self, task_id: &str, node_id: &str, latency: Duration) {
        let mut inner = self.inner.lock().unwrap();

        inner.running.insert(task_id.to_string(), Instant::now());
        push_sample(&mut inner.latency_samples, latency);

        let ns = node_entry(&mut inner.stats.node_stats, node_id);
        ns.tasks_assigned += 1;
        ns.last_assigned_at = Some(SystemTime::now());
    }

    pub fn record_completion(&self, task_id: &str, node_id: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();

        inner.stats.total_completed += 1;

        if let Some(assigned_at) = inner.running.remove(task_id) {
            let execution = assigned_at.elapsed();
            push_sample(&mut inner.execution_samples, execution);

            if let Some(node_id) = node_id {
                node_entry(&mut inner.stats.node_stats, node_id).tasks_completed += 1;
            }
        }
    }

    pub fn record_failure(&self, task_id: &str, node_id: Option<&str>) {
        let mut inner = self.inner.lock().unwrap();

        inner.stats.total_failed += 1;
        inner.running.remove(task_id);

        if let Some(node_id) = node_id {
            node_entry(&mut inner.stats.node_stats, node_id).tasks_failed += 1;
        }
    }

    pub fn record_cancellation(&self, task_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.total_cancelled += 1;
        inner.running.remove(task_id);
    }

    pub fn record_timeout(&self, task_id: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.stats.total_timed_out += 1;
        inner.running.remove(task_id);
    }

    /// A deep copy of the current statistics, with the averages and current
    /// counts computed fresh.
    pub fn snapshot(&self, queue_len: usize) -> SchedulerStats {
        let inner = self.inner.lock().unwrap();

        let mut snap = inner.stats.clone();
        snap.current_queued = queue_len;
        snap.current_running = inner.running.len();
        snap.average_latency = average_duration(&inner.latency_samples);
        snap.average_execution_time = average_duration(&inner.execution_samples);
        snap.collected_at = SystemTime::now();
        snap
    }
}

impl Default for StatsCollector {
    fn default() -> Self {
        Self::new()
    }
}

fn node_entry<'a>(
    node_stats: &'a mut HashMap<NodeId, NodeSchedulerStats>,
    node_id: &str,
) -> &'a mut NodeSchedulerStats {
    node_stats
        .entry(node_id.to_string())
        .or_insert_with(|| NodeSchedulerStats {
            node_id: node_id.to_string(),
            ..Default::default()
        })
}

fn push_sample(samples: &mut VecDeque<Duration>, sample: Duration) {
    if samples.len() >= MAX_SAMPLE_COUNT {
        samples.pop_front();
    }
    samples.push_back(sample);
}

fn average_duration(samples: &VecDeque<Duration>) -> Duration {
    if samples.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = samples.iter().sum();
    total / samples.len() as u32
}
