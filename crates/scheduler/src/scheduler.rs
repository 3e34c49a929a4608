use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, SystemTime};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use hivemind_core::config::HivemindConfig;
use hivemind_core::task::{Task, TaskProgress, TaskResult, TaskStatus};

use crate::ai::{AiSelector, ScoringWeights};
use crate::direct::DirectSelector;
use crate::error::SchedulerError;
use crate::events::{SubscriptionId, TaskEvent, TaskEventKind, TaskEventListener};
use crate::monitor::{Monitor, MonitorConfig, MonitorEventHandler};
use crate::queue::PriorityQueue;
use crate::request::{ScheduleDecision, ScheduleMode, ScheduleRequest};
use crate::stats::{SchedulerStats, StatsCollector};
use crate::{NodeSelector, ProfileProvider, TaskDispatcher};

/// Configuration for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of concurrent dispatch operations.
    pub dispatch_concurrency: usize,
    /// How often the background loop polls the queue for pending requests.
    pub schedule_loop_interval: Duration,
    /// Maximum number of times a task is rescheduled after its worker stalls.
    pub max_retries: u32,
    /// Weights used by the AI selector when none are specified per request.
    pub default_scoring_weights: ScoringWeights,
    pub monitor: MonitorConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            dispatch_concurrency: 8,
            schedule_loop_interval: Duration::from_millis(500),
            max_retries: 3,
            default_scoring_weights: ScoringWeights::default(),
            monitor: MonitorConfig::default(),
        }
    }
}

impl SchedulerConfig {
    pub fn from_settings(settings: &HivemindConfig) -> Self {
        Self {
            dispatch_concurrency: settings.scheduler.dispatch_concurrency,
            schedule_loop_interval: Duration::from_millis(
                settings.scheduler.schedule_loop_interval_ms,
            ),
            max_retries: settings.scheduler.max_retries,
            default_scoring_weights: ScoringWeights::default(),
            monitor: MonitorConfig::from_settings(&settings.monitor),
        }
    }

    /// Seal the configuration with its collaborators, substituting defaults
    /// for zero durations and a zero concurrency.
    pub fn complete(
        mut self,
        provider: Arc<dyn ProfileProvider>,
        dispatcher: Arc<dyn TaskDispatcher>,
    ) -> CompletedSchedulerConfig {
        if self.dispatch_concurrency == 0 {
            self.dispatch_concurrency = 8;
        }
        if self.schedule_loop_interval.is_zero() {
            self.schedule_loop_interval = Duration::from_millis(500);
        }
        let monitor_defaults = MonitorConfig::default();
        if self.monitor.poll_interval.is_zero() {
            self.monitor.poll_interval = monitor_defaults.poll_interval;
        }
        if self.monitor.stall_threshold.is_zero() {
            self.monitor.stall_threshold = monitor_defaults.stall_threshold;
        }
        if self.monitor.default_timeout.is_zero() {
            self.monitor.default_timeout = monitor_defaults.default_timeout;
        }

        CompletedSchedulerConfig {
            config: self,
            provider,
            dispatcher,
        }
    }
}

/// A sealed configuration ready to construct a scheduler.
pub struct CompletedSchedulerConfig {
    config: SchedulerConfig,
    provider: Arc<dyn ProfileProvider>,
    dispatcher: Arc<dyn TaskDispatcher>,
}

impl CompletedSchedulerConfig {
    pub fn build(self) -> Arc<Scheduler> {
        let (stop_tx, _) = watch::channel(false);
        Arc::new(Scheduler {
            monitor: Monitor::new(self.config.monitor.clone()),
            direct_sel: DirectSelector::new(),
            ai_sel: AiSelector::new(self.config.default_scoring_weights),
            queue: PriorityQueue::new(),
            stats: StatsCollector::new(),
            tasks: RwLock::new(HashMap::new()),
            listeners: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            provider: self.provider,
            dispatcher: self.dispatcher,
            config: self.config,
            stop_tx,
        })
    }
}

struct TaskRecord {
    task: Task,
    decision: Option<ScheduleDecision>,
    request: ScheduleRequest,
    retries: u32,
}

/// Facade over the scheduling subsystem: admission, node selection,
/// dispatch, execution monitoring, event emission, and statistics.
pub struct Scheduler {
    config: SchedulerConfig,
    provider: Arc<dyn ProfileProvider>,
    dispatcher: Arc<dyn TaskDispatcher>,
    queue: PriorityQueue,
    direct_sel: DirectSelector,
    ai_sel: AiSelector,
    monitor: Monitor,
    stats: StatsCollector,
    tasks: RwLock<HashMap<String, TaskRecord>>,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn TaskEventListener>)>>,
    next_subscription: AtomicU64,
    stop_tx: watch::Sender<bool>,
}

impl Scheduler {
    /// Submit a scheduling request. Dispatch is attempted immediately; on
    /// failure the request is queued for the background loop and the
    /// `Queued` error reports both outcomes.
    pub async fn schedule(&self, req: ScheduleRequest) -> Result<ScheduleDecision, SchedulerError> {
        self.stats.record_submission();

        match self.try_dispatch(&req).await {
            Ok(decision) => Ok(decision),
            Err(err) => {
                info!(
                    "immediate dispatch of task {} failed ({err}), queueing for retry",
                    req.task.id
                );
                let task_id = req.task.id.clone();
                let task = req.task.clone();
                self.queue.enqueue(req);

                self.emit_event(TaskEvent::new(TaskEventKind::Submitted, Some(task)));

                Err(SchedulerError::Queued {
                    task_id,
                    source: Box::new(err),
                })
            }
        }
    }

    /// Abort a pending or running task. Idempotent: cancelling an unknown
    /// or already-terminal task is a no-op.
    pub fn cancel(&self, task_id: &str) -> Result<(), SchedulerError> {
        let was_queued = self.queue.remove(task_id);
        if !was_queued {
            self.monitor.unwatch(task_id);
        }

        let snapshot = {
            let mut tasks = self.tasks.write().unwrap();
            match tasks.get_mut(task_id) {
                Some(rec) if !rec.task.status.is_terminal() => {
                    rec.task.status = TaskStatus::Cancelled;
                    rec.task.completed_at = Some(SystemTime::now());
                    Some(rec.task.clone())
                }
                Some(_) => return Ok(()),
                None if was_queued => None,
                None => return Ok(()),
            }
        };

        self.stats.record_cancellation(task_id);
        info!("task {} cancelled", task_id);
        self.emit_event(TaskEvent::new(TaskEventKind::Cancelled, snapshot));
        Ok(())
    }

    /// Current state of a task known to the scheduler.
    pub fn status(&self, task_id: &str) -> Result<Task, SchedulerError> {
        self.tasks
            .read()
            .unwrap()
            .get(task_id)
            .map(|rec| rec.task.clone())
            .ok_or_else(|| SchedulerError::TaskNotFound(task_id.to_string()))
    }

    /// Snapshot of aggregate scheduler statistics.
    pub fn stats(&self) -> SchedulerStats {
        self.stats.snapshot(self.queue.len())
    }

    /// Register a lifecycle listener. The returned handle removes it again.
    pub fn subscribe(&self, listener: Arc<dyn TaskEventListener>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().unwrap().push((id, listener));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.listeners.write().unwrap().retain(|(sid, _)| *sid != id);
    }

    /// Spawn the background processing loops (queue drain and execution
    /// monitor). The scheduler keeps being driven through existing handles.
    pub fn start(self: Arc<Self>) {
        let cloned: Arc<Scheduler> = self.clone();
        let handler: Arc<dyn MonitorEventHandler> = cloned;
        self.monitor.start(handler);

        let mut stop_rx = self.stop_tx.subscribe();
        let scheduler = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(scheduler.config.schedule_loop_interval);
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => scheduler.process_queue().await,
                }
            }
            debug!("schedule loop stopped");
        });
    }

    /// Signal the background loops to exit. Safe to call more than once.
    /// Tasks already dispatched keep running on their Golems.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
        self.monitor.stop();
    }

    /// Record a heartbeat and surface incremental progress from a running
    /// task. Called by the transport layer.
    pub fn report_progress(&self, progress: TaskProgress) {
        self.monitor.record_heartbeat(&progress.task_id);

        let snapshot = {
            let mut tasks = self.tasks.write().unwrap();
            tasks.get_mut(&progress.task_id).map(|rec| {
                if rec.task.status == TaskStatus::Assigned {
                    rec.task.status = TaskStatus::Running;
                }
                rec.task.clone()
            })
        };

        let mut event = TaskEvent::new(TaskEventKind::Progress, snapshot);
        event.node_id = Some(progress.node_id.clone());
        event.progress = Some(progress);
        self.emit_event(event);
    }

    /// Record the final result of a task. Called by the transport layer.
    /// Duplicate and unknown results are ignored.
    pub fn report_result(&self, result: TaskResult) {
        self.monitor.unwatch(&result.task_id);

        let (snapshot, node_id) = {
            let mut tasks = self.tasks.write().unwrap();
            let Some(rec) = tasks.get_mut(&result.task_id) else {
                debug!("result for unknown task {}, ignoring", result.task_id);
                return;
            };
            if rec.task.status.is_terminal() {
                debug!(
                    "task {} already {}, ignoring duplicate result",
                    result.task_id, rec.task.status
                );
                return;
            }

            rec.task.completed_at = Some(SystemTime::now());
            rec.task.status = if result.success {
                TaskStatus::Completed
            } else {
                TaskStatus::Failed
            };
            (
                rec.task.clone(),
                rec.decision.as_ref().map(|d| d.selected_node_id.clone()),
            )
        };

        if result.success {
            self.stats
                .record_completion(&result.task_id, node_id.as_deref());
            info!("task {} completed", result.task_id);

            let mut event = TaskEvent::new(TaskEventKind::Completed, Some(snapshot));
            event.node_id = node_id;
            event.result = Some(result);
            self.emit_event(event);
        } else {
            self.stats
                .record_failure(&result.task_id, node_id.as_deref());
            warn!(
                "task {} failed: {}",
                result.task_id,
                result.error.as_deref().unwrap_or("unknown error")
            );

            let mut event = TaskEvent::new(TaskEventKind::Failed, Some(snapshot));
            event.node_id = node_id;
            event.error = result.error.clone();
            event.result = Some(result);
            self.emit_event(event);
        }
    }

    /// Select a node, record the assignment, and hand the task to the
    /// dispatcher. Any failure leaves the request queueable for a retry.
    async fn try_dispatch(&self, req: &ScheduleRequest) -> Result<ScheduleDecision, SchedulerError> {
        {
            let tasks = self.tasks.read().unwrap();
            if let Some(rec) = tasks.get(&req.task.id) {
                if rec.task.status.is_terminal() {
                    return Err(SchedulerError::AlreadyTerminal {
                        task_id: req.task.id.clone(),
                        status: rec.task.status,
                    });
                }
            }
        }

        let candidates = self
            .provider
            .list_profiles()
            .await
            .map_err(|source| SchedulerError::Provider { source })?;
        if candidates.is_empty() {
            return Err(SchedulerError::NoCandidates);
        }

        let selector: &dyn NodeSelector = match req.mode {
            ScheduleMode::Direct => &self.direct_sel,
            ScheduleMode::Ai => &self.ai_sel,
        };

        let decision = selector.select(req, &candidates)?;

        let mut task = req.task.clone();
        task.assigned_node_id = Some(decision.selected_node_id.clone());
        task.status = TaskStatus::Assigned;
        task.started_at = Some(SystemTime::now());
        task.completed_at = None;

        // The retry count survives re-dispatch of a rescheduled request.
        {
            let mut tasks = self.tasks.write().unwrap();
            let retries = tasks.get(&task.id).map(|rec| rec.retries).unwrap_or(0);
            tasks.insert(
                task.id.clone(),
                TaskRecord {
                    task: task.clone(),
                    decision: Some(decision.clone()),
                    request: req.clone(),
                    retries,
                },
            );
        }

        if let Err(source) = self
            .dispatcher
            .dispatch(&decision.selected_node_id, &task)
            .await
        {
            return Err(SchedulerError::Dispatch {
                task_id: task.id.clone(),
                node_id: decision.selected_node_id.clone(),
                source,
            });
        }

        self.stats
            .record_assignment(&task.id, &decision.selected_node_id, decision.latency);
        self.monitor.watch(&task);
        info!(
            "task {} assigned to node {} ({})",
            task.id, decision.selected_node_id, decision.reason
        );

        let mut event = TaskEvent::new(TaskEventKind::Assigned, Some(task));
        event.decision = Some(decision.clone());
        event.node_id = Some(decision.selected_node_id.clone());
        self.emit_event(event);

        Ok(decision)
    }

    /// Drain the queue head-first until a dispatch fails; a failure leaves
    /// the request queued for the next tick.
    async fn process_queue(&self) {
        loop {
            let Some(req) = self.queue.peek() else { return };

            match self.try_dispatch(&req).await {
                Ok(_) => {
                    self.queue.dequeue();
                }
                Err(SchedulerError::AlreadyTerminal { .. }) => {
                    // Defunct entry for a task that reached a terminal state
                    // while queued; drop it so it cannot block the head.
                    self.queue.remove(&req.task.id);
                }
                Err(err) => {
                    debug!("cannot dispatch queued task {} yet: {err}", req.task.id);
                    return;
                }
            }
        }
    }

    fn emit_event(&self, event: TaskEvent) {
        let listeners: Vec<Arc<dyn TaskEventListener>> = {
            self.listeners
                .read()
                .unwrap()
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect()
        };

        for listener in listeners {
            listener.on_event(&event);
        }
    }
}

impl MonitorEventHandler for Scheduler {
    fn on_task_timeout(&self, task_id: &str) {
        let snapshot = {
            let mut tasks = self.tasks.write().unwrap();
            match tasks.get_mut(task_id) {
                Some(rec) if !rec.task.status.is_terminal() => {
                    rec.task.status = TaskStatus::TimedOut;
                    rec.task.completed_at = Some(SystemTime::now());
                    Some(rec.task.clone())
                }
                _ => None,
            }
        };
        let Some(task) = snapshot else { return };

        self.stats.record_timeout(task_id);
        warn!("task {} timed out", task_id);
        self.emit_event(TaskEvent::new(TaskEventKind::TimedOut, Some(task)));
    }

    fn on_task_stalled(&self, task_id: &str) {
        enum Action {
            Reschedule(ScheduleRequest, Task, u32),
            Fail(Task),
        }

        let action = {
            let mut tasks = self.tasks.write().unwrap();
            let Some(rec) = tasks.get_mut(task_id) else { return };
            if rec.task.status.is_terminal() {
                return;
            }

            if rec.retries < self.config.max_retries {
                rec.retries += 1;
                rec.task.status = TaskStatus::Pending;
                rec.task.assigned_node_id = None;
                rec.task.started_at = None;
                Action::Reschedule(rec.request.clone(), rec.task.clone(), rec.retries)
            } else {
                rec.task.status = TaskStatus::Failed;
                rec.task.completed_at = Some(SystemTime::now());
                Action::Fail(rec.task.clone())
            }
        };

        match action {
            Action::Reschedule(request, task, retries) => {
                warn!(
                    "task {} stalled, re-queueing (retry {}/{})",
                    task_id, retries, self.config.max_retries
                );
                self.queue.enqueue(request);
                self.emit_event(TaskEvent::new(TaskEventKind::Rescheduled, Some(task)));
            }
            Action::Fail(task) => {
                // Retries exhausted: terminal failure. Drop the leftover
                // queue entry and watch so the task is tracked nowhere.
                self.queue.remove(task_id);
                self.monitor.unwatch(task_id);
                self.stats.record_failure(task_id, None);
                warn!(
                    "task {} stalled after {} retries, giving up",
                    task_id, self.config.max_retries
                );

                let mut event = TaskEvent::new(TaskEventKind::Failed, Some(task));
                event.error = Some(format!(
                    "task stalled after {} retries",
                    self.config.max_retries
                ));
                self.emit_event(event);
            }
        }
    }
}
