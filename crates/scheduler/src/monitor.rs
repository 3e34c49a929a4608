use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, warn};

use hivemind_core::config::MonitorSettings;
use hivemind_core::task::Task;

/// Receives notifications when the monitor detects timeout or stall
/// conditions. Implemented by the scheduler; passing the handler at start
/// time keeps the monitor free of any scheduler reference.
pub trait MonitorEventHandler: Send + Sync {
    /// The task exceeded its configured timeout. The monitor has already
    /// stopped watching it.
    fn on_task_timeout(&self, task_id: &str);

    /// No heartbeat was received within the stall window. The task stays
    /// watched so the handler may reschedule or unwatch it.
    fn on_task_stalled(&self, task_id: &str);
}

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// How often watched tasks are checked for timeouts and stalls.
    pub poll_interval: Duration,
    /// Maximum duration without a heartbeat before a task counts as stalled.
    pub stall_threshold: Duration,
    /// Applied to tasks that do not specify their own timeout.
    pub default_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            stall_threshold: Duration::from_secs(60),
            default_timeout: Duration::from_secs(300),
        }
    }
}

impl MonitorConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
            stall_threshold: Duration::from_millis(settings.stall_threshold_ms),
            default_timeout: Duration::from_millis(settings.default_timeout_ms),
        }
    }
}

struct WatchedTask {
    started_at: Instant,
    last_heartbeat: Instant,
    timeout: Duration,
}

/// Watches running tasks, enforcing per-task timeouts and detecting stalled
/// workers via heartbeat age.
pub struct Monitor {
    config: MonitorConfig,
    watched: Arc<RwLock<HashMap<String, WatchedTask>>>,
    stop_tx: watch::Sender<bool>,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            config,
            watched: Arc::new(RwLock::new(HashMap::new())),
            stop_tx,
        }
    }

    /// Begin monitoring a task's execution. A zero task timeout falls back
    /// to the configured default.
    pub fn watch(&self, task: &Task) {
        let timeout = if task.timeout.is_zero() {
            self.config.default_timeout
        } else {
            task.timeout
        };

        let now = Instant::now();
        self.watched.write().unwrap().insert(
            task.id.clone(),
            WatchedTask {
                started_at: now,
                last_heartbeat: now,
                timeout,
            },
        );
        debug!("watching task {} (timeout {:?})", task.id, timeout);
    }

    /// Stop monitoring a task. Called on completion or cancellation.
    pub fn unwatch(&self, task_id: &str) {
        self.watched.write().unwrap().remove(task_id);
    }

    /// Reset the stall timer for a task.
    pub fn record_heartbeat(&self, task_id: &str) {
        if let Some(wt) = self.watched.write().unwrap().get_mut(task_id) {
            wt.last_heartbeat = Instant::now();
        }
    }

    /// IDs of all currently monitored tasks.
    pub fn active_tasks(&self) -> Vec<String> {
        self.watched.read().unwrap().keys().cloned().collect()
    }

    /// Spawn the background polling loop, reporting detections to `handler`.
    pub fn start(&self, handler: Arc<dyn MonitorEventHandler>) {
        let watched = Arc::clone(&self.watched);
        let config = self.config.clone();
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(config.poll_interval);
            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => check_tasks(&watched, &config, handler.as_ref()),
                }
            }
            debug!("monitor loop stopped");
        });
    }

    /// Signal the polling loop to exit. Safe to call more than once.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

fn check_tasks(
    watched: &RwLock<HashMap<String, WatchedTask>>,
    config: &MonitorConfig,
    handler: &dyn MonitorEventHandler,
) {
    let now = Instant::now();
    let mut timed_out = Vec::new();
    let mut stalled = Vec::new();

    // Snapshot under the read lock; fire handlers outside it.
    {
        let guard = watched.read().unwrap();
        for (id, wt) in guard.iter() {
            if now.duration_since(wt.started_at) > wt.timeout {
                timed_out.push(id.clone());
            } else if now.duration_since(wt.last_heartbeat) > config.stall_threshold {
                stalled.push(id.clone());
            }
        }
    }

    for id in timed_out {
        warn!("task {} exceeded its timeout", id);
        handler.on_task_timeout(&id);
        watched.write().unwrap().remove(&id);
    }
    for id in stalled {
        warn!("task {} has not sent a heartbeat within {:?}", id, config.stall_threshold);
        handler.on_task_stalled(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingHandler {
        timeouts: Mutex<Vec<String>>,
        stalls: Mutex<Vec<String>>,
    }

    impl MonitorEventHandler for RecordingHandler {
        fn on_task_timeout(&self, task_id: &str) {
            self.timeouts.lock().unwrap().push(task_id.to_string());
        }

        fn on_task_stalled(&self, task_id: &str) {
            self.stalls.lock().unwrap().push(task_id.to_string());
        }
    }

    fn fast_config(timeout_ms: u64, stall_ms: u64) -> MonitorConfig {
        MonitorConfig {
            poll_interval: Duration::from_millis(10),
            stall_threshold: Duration::from_millis(stall_ms),
            default_timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[tokio::test]
    async fn test_timeout_fires_and_unwatches() {
        let monitor = Monitor::new(fast_config(30, 10_000));
        let handler = Arc::new(RecordingHandler::default());
        monitor.start(handler.clone());

        monitor.watch(&Task::new("t1"));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(handler.timeouts.lock().unwrap().clone(), vec!["t1"]);
        assert!(monitor.active_tasks().is_empty());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_explicit_task_timeout_overrides_default() {
        let monitor = Monitor::new(fast_config(60_000, 10_000));
        let handler = Arc::new(RecordingHandler::default());
        monitor.start(handler.clone());

        let mut task = Task::new("t1");
        task.timeout = Duration::from_millis(30);
        monitor.watch(&task);
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert_eq!(handler.timeouts.lock().unwrap().clone(), vec!["t1"]);
        monitor.stop();
    }

    #[tokio::test]
    async fn test_stall_fires_but_keeps_watching() {
        let monitor = Monitor::new(fast_config(60_000, 30));
        let handler = Arc::new(RecordingHandler::default());
        monitor.start(handler.clone());

        monitor.watch(&Task::new("t1"));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(!handler.stalls.lock().unwrap().is_empty());
        assert!(handler.timeouts.lock().unwrap().is_empty());
        assert_eq!(monitor.active_tasks(), vec!["t1"]);
        monitor.stop();
    }

    #[tokio::test]
    async fn test_heartbeat_defers_stall() {
        let monitor = Monitor::new(fast_config(60_000, 300));
        let handler = Arc::new(RecordingHandler::default());
        monitor.start(handler.clone());

        monitor.watch(&Task::new("t1"));
        for _ in 0..6 {
            tokio::time::sleep(Duration::from_millis(50)).await;
            monitor.record_heartbeat("t1");
        }
        assert!(handler.stalls.lock().unwrap().is_empty());

        // No more heartbeats; the stall must eventually fire.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert!(!handler.stalls.lock().unwrap().is_empty());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_unwatch_prevents_detection() {
        let monitor = Monitor::new(fast_config(30, 30));
        let handler = Arc::new(RecordingHandler::default());
        monitor.start(handler.clone());

        monitor.watch(&Task::new("t1"));
        monitor.unwatch("t1");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert!(handler.timeouts.lock().unwrap().is_empty());
        assert!(handler.stalls.lock().unwrap().is_empty());
        monitor.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let monitor = Monitor::new(MonitorConfig::default());
        monitor.start(Arc::new(RecordingHandler::default()));
        monitor.stop();
        monitor.stop();
    }

    #[test]
    fn test_config_from_settings() {
        let settings = MonitorSettings {
            poll_interval_ms: 250,
            stall_threshold_ms: 1_500,
            default_timeout_ms: 9_000,
        };
        let config = MonitorConfig::from_settings(&settings);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
        assert_eq!(config.stall_threshold, Duration::from_millis(1_500));
        assert_eq!(config.default_timeout, Duration::from_secs(9));
    }
}
