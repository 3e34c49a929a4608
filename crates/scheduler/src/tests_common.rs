use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

use async_trait::async_trait;

use hivemind_core::task::Task;
use hivemind_core::types::{
    Capability, GolemProfile, NodeInfo, NodeLoadInfo, NodeStatus, SkillInfo, SystemInfo,
};

use crate::events::{TaskEvent, TaskEventKind, TaskEventListener};
use crate::request::ScheduleRequest;
use crate::{BoxError, ProfileProvider, TaskDispatcher};

pub fn make_profile(id: &str) -> GolemProfile {
    GolemProfile {
        node_info: NodeInfo {
            id: id.into(),
            capabilities: vec![Capability::new("exec")],
            system: SystemInfo {
                cpu_cores: 8,
                memory_mb: 16_384,
                disk_free_mb: 20_480,
            },
            status: NodeStatus::Online,
        },
        load: NodeLoadInfo::default(),
        installed_skills: vec![SkillInfo {
            id: "skill-browser".into(),
            name: "browser".into(),
            version: "1.0.0".into(),
            capabilities: vec!["navigate".into()],
        }],
        supported_features: vec!["sandbox_execution".into()],
        tags: HashMap::new(),
        health_score: 1.0,
        last_updated: SystemTime::now(),
    }
}

pub fn make_ai_request(task_id: &str) -> ScheduleRequest {
    ScheduleRequest::builder(Task::new(task_id)).build()
}

pub fn make_direct_request(task_id: &str, node_id: &str) -> ScheduleRequest {
    ScheduleRequest::builder(Task::new(task_id))
        .direct_mode(node_id)
        .build()
}

/// Profile provider backed by a mutable in-memory list.
pub struct MockProvider {
    profiles: Mutex<Vec<GolemProfile>>,
}

impl MockProvider {
    pub fn new(profiles: Vec<GolemProfile>) -> Arc<Self> {
        Arc::new(Self {
            profiles: Mutex::new(profiles),
        })
    }

    pub fn set_profiles(&self, profiles: Vec<GolemProfile>) {
        *self.profiles.lock().unwrap() = profiles;
    }
}

#[async_trait]
impl ProfileProvider for MockProvider {
    async fn list_profiles(&self) -> Result<Vec<GolemProfile>, BoxError> {
        Ok(self.profiles.lock().unwrap().clone())
    }

    async fn get_profile(&self, node_id: &str) -> Result<GolemProfile, BoxError> {
        self.profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.node_info.id == node_id)
            .cloned()
            .ok_or_else(|| format!("node {node_id} not found").into())
    }
}

/// Dispatcher that records successful sends and can be told to refuse.
pub struct MockDispatcher {
    calls: Mutex<Vec<(String, Task)>>,
    fail: AtomicBool,
}

impl MockDispatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(String, Task)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TaskDispatcher for MockDispatcher {
    async fn dispatch(&self, node_id: &str, task: &Task) -> Result<(), BoxError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("dispatch refused".into());
        }
        self.calls
            .lock()
            .unwrap()
            .push((node_id.to_string(), task.clone()));
        Ok(())
    }
}

/// Listener that records every event it sees.
pub struct RecordingListener {
    events: Mutex<Vec<TaskEvent>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    pub fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<TaskEventKind> {
        self.events.lock().unwrap().iter().map(|e| e.kind).collect()
    }

    pub fn count(&self, kind: TaskEventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind == kind)
            .count()
    }
}

impl TaskEventListener for RecordingListener {
    fn on_event(&self, event: &TaskEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}
