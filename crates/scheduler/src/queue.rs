use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Mutex;

use crate::request::ScheduleRequest;

/// Thread-safe priority queue of pending schedule requests. Higher-priority
/// tasks are dequeued first; among equal priorities, FIFO order is kept via
/// a monotone insertion counter.
pub struct PriorityQueue {
    inner: Mutex<QueueInner>,
}

struct QueueInner {
    heap: BinaryHeap<QueuedRequest>,
    seq: u64,
}

struct QueuedRequest {
    request: ScheduleRequest,
    priority: i32,
    seq: u64,
}

impl PartialEq for QueuedRequest {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}

impl Eq for QueuedRequest {}

impl PartialOrd for QueuedRequest {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedRequest {
    // BinaryHeap is a max-heap: greater = dequeued first. Higher priority
    // wins; on ties the lower sequence number (earlier insertion) wins.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                heap: BinaryHeap::new(),
                seq: 0,
            }),
        }
    }

    /// Add a request to the queue.
    pub fn enqueue(&self, request: ScheduleRequest) {
        let mut inner = self.inner.lock().unwrap();
        inner.seq += 1;
        let item = QueuedRequest {
            priority: request.task.priority,
            seq: inner.seq,
            request,
        };
        inner.heap.push(item);
    }

    /// Remove and return the highest-priority request, if any.
    pub fn dequeue(&self) -> Option<ScheduleRequest> {
        let mut inner = self.inner.lock().unwrap();
        inner.heap.pop().map(|item| item.request)
    }

    /// Return a copy of the highest-priority request without removing it.
    pub fn peek(&self) -> Option<ScheduleRequest> {
        let inner = self.inner.lock().unwrap();
        inner.heap.peek().map(|item| item.request.clone())
    }

    /// Remove the request for a specific task ID. Returns whether anything
    /// was removed.
    pub fn remove(&self, task_id: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let before = inner.heap.len();
        let items: Vec<QueuedRequest> = std::mem::take(&mut inner.heap).into_vec();
        inner.heap = items
            .into_iter()
            .filter(|item| item.request.task.id != task_id)
            .collect();
        inner.heap.len() < before
    }

    /// Pop all queued requests in priority order, emptying the queue.
    pub fn drain(&self) -> Vec<ScheduleRequest> {
        let mut inner = self.inner.lock().unwrap();
        let mut result = Vec::with_capacity(inner.heap.len());
        while let Some(item) = inner.heap.pop() {
            result.push(item.request);
        }
        result
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PriorityQueue {
    fn default() -> Self {
        Self::new()
    }
}
