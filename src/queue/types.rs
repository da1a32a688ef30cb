//! Construction-time options, running statistics, and lifecycle snapshots.

use crate::queue::message::{MessageKind, Priority};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::time::Duration;

/// Asynchronous hook invoked once during tear-down, after the store has
/// been emptied and any pending reader has been rejected.
pub type CleanupHook = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Construction-time configuration; immutable for the life of the queue.
pub struct QueueOptions {
    /// Maximum backing-store depth; 0 means unbounded.
    pub max_size: usize,
    /// Time-to-live for stored, undelivered messages; `Duration::ZERO` disables expiry.
    pub message_ttl: Duration,
    /// Insert in priority order (stable for equal priorities) instead of plain FIFO.
    pub priority_queuing: bool,
    /// Run the periodic best-effort sweep of expired entries.
    pub auto_cleanup: bool,
    /// Maintain running counters; delivery behaviour is identical either way.
    pub enable_stats: bool,
    /// Interval between cleanup sweeps when `auto_cleanup` is on.
    pub cleanup_interval: Duration,
    /// Optional tear-down hook.
    pub on_cleanup: Option<CleanupHook>,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            max_size: 0,
            message_ttl: Duration::ZERO,
            priority_queuing: true,
            auto_cleanup: true,
            enable_stats: true,
            cleanup_interval: Duration::from_secs(30),
            on_cleanup: None,
        }
    }
}

impl QueueOptions {
    /// Register an asynchronous tear-down hook.
    pub fn with_cleanup_hook<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.on_cleanup = Some(Box::new(move || Box::pin(hook())));
        self
    }
}

/// Running counters; maintained only when `enable_stats` is on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueueStats {
    /// Messages accepted by `enqueue`, stored or handed off.
    pub total_enqueued: u64,
    /// Messages yielded to the consumer.
    pub total_delivered: u64,
    /// Messages delivered straight to a suspended reader, bypassing the store.
    pub direct_handoffs: u64,
    /// Stored messages discarded because their TTL elapsed.
    pub total_expired: u64,
    /// Deliveries acknowledged as completed.
    pub total_completed: u64,
    /// Deliveries acknowledged as failed.
    pub total_failed: u64,
    /// Accepted messages by kind.
    pub by_kind: HashMap<MessageKind, u64>,
    /// Accepted messages by priority.
    pub by_priority: HashMap<Priority, u64>,
}

impl QueueStats {
    /// Fraction of acknowledged deliveries that failed.
    pub fn error_rate(&self) -> f64 {
        let acknowledged = self.total_completed + self.total_failed;
        if acknowledged == 0 {
            0.0
        } else {
            self.total_failed as f64 / acknowledged as f64
        }
    }
}

/// Point-in-time view of the queue's lifecycle flags and gauges.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    /// One-way latch set by the first (and only) consumer acquisition.
    pub started: bool,
    /// One-way latch: no further messages will be accepted.
    pub done: bool,
    /// One-way latch with the failure reason.
    pub errored: Option<String>,
    pub destroyed: bool,
    pub paused: bool,
    /// Current backing-store depth.
    pub depth: usize,
    /// Deliveries not yet acknowledged.
    pub processing_count: usize,
    /// Deliveries acknowledged as failed.
    pub error_count: u64,
}
