//! AgentQueue - the delivery engine
//!
//! Every mutating operation runs to completion inside one critical
//! section before any wake is delivered, which keeps the handoff-vs-store
//! decision race-free. The single reader slot is emptied before its wake
//! is sent, so an enqueue triggered from the woken side never observes a
//! stale parked reader.

use crate::core::sync::handle_mutex_poison;
use crate::queue::consumer::QueueConsumer;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::internal::MessageStore;
use crate::queue::message::AgentMessage;
use crate::queue::producer::QueueProducer;
use crate::queue::types::{CleanupHook, QueueOptions, QueueStats, StateSnapshot};
use log::{debug, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Signal delivered to a parked reader.
#[derive(Debug)]
pub(crate) enum ReaderWake {
    /// Direct handoff: the message never touched the store.
    Message(AgentMessage),
    Finished,
    Errored(String),
    Destroyed,
    /// Conditions changed (resume); the reader re-polls.
    Retry,
}

/// Outcome of a synchronous poll for the next message.
pub(crate) enum NextPoll {
    Ready(AgentMessage),
    Finished,
    /// Nothing deliverable right now; await the receiver.
    Park(oneshot::Receiver<ReaderWake>),
}

/// Mutable engine state; guarded by the one mutex in the system.
struct EngineState {
    store: MessageStore,
    /// The single suspended reader, if any. Occupied iff a `next()` call is parked.
    reader: Option<oneshot::Sender<ReaderWake>>,
    paused: bool,
    done: bool,
    errored: Option<String>,
    destroyed: bool,
    /// Deliveries not yet acknowledged.
    processing: usize,
    /// Deliveries acknowledged as failed.
    error_count: u64,
    stats: QueueStats,
}

impl EngineState {
    /// Park the calling reader in the single-reader slot. A stale sender
    /// whose receiver was dropped (a cancelled `next()` future) does not
    /// count as occupancy.
    fn park_reader(&mut self) -> QueueResult<oneshot::Receiver<ReaderWake>> {
        if let Some(existing) = &self.reader {
            if !existing.is_closed() {
                return Err(QueueError::Internal {
                    message: "reader slot already occupied".to_string(),
                });
            }
        }
        let (tx, rx) = oneshot::channel();
        self.reader = Some(tx);
        Ok(rx)
    }

    fn check_destroyed(&self) -> QueueResult<()> {
        if self.destroyed {
            return Err(QueueError::Destroyed);
        }
        Ok(())
    }

    /// Destroyed and errored are terminal for producers and the consumer alike.
    fn check_live(&self) -> QueueResult<()> {
        self.check_destroyed()?;
        if let Some(reason) = &self.errored {
            return Err(QueueError::Errored { reason: reason.clone() });
        }
        Ok(())
    }
}

/// Engine internals shared by the queue handle, producers, the consumer
/// and the cleanup task.
pub(crate) struct QueueShared {
    state: Mutex<EngineState>,
    /// One-way latch: set by the first consumer acquisition.
    started: AtomicBool,
    enable_stats: bool,
    cleanup_task: Mutex<Option<JoinHandle<()>>>,
}

impl QueueShared {
    fn lock_state(&self) -> QueueResult<MutexGuard<'_, EngineState>> {
        handle_mutex_poison(self.state.lock(), |message| QueueError::Internal {
            message,
        })
    }

    /// Producer-facing entry point. Decides handoff-vs-store synchronously
    /// under the lock: a message handed to a parked reader is never also
    /// inserted into the store.
    pub(crate) fn enqueue(&self, message: AgentMessage) -> QueueResult<()> {
        let (kind, priority, message_id) = (message.kind, message.priority, message.id);

        let mut state = self.lock_state()?;
        state.check_live()?;
        if state.done {
            return Err(QueueError::Done);
        }

        let mut fallback = Some(message);
        let mut handed_off = false;

        // Direct handoff is disabled while paused; paused producers
        // always go through the store.
        if !state.paused {
            if let Some(reader) = state.reader.take() {
                if let Some(message) = fallback.take() {
                    match reader.send(ReaderWake::Message(message)) {
                        Ok(()) => handed_off = true,
                        // The consumer future was dropped between parking
                        // and this wake; keep the message.
                        Err(ReaderWake::Message(message)) => fallback = Some(message),
                        Err(_) => unreachable!("send returns the value it was given"),
                    }
                }
            }
        }

        let mut depth = 0;
        if let Some(message) = fallback {
            depth = state.store.insert(message, Instant::now())?;
        }

        if handed_off {
            state.processing += 1;
        }
        if self.enable_stats {
            state.stats.total_enqueued += 1;
            *state.stats.by_kind.entry(kind).or_insert(0) += 1;
            *state.stats.by_priority.entry(priority).or_insert(0) += 1;
            if handed_off {
                state.stats.direct_handoffs += 1;
                state.stats.total_delivered += 1;
            }
        }
        drop(state);

        if handed_off {
            trace!("Message {} handed directly to waiting reader", message_id);
        } else {
            trace!("Message {} stored at depth {}", message_id, depth);
        }
        Ok(())
    }

    /// Consumer-facing synchronous poll. Returns a parked receiver when
    /// nothing is deliverable; the caller awaits it outside the lock.
    pub(crate) fn poll_next(&self) -> QueueResult<NextPoll> {
        let mut state = self.lock_state()?;
        state.check_live()?;

        if state.paused {
            // Held until resume re-polls us.
            return Ok(NextPoll::Park(state.park_reader()?));
        }

        let (popped, expired) = state.store.pop_ready(Instant::now());
        if self.enable_stats {
            state.stats.total_expired += expired as u64;
        }
        if expired > 0 {
            warn!("Discarded {} expired message(s) during dequeue", expired);
        }
        match popped {
            Some(message) => {
                state.processing += 1;
                if self.enable_stats {
                    state.stats.total_delivered += 1;
                }
                Ok(NextPoll::Ready(message))
            }
            None if state.done => Ok(NextPoll::Finished),
            None => Ok(NextPoll::Park(state.park_reader()?)),
        }
    }

    /// Consumer-side completion report for a delivered message.
    pub(crate) fn acknowledge(&self, message_id: u64, success: bool) -> QueueResult<()> {
        let mut state = self.lock_state()?;
        state.check_destroyed()?;
        state.processing = state.processing.saturating_sub(1);
        if !success {
            state.error_count += 1;
        }
        if self.enable_stats {
            if success {
                state.stats.total_completed += 1;
            } else {
                state.stats.total_failed += 1;
            }
        }
        trace!("Message {} acknowledged (success: {})", message_id, success);
        Ok(())
    }

    /// Best-effort sweep of expired entries anywhere in the store.
    pub(crate) fn sweep_expired(&self) -> QueueResult<usize> {
        let mut state = self.lock_state()?;
        state.check_destroyed()?;
        let removed = state.store.sweep_expired(Instant::now());
        if self.enable_stats {
            state.stats.total_expired += removed as u64;
        }
        Ok(removed)
    }
}

/// Single-consumer, multi-producer asynchronous message queue.
///
/// In-process and ephemeral: no durability, no fan-out. Producers enqueue
/// through [`QueueProducer`] handles; the one consumer drains through the
/// [`QueueConsumer`] returned by [`AgentQueue::consumer`].
pub struct AgentQueue {
    shared: Arc<QueueShared>,
    on_cleanup: Mutex<Option<CleanupHook>>,
}

impl AgentQueue {
    pub fn new(mut options: QueueOptions) -> Self {
        let on_cleanup = options.on_cleanup.take();
        let shared = Arc::new(QueueShared {
            state: Mutex::new(EngineState {
                store: MessageStore::new(
                    options.max_size,
                    options.message_ttl,
                    options.priority_queuing,
                ),
                reader: None,
                paused: false,
                done: false,
                errored: None,
                destroyed: false,
                processing: 0,
                error_count: 0,
                stats: QueueStats::default(),
            }),
            started: AtomicBool::new(false),
            enable_stats: options.enable_stats,
            cleanup_task: Mutex::new(None),
        });

        if options.auto_cleanup && !options.message_ttl.is_zero() {
            spawn_cleanup_task(&shared, options.cleanup_interval);
        }

        debug!(
            "Queue created (max_size: {}, ttl: {:?}, priority: {})",
            options.max_size, options.message_ttl, options.priority_queuing
        );
        Self {
            shared,
            on_cleanup: Mutex::new(on_cleanup),
        }
    }

    /// Create a producer handle. Any number of producers may exist.
    pub fn producer(&self) -> QueueProducer {
        QueueProducer::new(Arc::downgrade(&self.shared))
    }

    /// Acquire the single consumer handle; a second acquisition fails
    /// with [`QueueError::AlreadyStarted`].
    pub fn consumer(&self) -> QueueResult<QueueConsumer> {
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(QueueError::AlreadyStarted);
        }
        Ok(QueueConsumer::new(Arc::downgrade(&self.shared)))
    }

    /// Enqueue: direct handoff to a suspended reader when possible,
    /// priority-ordered store insertion otherwise.
    pub fn enqueue(&self, message: AgentMessage) -> QueueResult<()> {
        self.shared.enqueue(message)
    }

    /// Signal that no more messages will ever be produced. End-of-sequence
    /// reaches the reader once the store has drained.
    pub fn finish(&self) -> QueueResult<()> {
        let mut state = self.shared.lock_state()?;
        state.check_destroyed()?;
        if state.done {
            return Ok(());
        }
        state.done = true;
        if state.store.is_empty() {
            if let Some(reader) = state.reader.take() {
                let _ = reader.send(ReaderWake::Finished);
            }
        }
        debug!("Queue finished");
        Ok(())
    }

    /// Latch the terminal error state; the first error wins.
    pub fn fail(&self, reason: impl Into<String>) -> QueueResult<()> {
        let reason = reason.into();
        let mut state = self.shared.lock_state()?;
        state.check_destroyed()?;
        if state.errored.is_some() {
            return Ok(());
        }
        state.errored = Some(reason.clone());
        if let Some(reader) = state.reader.take() {
            let _ = reader.send(ReaderWake::Errored(reason.clone()));
        }
        warn!("Queue entered error state: {}", reason);
        Ok(())
    }

    /// Suspend delivery; enqueues go to the store until [`AgentQueue::resume`].
    pub fn pause(&self) -> QueueResult<()> {
        let mut state = self.shared.lock_state()?;
        state.check_destroyed()?;
        state.paused = true;
        debug!("Queue paused");
        Ok(())
    }

    /// Clear the pause flag and re-poll a reader held during the pause.
    pub fn resume(&self) -> QueueResult<()> {
        let mut state = self.shared.lock_state()?;
        state.check_destroyed()?;
        if !state.paused {
            return Ok(());
        }
        state.paused = false;
        if let Some(reader) = state.reader.take() {
            let _ = reader.send(ReaderWake::Retry);
        }
        debug!("Queue resumed");
        Ok(())
    }

    pub fn is_paused(&self) -> QueueResult<bool> {
        Ok(self.shared.lock_state()?.paused)
    }

    /// Highest-priority non-expired entry, without removing it.
    pub fn peek(&self) -> QueueResult<Option<AgentMessage>> {
        let mut state = self.shared.lock_state()?;
        state.check_destroyed()?;
        let (peeked, expired) = state.store.peek_ready(Instant::now());
        let peeked = peeked.cloned();
        if self.shared.enable_stats {
            state.stats.total_expired += expired as u64;
        }
        Ok(peeked)
    }

    /// Backing-store depth; an in-flight direct handoff is never counted.
    pub fn size(&self) -> QueueResult<usize> {
        Ok(self.shared.lock_state()?.store.len())
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.shared.lock_state()?.store.is_empty())
    }

    pub fn is_full(&self) -> QueueResult<bool> {
        Ok(self.shared.lock_state()?.store.is_full())
    }

    /// Purge the store; lifecycle flags are unaffected.
    pub fn clear(&self) -> QueueResult<usize> {
        let mut state = self.shared.lock_state()?;
        state.check_destroyed()?;
        let removed = state.store.clear();
        debug!("Queue cleared, {} message(s) removed", removed);
        Ok(removed)
    }

    /// Manually sweep expired entries; the periodic task calls the same path.
    pub fn sweep_expired(&self) -> QueueResult<usize> {
        self.shared.sweep_expired()
    }

    pub fn state(&self) -> QueueResult<StateSnapshot> {
        let state = self.shared.lock_state()?;
        Ok(StateSnapshot {
            started: self.shared.started.load(Ordering::SeqCst),
            done: state.done,
            errored: state.errored.clone(),
            destroyed: state.destroyed,
            paused: state.paused,
            depth: state.store.len(),
            processing_count: state.processing,
            error_count: state.error_count,
        })
    }

    pub fn stats(&self) -> QueueResult<QueueStats> {
        Ok(self.shared.lock_state()?.stats.clone())
    }

    /// Tear down: cancel the cleanup task, reject a pending reader, empty
    /// the store, run the cleanup hook, and latch the queue permanently
    /// unusable. Safe to call more than once.
    pub async fn destroy(&self) -> QueueResult<()> {
        let reader = {
            let mut state = self.shared.lock_state()?;
            if state.destroyed {
                return Ok(());
            }
            state.destroyed = true;
            state.store.clear();
            state.reader.take()
        };

        let task = handle_mutex_poison(self.shared.cleanup_task.lock(), |message| {
            QueueError::Internal { message }
        })?
        .take();
        if let Some(task) = task {
            task.abort();
        }

        if let Some(reader) = reader {
            let _ = reader.send(ReaderWake::Destroyed);
        }
        debug!("Queue destroyed");

        let hook = handle_mutex_poison(self.on_cleanup.lock(), |message| QueueError::Internal {
            message,
        })?
        .take();
        if let Some(hook) = hook {
            hook().await;
        }
        Ok(())
    }
}

/// Periodic best-effort sweep of expired entries. Holds a `Weak` so a
/// dropped queue stops the task; a destroyed one stops it via the sweep error.
fn spawn_cleanup_task(shared: &Arc<QueueShared>, interval: Duration) {
    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            debug!("No async runtime available; periodic cleanup disabled");
            return;
        }
    };

    let weak: std::sync::Weak<QueueShared> = Arc::downgrade(shared);
    let task = runtime.spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let Some(shared) = weak.upgrade() else { break };
            match shared.sweep_expired() {
                Ok(0) => {}
                Ok(removed) => debug!("Cleanup sweep removed {} expired message(s)", removed),
                Err(_) => break,
            }
        }
    });

    if let Ok(mut slot) = shared.cleanup_task.lock() {
        *slot = Some(task);
    }
}
