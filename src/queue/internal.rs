//! Internal backing store with priority ordering and lazy TTL
//!
//! The store holds only messages that could not be handed directly to a
//! suspended reader. Expiry is evaluated lazily at dequeue/peek time; the
//! periodic sweep in the engine exists for memory hygiene only.

use crate::queue::error::QueueError;
use crate::queue::message::AgentMessage;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct StoredMessage {
    message: AgentMessage,
    expires_at: Option<Instant>,
}

impl StoredMessage {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Priority-ordered message buffer. Insertion keeps the deque sorted by
/// priority ordinal with arrival order preserved among equal priorities.
#[derive(Debug)]
pub(crate) struct MessageStore {
    entries: VecDeque<StoredMessage>,
    /// 0 = unbounded.
    max_size: usize,
    /// `Duration::ZERO` = expiry disabled.
    ttl: Duration,
    priority_queuing: bool,
}

impl MessageStore {
    pub fn new(max_size: usize, ttl: Duration, priority_queuing: bool) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size,
            ttl,
            priority_queuing,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.max_size != 0 && self.entries.len() >= self.max_size
    }

    /// Insert a message, computing its expiry from the TTL setting.
    /// Returns the store depth after insertion.
    pub fn insert(&mut self, message: AgentMessage, now: Instant) -> Result<usize, QueueError> {
        if self.is_full() {
            return Err(QueueError::Full { max_size: self.max_size });
        }

        let entry = StoredMessage {
            expires_at: (!self.ttl.is_zero()).then(|| now + self.ttl),
            message,
        };

        let position = if self.priority_queuing {
            // Before the first entry with a higher ordinal; equal
            // priorities keep arrival order.
            let ordinal = entry.message.priority.ordinal();
            self.entries
                .iter()
                .position(|existing| existing.message.priority.ordinal() > ordinal)
                .unwrap_or(self.entries.len())
        } else {
            self.entries.len()
        };

        self.entries.insert(position, entry);
        Ok(self.entries.len())
    }

    /// Pop the highest-priority non-expired message, discarding expired
    /// entries encountered on the way. Returns the winner and the number
    /// of entries discarded.
    pub fn pop_ready(&mut self, now: Instant) -> (Option<AgentMessage>, usize) {
        let mut expired = 0;
        while let Some(entry) = self.entries.pop_front() {
            if entry.is_expired(now) {
                expired += 1;
                continue;
            }
            return (Some(entry.message), expired);
        }
        (None, expired)
    }

    /// The highest-priority non-expired message, without removing it.
    /// Expired entries at the front are discarded along the way.
    pub fn peek_ready(&mut self, now: Instant) -> (Option<&AgentMessage>, usize) {
        let mut expired = 0;
        while let Some(front) = self.entries.front() {
            if !front.is_expired(now) {
                break;
            }
            self.entries.pop_front();
            expired += 1;
        }
        (self.entries.front().map(|e| &e.message), expired)
    }

    /// Remove every expired entry, wherever it sits in the store.
    pub fn sweep_expired(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_expired(now));
        before - self.entries.len()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }
}
