//! Queue Producer handle
//!
//! Producers send messages into the queue from anywhere in the host.
//! Handles are cheap, hold only a weak reference to the engine, and
//! report explicit outcomes; a producer under backpressure decides for
//! itself whether to retry, buffer, or drop.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::manager::QueueShared;
use crate::queue::message::AgentMessage;
use std::sync::Weak;

/// Producer handle for enqueuing messages. Any number may exist
/// concurrently; a handle outliving its queue fails with
/// [`QueueError::Destroyed`].
#[derive(Clone)]
pub struct QueueProducer {
    shared: Weak<QueueShared>,
}

impl QueueProducer {
    pub(crate) fn new(shared: Weak<QueueShared>) -> Self {
        Self { shared }
    }

    /// Enqueue a message.
    pub fn send(&self, message: AgentMessage) -> QueueResult<()> {
        let shared = self.shared.upgrade().ok_or(QueueError::Destroyed)?;
        shared.enqueue(message)
    }

    /// Whether the queue behind this handle still exists.
    pub fn is_connected(&self) -> bool {
        self.shared.strong_count() > 0
    }
}
