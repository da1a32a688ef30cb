//! Queue Consumer - the single-reader iteration protocol
//!
//! There is exactly one consumer per queue, enforced by the engine's
//! one-way `started` latch and by this handle being neither cloneable nor
//! re-acquirable; `next()` takes `&mut self`, so a single handle cannot
//! hold two reads in flight either.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::manager::{NextPoll, QueueShared, ReaderWake};
use crate::queue::message::AgentMessage;
use std::sync::Weak;

/// The single consumer handle for a queue.
pub struct QueueConsumer {
    shared: Weak<QueueShared>,
}

impl QueueConsumer {
    pub(crate) fn new(shared: Weak<QueueShared>) -> Self {
        Self { shared }
    }

    /// Wait for the next message.
    ///
    /// Returns `Ok(Some(message))` on delivery, `Ok(None)` once the queue
    /// is finished and drained, and an error when the queue failed or was
    /// destroyed. While the queue is paused the request is held and
    /// re-polled on resume.
    pub async fn next(&mut self) -> QueueResult<Option<AgentMessage>> {
        let shared = self.shared.upgrade().ok_or(QueueError::Destroyed)?;
        loop {
            match shared.poll_next()? {
                NextPoll::Ready(message) => return Ok(Some(message)),
                NextPoll::Finished => return Ok(None),
                NextPoll::Park(receiver) => match receiver.await {
                    Ok(ReaderWake::Message(message)) => return Ok(Some(message)),
                    Ok(ReaderWake::Finished) => return Ok(None),
                    Ok(ReaderWake::Errored(reason)) => return Err(QueueError::Errored { reason }),
                    Ok(ReaderWake::Destroyed) => return Err(QueueError::Destroyed),
                    Ok(ReaderWake::Retry) => continue,
                    // Sender dropped with the engine; treat as tear-down.
                    Err(_) => return Err(QueueError::Destroyed),
                },
            }
        }
    }

    /// Report the outcome of processing a delivered message.
    pub fn acknowledge(&self, message_id: u64, success: bool) -> QueueResult<()> {
        let shared = self.shared.upgrade().ok_or(QueueError::Destroyed)?;
        shared.acknowledge(message_id, success)
    }

    /// Whether the queue behind this handle still exists.
    pub fn is_connected(&self) -> bool {
        self.shared.strong_count() > 0
    }
}
