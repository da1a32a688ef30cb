//! Single-Consumer Agent Message Queue
//!
//! An asynchronous, in-process queue that moves discrete, typed messages
//! from multiple producers to exactly one consumer: the agent's processing
//! loop. Supports priority ordering (stable for ties), lazy per-message
//! TTL expiry, pause/resume flow control and a small terminal-state
//! machine (done / error / destroyed). A message is either handed directly
//! to a suspended reader or inserted into the priority-ordered store.
//!
//! ```rust,no_run
//! use agentq::queue::api::{AgentMessage, AgentQueue, QueueOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let queue = AgentQueue::new(QueueOptions { max_size: 256, ..QueueOptions::default() });
//! let mut consumer = queue.consumer()?;
//!
//! let producer = queue.producer();
//! producer.send(AgentMessage::user_input("summarise the diff")?)?;
//!
//! queue.finish()?;
//! while let Some(message) = consumer.next().await? {
//!     println!("got {:?}", message.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;

mod consumer;
mod error;
mod internal;
mod manager;
mod message;
mod producer;
mod types;

pub use consumer::QueueConsumer;
pub use error::{QueueError, QueueResult, ValidationError};
pub use manager::AgentQueue;
pub use message::{
    AgentMessage, ControlDirective, MessageKind, MessagePayload, Priority, MAX_PAYLOAD_BYTES,
};
pub use producer::QueueProducer;
pub use types::{CleanupHook, QueueOptions, QueueStats, StateSnapshot};

#[cfg(test)]
mod tests;
