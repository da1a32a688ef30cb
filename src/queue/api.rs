//! Public API for the queue system
//!
//! This module provides the complete public API for the single-consumer
//! message queue. External modules should import from here rather than
//! directly from internal modules.

pub use crate::queue::consumer::QueueConsumer;
pub use crate::queue::manager::AgentQueue;
pub use crate::queue::producer::QueueProducer;

pub use crate::queue::message::{
    AgentMessage, ControlDirective, MessageKind, MessagePayload, Priority, MAX_PAYLOAD_BYTES,
};

pub use crate::queue::error::{QueueError, QueueResult, ValidationError};

pub use crate::queue::types::{CleanupHook, QueueOptions, QueueStats, StateSnapshot};
