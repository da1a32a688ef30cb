//! Message model and validated factory
//!
//! Messages are immutable once built: the factory stamps a fresh unique id
//! and creation timestamp, and rejects malformed payloads with a typed
//! [`ValidationError`] instead of panicking.

use crate::queue::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use strum_macros::EnumIter;

/// Upper bound on the combined text content of a single payload.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Process-wide id source; unique for the lifetime of any queue in this process.
static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// Dequeue priority; lower ordinal is delivered first.
#[derive(
    EnumIter, Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
    Deserialize,
)]
pub enum Priority {
    Critical = 0,
    High = 1,
    #[default]
    Normal = 2,
    Low = 3,
}

impl Priority {
    /// Numeric ordinal used for priority-ordered insertion.
    pub fn ordinal(&self) -> u8 {
        *self as u8
    }
}

/// Closed tag set of message categories flowing through the queue.
#[derive(EnumIter, Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    UserInput,
    Command,
    AgentOutput,
    AgentError,
    SystemControl,
    Response,
}

/// Control directives carried by [`MessagePayload::SystemControl`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlDirective {
    Pause,
    Resume,
    Shutdown,
    Interrupt,
}

/// Type-specific payload; the payload shape fixes the message kind, so a
/// kind/payload mismatch cannot be constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MessagePayload {
    UserInput { input: String, source: Option<String> },
    Command { name: String, args: Vec<String> },
    AgentOutput { content: String },
    AgentError { message: String, recoverable: bool },
    SystemControl { directive: ControlDirective },
    Response { content: String, success: bool },
}

impl MessagePayload {
    /// The message kind implied by this payload shape.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::UserInput { .. } => MessageKind::UserInput,
            Self::Command { .. } => MessageKind::Command,
            Self::AgentOutput { .. } => MessageKind::AgentOutput,
            Self::AgentError { .. } => MessageKind::AgentError,
            Self::SystemControl { .. } => MessageKind::SystemControl,
            Self::Response { .. } => MessageKind::Response,
        }
    }

    fn text_bytes(&self) -> usize {
        match self {
            Self::UserInput { input, source } => {
                input.len() + source.as_deref().map_or(0, str::len)
            }
            Self::Command { name, args } => {
                name.len() + args.iter().map(String::len).sum::<usize>()
            }
            Self::AgentOutput { content } => content.len(),
            Self::AgentError { message, .. } => message.len(),
            Self::SystemControl { .. } => 0,
            Self::Response { content, .. } => content.len(),
        }
    }
}

/// A discrete, typed, immutable unit of work or information.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AgentMessage {
    pub id: u64,
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub priority: Priority,
    pub payload: MessagePayload,
    /// Id of the message this one answers, for response messages.
    pub correlation_id: Option<u64>,
}

impl AgentMessage {
    /// Validated factory entry point. Response payloads must go through
    /// [`AgentMessage::response`] so the correlation id is populated.
    pub fn build(payload: MessagePayload, priority: Priority) -> Result<Self, ValidationError> {
        Self::validate(&payload)?;
        if matches!(payload, MessagePayload::Response { .. }) {
            return Err(ValidationError::MissingCorrelation);
        }
        Ok(Self::stamp(payload, priority, None))
    }

    pub fn user_input(input: impl Into<String>) -> Result<Self, ValidationError> {
        let input = input.into();
        Self::build(MessagePayload::UserInput { input, source: None }, Priority::Normal)
    }

    pub fn command(name: impl Into<String>, args: Vec<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        Self::build(MessagePayload::Command { name, args }, Priority::Normal)
    }

    pub fn agent_output(content: impl Into<String>) -> Result<Self, ValidationError> {
        let content = content.into();
        Self::build(MessagePayload::AgentOutput { content }, Priority::Normal)
    }

    /// Errors ship at high priority so the consumer sees them ahead of queued output.
    pub fn agent_error(
        message: impl Into<String>,
        recoverable: bool,
    ) -> Result<Self, ValidationError> {
        let message = message.into();
        Self::build(MessagePayload::AgentError { message, recoverable }, Priority::High)
    }

    /// Infallible: the directive set is closed and carries no free-form content.
    pub fn system_control(directive: ControlDirective) -> Self {
        Self::stamp(
            MessagePayload::SystemControl { directive },
            Priority::Critical,
            None,
        )
    }

    /// Build a response correlated to the message it answers.
    pub fn response(
        content: impl Into<String>,
        success: bool,
        correlates_to: u64,
    ) -> Result<Self, ValidationError> {
        let content = content.into();
        let payload = MessagePayload::Response { content, success };
        Self::validate(&payload)?;
        Ok(Self::stamp(payload, Priority::Normal, Some(correlates_to)))
    }

    /// Override the default priority before the message is handed to the queue.
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    fn stamp(payload: MessagePayload, priority: Priority, correlation_id: Option<u64>) -> Self {
        Self {
            id: NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed),
            kind: payload.kind(),
            timestamp: Utc::now(),
            priority,
            payload,
            correlation_id,
        }
    }

    fn validate(payload: &MessagePayload) -> Result<(), ValidationError> {
        use MessagePayload::*;
        let blank = match payload {
            UserInput { input, .. } if input.trim().is_empty() => Some("input"),
            Command { name, .. } if name.trim().is_empty() => Some("name"),
            AgentOutput { content } if content.is_empty() => Some("content"),
            Response { content, .. } if content.is_empty() => Some("content"),
            AgentError { message, .. } if message.is_empty() => Some("message"),
            _ => None,
        };
        if let Some(field) = blank {
            return Err(ValidationError::EmptyField { field });
        }

        let size = payload.text_bytes();
        if size > MAX_PAYLOAD_BYTES {
            return Err(ValidationError::PayloadTooLarge { size, limit: MAX_PAYLOAD_BYTES });
        }
        Ok(())
    }
}
