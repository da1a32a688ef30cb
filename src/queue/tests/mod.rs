//! Test modules for the queue system
//!
//! Organised by functional area, mirroring the public surface: message
//! construction, core delivery, the iteration protocol, lifecycle latches,
//! expiry, and interleaved producer/consumer behaviour.

mod consumer;
mod lifecycle;
