//! Core infrastructure shared across the crate

pub mod logging;
pub mod sync;
