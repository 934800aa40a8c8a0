//! Shared utilities

pub mod angle;
pub mod time;
