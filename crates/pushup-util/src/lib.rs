//! Shared utilities for pushupd
//!
//! This crate provides:
//! - ID types (RuleId, UserId, ViolationId, SessionId)
//! - Time utilities (monotonic time, database timestamps)
//! - Error types
//! - Default paths for config, data, and the command handoff files

mod error;
mod ids;
mod paths;
mod time;

pub use error::*;
pub use ids::*;
pub use paths::*;
pub use time::*;
