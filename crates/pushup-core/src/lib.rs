//! Control loop and session state machine for pushupd
//!
//! This crate ties the pieces together:
//! - Command handoff files (command inbox, busy lock)
//! - Session tracking (Idle -> Busy -> Idle)
//! - The engine that advances one loop iteration per `step`
//! - The producer side used by operator tooling

mod command;
mod engine;
mod events;
mod handoff;
mod producer;
mod session;

pub use command::*;
pub use engine::*;
pub use events::*;
pub use handoff::*;
pub use producer::*;
pub use session::*;
