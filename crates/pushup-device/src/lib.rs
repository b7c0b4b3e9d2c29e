//! Device channel for pushupd
//!
//! This crate defines the interface between the control loop and the
//! push-up counter, and the newline-delimited protocol spoken over it:
//! - `DeviceChannel` trait (line out, line in with timeout)
//! - Serial implementation with port discovery
//! - Mock implementation for tests

mod mock;
mod protocol;
mod serial;
mod traits;

pub use mock::*;
pub use protocol::*;
pub use serial::*;
pub use traits::*;
