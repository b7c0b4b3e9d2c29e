//! Device channel traits

use std::path::PathBuf;
use thiserror::Error;

/// Errors from device channel operations
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No serial port found: {preferred} is missing and no port matches {prefixes:?}")]
    NotFound {
        preferred: PathBuf,
        prefixes: Vec<String>,
    },

    #[error("Failed to open {port}: {message}")]
    Open { port: String, message: String },

    #[error("Port enumeration failed: {0}")]
    Enumeration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device disconnected")]
    Disconnected,
}

pub type DeviceResult<T> = Result<T, DeviceError>;

/// A line-oriented connection to the push-up counter
pub trait DeviceChannel: Send {
    /// Human-readable endpoint name for logs
    fn name(&self) -> &str;

    /// Write one line; the newline terminator is appended here
    fn send_line(&mut self, line: &str) -> DeviceResult<()>;

    /// Read one complete line, waiting at most the channel's read timeout.
    /// Returns `Ok(None)` when nothing (or only a blank line) arrived.
    fn read_line(&mut self) -> DeviceResult<Option<String>>;
}
