//! Mock device for testing

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::{DeviceChannel, DeviceError, DeviceResult};

#[derive(Debug, Default)]
struct MockDeviceState {
    sent: Vec<String>,
    /// `None` entries simulate a read timeout
    incoming: VecDeque<Option<String>>,
    fail_send: bool,
    fail_read: bool,
    reads: usize,
}

/// Scriptable device. Clones share state, so a test can keep one handle
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Arc<Mutex<MockDeviceState>>,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a line for the next read
    pub fn push_line(&self, line: impl Into<String>) {
        self.state.lock().unwrap().incoming.push_back(Some(line.into()));
    }

    /// Queue a read that times out
    pub fn push_timeout(&self) {
        self.state.lock().unwrap().incoming.push_back(None);
    }

    /// Lines written by the host so far
    pub fn sent_lines(&self) -> Vec<String> {
        self.state.lock().unwrap().sent.clone()
    }

    /// Number of read attempts so far
    pub fn read_count(&self) -> usize {
        self.state.lock().unwrap().reads
    }

    /// Configure writes to fail
    pub fn set_fail_send(&self, fail: bool) {
        self.state.lock().unwrap().fail_send = fail;
    }

    /// Configure reads to fail (still counted)
    pub fn set_fail_read(&self, fail: bool) {
        self.state.lock().unwrap().fail_read = fail;
    }
}

impl DeviceChannel for MockDevice {
    fn name(&self) -> &str {
        "mock"
    }

    fn send_line(&mut self, line: &str) -> DeviceResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_send {
            return Err(DeviceError::Disconnected);
        }
        state.sent.push(line.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> DeviceResult<Option<String>> {
        let mut state = self.state.lock().unwrap();
        state.reads += 1;
        if state.fail_read {
            return Err(DeviceError::Disconnected);
        }
        Ok(state.incoming.pop_front().flatten())
    }
}
