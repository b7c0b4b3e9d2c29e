//! Line protocol between host and push-up counter
//!
//! Outbound: `<user_id>|<display_name>|<repetitions>|<rest_seconds>`
//!
//! Inbound, one of:
//! - a JSON object with `action` and optionally `user_id` and `count`
//! - a line starting with `ERR`
//! - a line starting with `ACK|START`
//! - anything else (logged and ignored)

use pushup_util::UserId;
use serde_json::Value;
use std::fmt;

/// Action the counter reports when a series is finished
pub const DONE_ACTION: &str = "DONE";

/// Action the counter reports when it starts a series by itself
pub const AUTO_START_ACTION: &str = "🌀 AUTO_START";

/// Lines longer than this without a newline are discarded
const MAX_PENDING_BYTES: usize = 4096;

/// Command sent to the counter to start a series
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCommand {
    pub user_id: UserId,
    pub display_name: String,
    pub repetitions: u32,
    pub rest_seconds: u32,
}

impl DeviceCommand {
    /// Encode as a wire line (without the newline terminator).
    ///
    /// Field separators and line breaks inside the name are replaced with
    /// spaces so the counter always sees exactly four fields.
    pub fn to_wire_line(&self) -> String {
        let name: String = self
            .display_name
            .chars()
            .map(|c| if c == '|' || c == '\n' || c == '\r' { ' ' } else { c })
            .collect();
        format!(
            "{}|{}|{}|{}",
            self.user_id, name, self.repetitions, self.rest_seconds
        )
    }
}

/// `action` field of a JSON status report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportAction {
    Done,
    AutoStart,
    Other(String),
    Missing,
}

impl ReportAction {
    fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Missing,
            Some(Value::String(s)) if s == DONE_ACTION => Self::Done,
            Some(Value::String(s)) if is_auto_start(s) => Self::AutoStart,
            Some(Value::String(s)) => Self::Other(s.clone()),
            Some(other) => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ReportAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => write!(f, "{DONE_ACTION}"),
            Self::AutoStart => write!(f, "{AUTO_START_ACTION}"),
            Self::Other(s) => write!(f, "{s}"),
            Self::Missing => write!(f, "<none>"),
        }
    }
}

/// Accepts the sentinel with or without its emoji prefix
fn is_auto_start(action: &str) -> bool {
    action == AUTO_START_ACTION || action.trim_start_matches('🌀').trim() == "AUTO_START"
}

/// Parsed JSON report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub action: ReportAction,
    /// Echoed child id; the counter sends it as a string or a number
    pub user_id: Option<String>,
    pub count: Option<u64>,
}

/// A classified inbound line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReport {
    Status(StatusReport),
    MalformedJson(String),
    Error(String),
    Ack(String),
    Unrecognized(String),
}

impl DeviceReport {
    /// Classify one inbound line
    pub fn classify(line: &str) -> Self {
        let line = line.trim();

        if line.starts_with('{') && line.ends_with('}') {
            return match serde_json::from_str::<Value>(line) {
                Ok(Value::Object(obj)) => Self::Status(StatusReport {
                    action: ReportAction::from_value(obj.get("action")),
                    user_id: obj.get("user_id").and_then(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        Value::Number(n) => Some(n.to_string()),
                        _ => None,
                    }),
                    count: obj.get("count").and_then(Value::as_u64),
                }),
                _ => Self::MalformedJson(line.to_string()),
            };
        }

        if line.starts_with("ERR") {
            Self::Error(line.to_string())
        } else if line.starts_with("ACK|START") {
            Self::Ack(line.to_string())
        } else {
            Self::Unrecognized(line.to_string())
        }
    }
}

/// Reassembles newline-terminated lines from arbitrary byte chunks
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        if self.pending.len() > MAX_PENDING_BYTES && !self.pending.contains(&b'\n') {
            tracing::warn!(
                discarded = self.pending.len(),
                "Device sent an overlong line, discarding"
            );
            self.pending.clear();
        }
    }

    /// Take the next complete line, trimmed and decoded lossily.
    /// Blank lines are skipped.
    pub fn next_line(&mut self) -> Option<String> {
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw).trim().to_string();
            if !line.is_empty() {
                return Some(line);
            }
        }
        None
    }
}
