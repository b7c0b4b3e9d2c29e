//! Core events emitted by the engine

use pushup_device::DeviceReport;
use pushup_util::{RuleId, SessionId, UserId, ViolationId};
use std::time::Duration;

/// Why a command was dropped without reaching the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// The command file was empty
    Empty,
    /// Not of the form `rule_id|name`
    Malformed(String),
    /// The rule has no owning child
    NoOwner(RuleId),
    /// The command file could not be read or deleted
    Unreadable(String),
}

/// Events emitted by the engine
#[derive(Debug, Clone)]
pub enum CoreEvent {
    /// A command was consumed but not dispatched
    CommandDiscarded { reason: DiscardReason },

    /// Writing the command to the device failed; the loop stays idle
    DispatchFailed { rule_id: RuleId, error: String },

    /// Command sent to the device, session started
    SessionStarted {
        session_id: SessionId,
        rule_id: RuleId,
        user_id: UserId,
        wire_line: String,
    },

    /// The device sent a line that does not change state
    DeviceReported {
        session_id: SessionId,
        report: DeviceReport,
    },

    /// A `DONE` arrived too soon after dispatch and was ignored
    DoneIgnored {
        session_id: SessionId,
        elapsed: Duration,
    },

    /// The device reported completion; payment was triggered
    SessionCompleted {
        session_id: SessionId,
        rule_id: RuleId,
        violation_id: Option<ViolationId>,
        count: Option<u64>,
        elapsed: Duration,
        payment_ok: bool,
        marked_paid: bool,
    },

    /// The violation was paid through another channel mid-session
    ManuallyPaid {
        session_id: SessionId,
        rule_id: RuleId,
        polls: u32,
    },
}
