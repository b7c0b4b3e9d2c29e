//! Control loop engine
//!
//! One `step` is one loop iteration. While idle it looks for a command file
//! and dispatches it to the device; while busy it reads one line from the
//! device, periodically checks for out-of-band payment, and reacts to the
//! device's reports. Every data-access failure is logged and treated as
//! "no result" so the loop never stops.

use pushup_billing::{PaymentGateway, PaymentRequest};
use pushup_config::SessionSettings;
use pushup_device::{DeviceChannel, DeviceCommand, DeviceReport, ReportAction};
use pushup_store::{PushupConfig, ViolationStore};
use pushup_util::{MonotonicInstant, RuleId, UserId, ViolationId};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::{
    ActiveSession, BusyLock, Command, CommandInbox, CoreEvent, DiscardReason, LOCK_CONTENT,
};

/// Outcome of one loop iteration
#[derive(Debug, Default)]
pub struct Step {
    pub events: Vec<CoreEvent>,

    /// The caller should sleep for the poll interval before the next step
    pub pause: bool,
}

impl Step {
    fn pause() -> Self {
        Self {
            events: Vec::new(),
            pause: true,
        }
    }

    fn proceed(events: Vec<CoreEvent>) -> Self {
        Self {
            events,
            pause: false,
        }
    }
}

/// The host side of the push-up handshake
pub struct BridgeEngine {
    store: Arc<dyn ViolationStore>,
    payments: Arc<dyn PaymentGateway>,
    device: Box<dyn DeviceChannel>,
    inbox: CommandInbox,
    lock: BusyLock,
    policy: SessionSettings,
    session: Option<ActiveSession>,
}

impl BridgeEngine {
    pub fn new(
        store: Arc<dyn ViolationStore>,
        payments: Arc<dyn PaymentGateway>,
        device: Box<dyn DeviceChannel>,
        inbox: CommandInbox,
        lock: BusyLock,
        policy: SessionSettings,
    ) -> Self {
        info!(
            device = %device.name(),
            command_file = %inbox.path().display(),
            busy_lock = %lock.path().display(),
            "Bridge engine initialized"
        );

        Self {
            store,
            payments,
            device,
            inbox,
            lock,
            policy,
            session: None,
        }
    }

    pub fn policy(&self) -> &SessionSettings {
        &self.policy
    }

    pub fn current_session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.session.is_some()
    }

    /// Advance the loop by one iteration
    pub fn step(&mut self, now_mono: MonotonicInstant) -> Step {
        if self.session.is_some() {
            self.step_busy(now_mono)
        } else {
            self.step_idle(now_mono)
        }
    }

    fn step_idle(&mut self, now_mono: MonotonicInstant) -> Step {
        let raw = match self.inbox.take() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Step::pause(),
            Err(e) => {
                error!(error = %e, "Failed to consume command file, dropping command");
                let mut step = Step::pause();
                step.events.push(CoreEvent::CommandDiscarded {
                    reason: DiscardReason::Unreadable(e.to_string()),
                });
                return step;
            }
        };

        if raw.is_empty() {
            debug!("Empty command file, ignoring");
            return Step::proceed(vec![CoreEvent::CommandDiscarded {
                reason: DiscardReason::Empty,
            }]);
        }

        let command = match raw.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!(raw = %raw, error = %e, "Invalid command, discarding");
                return Step::proceed(vec![CoreEvent::CommandDiscarded {
                    reason: DiscardReason::Malformed(raw),
                }]);
            }
        };

        Step::proceed(vec![self.dispatch(command, now_mono)])
    }

    fn dispatch(&mut self, command: Command, now_mono: MonotonicInstant) -> CoreEvent {
        let rule_id = command.rule_id;

        let Some(user_id) = self.owner_of(rule_id) else {
            warn!(rule_id = %rule_id, "No child for rule, discarding command");
            return CoreEvent::CommandDiscarded {
                reason: DiscardReason::NoOwner(rule_id),
            };
        };

        let config = self.config_for(user_id);
        let wire_line = DeviceCommand {
            user_id,
            display_name: command.display_name.clone(),
            repetitions: config.repetitions,
            rest_seconds: config.rest_seconds,
        }
        .to_wire_line();

        info!(rule_id = %rule_id, user_id = %user_id, line = %wire_line, "Sending command to device");

        if let Err(e) = self.device.send_line(&wire_line) {
            error!(rule_id = %rule_id, error = %e, "Failed to write command to device");
            return CoreEvent::DispatchFailed {
                rule_id,
                error: e.to_string(),
            };
        }

        let session = ActiveSession::new(
            rule_id,
            user_id,
            command.display_name,
            pushup_util::now(),
            now_mono,
        );

        if let Err(e) = self.lock.acquire(LOCK_CONTENT) {
            warn!(error = %e, "Failed to create busy lock");
        }

        info!(session_id = %session.session_id, rule_id = %rule_id, "Session started");

        let event = CoreEvent::SessionStarted {
            session_id: session.session_id.clone(),
            rule_id,
            user_id,
            wire_line,
        };
        self.session = Some(session);
        event
    }

    fn step_busy(&mut self, now_mono: MonotonicInstant) -> Step {
        let line = match self.device.read_line() {
            Ok(line) => line,
            Err(e) => {
                warn!(device = %self.device.name(), error = %e, "Device read failed");
                None
            }
        };

        let every = self.policy.manual_paid_check_every;
        let Some(session) = self.session.as_mut() else {
            return Step::pause();
        };
        let polls = session.record_poll();
        let check_due = session.manual_check_due(every);
        let rule_id = session.rule_id;

        if check_due && self.manually_paid(rule_id) {
            let Some(session) = self.session.take() else {
                return Step::pause();
            };
            info!(
                session_id = %session.session_id,
                rule_id = %rule_id,
                polls,
                "Violation paid manually, ending session"
            );
            self.release_lock();
            return Step::proceed(vec![CoreEvent::ManuallyPaid {
                session_id: session.session_id,
                rule_id,
                polls,
            }]);
        }

        let Some(line) = line else {
            return Step::pause();
        };

        info!(line = %line, "Received from device");
        Step::proceed(self.handle_report(DeviceReport::classify(&line), now_mono))
    }

    fn handle_report(&mut self, report: DeviceReport, now_mono: MonotonicInstant) -> Vec<CoreEvent> {
        let Some(session) = self.session.as_ref() else {
            return Vec::new();
        };
        let session_id = session.session_id.clone();

        match &report {
            DeviceReport::Status(status) if status.action == ReportAction::Done => {
                let elapsed = session.elapsed(now_mono);
                info!(
                    session_id = %session_id,
                    elapsed_secs = elapsed.as_secs_f64(),
                    "Device reported DONE"
                );

                if !session.accepts_done(now_mono, self.policy.min_session) {
                    warn!(session_id = %session_id, "DONE arrived too quickly, ignoring");
                    return vec![CoreEvent::DoneIgnored {
                        session_id,
                        elapsed,
                    }];
                }

                let Some(session) = self.session.take() else {
                    return Vec::new();
                };
                info!(
                    rule_id = %session.rule_id,
                    reported_user = status.user_id.as_deref().unwrap_or("?"),
                    count = status.count.unwrap_or(0),
                    "Series completed"
                );
                return vec![self.complete(session, status.count, elapsed)];
            }
            DeviceReport::Status(status) => match &status.action {
                ReportAction::AutoStart => info!("Device started an automatic series, ignoring"),
                other => info!(action = %other, "Unhandled device action"),
            },
            DeviceReport::MalformedJson(line) => warn!(line = %line, "Invalid JSON from device"),
            DeviceReport::Error(line) => error!(line = %line, "Device error"),
            DeviceReport::Ack(line) => info!(line = %line, "Device acknowledged command"),
            DeviceReport::Unrecognized(line) => info!(line = %line, "Unrecognized device line"),
        }

        vec![CoreEvent::DeviceReported { session_id, report }]
    }

    /// Pay and settle the violation for a finished session
    fn complete(&self, session: ActiveSession, count: Option<u64>, elapsed: Duration) -> CoreEvent {
        let rule_id = session.rule_id;
        let violation_id = self.unpaid_violation(rule_id);

        let (payment_ok, marked_paid) = match violation_id {
            Some(violation_id) => {
                let payment_ok = self.trigger_payment(rule_id, violation_id);
                (payment_ok, self.mark_paid(violation_id))
            }
            None => {
                warn!(rule_id = %rule_id, "No unpaid violation for rule, nothing to pay");
                (false, false)
            }
        };

        self.release_lock();

        CoreEvent::SessionCompleted {
            session_id: session.session_id,
            rule_id,
            violation_id,
            count,
            elapsed,
            payment_ok,
            marked_paid,
        }
    }

    /// Ask the billing endpoint to settle a violation. No retry.
    fn trigger_payment(&self, rule_id: RuleId, violation_id: ViolationId) -> bool {
        let Some(user_id) = self.owner_of(rule_id) else {
            warn!(rule_id = %rule_id, "No child for rule, skipping payment");
            return false;
        };

        let request = PaymentRequest::new(violation_id, user_id);
        match self.payments.request_payment(&request) {
            Ok(body) => {
                info!(user_id = %user_id, violation_id = %violation_id, response = %body, "Payment requested");
                true
            }
            Err(e) => {
                error!(user_id = %user_id, violation_id = %violation_id, error = %e, "Payment request failed");
                false
            }
        }
    }

    fn release_lock(&self) {
        match self.lock.release() {
            Ok(true) => info!(path = %self.lock.path().display(), "Busy lock cleared"),
            Ok(false) => debug!("Busy lock already absent"),
            Err(e) => warn!(error = %e, "Failed to remove busy lock"),
        }
    }

    // Fail-soft store access: errors are logged and read as "no result"

    fn owner_of(&self, rule_id: RuleId) -> Option<UserId> {
        self.store.resolve_owner(rule_id).unwrap_or_else(|e| {
            error!(rule_id = %rule_id, error = %e, "resolve_owner failed");
            None
        })
    }

    fn unpaid_violation(&self, rule_id: RuleId) -> Option<ViolationId> {
        self.store.find_unpaid_violation(rule_id).unwrap_or_else(|e| {
            error!(rule_id = %rule_id, error = %e, "find_unpaid_violation failed");
            None
        })
    }

    fn config_for(&self, user_id: UserId) -> PushupConfig {
        self.store.get_config(user_id).unwrap_or_else(|e| {
            error!(user_id = %user_id, error = %e, "get_config failed, using fallback");
            self.store.fallback_config()
        })
    }

    fn mark_paid(&self, violation_id: ViolationId) -> bool {
        match self.store.mark_paid(violation_id) {
            Ok(true) => {
                info!(violation_id = %violation_id, "Violation marked paid");
                true
            }
            Ok(false) => {
                info!(violation_id = %violation_id, "Violation was already paid");
                false
            }
            Err(e) => {
                error!(violation_id = %violation_id, error = %e, "mark_paid failed");
                false
            }
        }
    }

    fn manually_paid(&self, rule_id: RuleId) -> bool {
        self.store.is_manually_paid(rule_id).unwrap_or_else(|e| {
            error!(rule_id = %rule_id, error = %e, "is_manually_paid failed");
            false
        })
    }
}
