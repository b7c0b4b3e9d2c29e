//! Device session tracking

use chrono::{DateTime, Local};
use pushup_util::{MonotonicInstant, RuleId, SessionId, UserId};
use std::time::Duration;

/// A dispatched command waiting for the counter to report back
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub session_id: SessionId,
    pub rule_id: RuleId,
    pub user_id: UserId,
    pub display_name: String,

    /// Wall-clock dispatch time (for logging)
    pub dispatched_at: DateTime<Local>,

    /// Monotonic dispatch time (for the minimum-duration check)
    pub dispatched_at_mono: MonotonicInstant,

    /// Device reads since dispatch
    polls: u32,
}

impl ActiveSession {
    pub fn new(
        rule_id: RuleId,
        user_id: UserId,
        display_name: impl Into<String>,
        now: DateTime<Local>,
        now_mono: MonotonicInstant,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            rule_id,
            user_id,
            display_name: display_name.into(),
            dispatched_at: now,
            dispatched_at_mono: now_mono,
            polls: 0,
        }
    }

    /// Count one device read; returns the new poll count
    pub fn record_poll(&mut self) -> u32 {
        self.polls = self.polls.saturating_add(1);
        self.polls
    }

    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Whether the out-of-band payment check runs on the current poll
    pub fn manual_check_due(&self, every: u32) -> bool {
        self.polls > 0 && self.polls % every.max(1) == 0
    }

    /// Time since dispatch
    pub fn elapsed(&self, now_mono: MonotonicInstant) -> Duration {
        now_mono.duration_since(self.dispatched_at_mono)
    }

    /// A `DONE` sooner than `min_session` after dispatch cannot be a real series
    pub fn accepts_done(&self, now_mono: MonotonicInstant, min_session: Duration) -> bool {
        self.elapsed(now_mono) >= min_session
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_session(now_mono: MonotonicInstant) -> ActiveSession {
        ActiveSession::new(
            RuleId::new(7),
            UserId::new(42),
            "Alice",
            Local::now(),
            now_mono,
        )
    }

    #[test]
    fn test_session_creation() {
        let now = MonotonicInstant::now();
        let session = make_session(now);

        assert_eq!(session.polls(), 0);
        assert_eq!(session.elapsed(now), Duration::ZERO);
        assert!(!session.manual_check_due(5));
    }

    #[test]
    fn test_manual_check_every_fifth_poll() {
        let mut session = make_session(MonotonicInstant::now());

        let due: Vec<u32> = (0..12)
            .filter_map(|_| {
                let polls = session.record_poll();
                session.manual_check_due(5).then_some(polls)
            })
            .collect();

        assert_eq!(due, vec![5, 10]);
    }

    #[test]
    fn test_done_minimum_duration() {
        let start = MonotonicInstant::now();
        let session = make_session(start);
        let min = Duration::from_secs(2);

        assert!(!session.accepts_done(start + Duration::from_secs(1), min));
        assert!(session.accepts_done(start + Duration::from_secs(2), min));
        assert!(session.accepts_done(start + Duration::from_secs(3), min));
    }
}
