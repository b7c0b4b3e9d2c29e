//! Producer side of the handoff, used by operator tooling

use pushup_store::ViolationStore;
use pushup_util::{PushupError, RuleId, UserId};
use tracing::info;

use crate::{BusyLock, Command, CommandInbox};

/// What a queued command refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueTarget {
    Rule(RuleId),
    /// The user's most recently created rule
    User(UserId),
}

/// Queue a command for the daemon.
///
/// Refuses while a command is waiting or a session holds the busy lock.
/// On success the busy lock is created immediately, stamped with the
/// current unix time, so concurrent producers back off before the daemon
/// picks the command up.
pub fn enqueue(
    inbox: &CommandInbox,
    lock: &BusyLock,
    store: &dyn ViolationStore,
    target: EnqueueTarget,
    display_name: &str,
) -> pushup_util::Result<Command> {
    if inbox.is_pending() {
        return Err(PushupError::CommandPending);
    }
    if lock.is_held() {
        return Err(PushupError::SessionInProgress);
    }

    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(PushupError::invalid_command("display name is empty"));
    }

    let rule_id = match target {
        EnqueueTarget::Rule(rule_id) => rule_id,
        EnqueueTarget::User(user_id) => store
            .latest_rule_for_user(user_id)
            .map_err(|e| PushupError::store(e.to_string()))?
            .ok_or(PushupError::NoRuleForUser(user_id))?,
    };

    let command = Command::new(rule_id, display_name);
    inbox
        .put(&command)
        .map_err(|e| PushupError::handoff(e.to_string()))?;
    lock.acquire(&pushup_util::now().timestamp().to_string())
        .map_err(|e| PushupError::handoff(e.to_string()))?;

    info!(command = %command, "Command queued");
    Ok(command)
}
