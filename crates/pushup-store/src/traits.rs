//! Store trait definitions

use pushup_util::{RuleId, UserId, ViolationId};

use crate::StoreResult;

/// Push-up session parameters for one child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushupConfig {
    pub repetitions: u32,
    pub rest_seconds: u32,
}

impl PushupConfig {
    pub const fn new(repetitions: u32, rest_seconds: u32) -> Self {
        Self {
            repetitions,
            rest_seconds,
        }
    }
}

impl Default for PushupConfig {
    fn default() -> Self {
        Self::new(20, 20)
    }
}

/// Violation database interface.
///
/// Every call is independent: implementations must not rely on state carried
/// between calls. Callers in the control loop treat errors as "no result".
pub trait ViolationStore: Send + Sync {
    // Rules

    /// Child that owns a rule
    fn resolve_owner(&self, rule_id: RuleId) -> StoreResult<Option<UserId>>;

    /// Newest rule belonging to a child
    fn latest_rule_for_user(&self, user_id: UserId) -> StoreResult<Option<RuleId>>;

    // Violations

    /// Most recently created unpaid violation for a rule
    fn find_unpaid_violation(&self, rule_id: RuleId) -> StoreResult<Option<ViolationId>>;

    /// Set the payment timestamp if the violation is still unpaid.
    /// Returns whether a row changed.
    fn mark_paid(&self, violation_id: ViolationId) -> StoreResult<bool>;

    /// Whether the rule's most recent violation has been paid
    fn is_manually_paid(&self, rule_id: RuleId) -> StoreResult<bool>;

    /// Rule of the child's oldest unpaid violation
    fn oldest_unpaid_rule_for_user(&self, user_id: UserId) -> StoreResult<Option<RuleId>>;

    // Configuration

    /// Latest push-up configuration for a child, or the fallback pair
    fn get_config(&self, user_id: UserId) -> StoreResult<PushupConfig>;

    /// Configuration used when a child has none
    fn fallback_config(&self) -> PushupConfig;

    // Health

    /// Check if store is reachable
    fn is_healthy(&self) -> bool;
}
