//! Commands dropped by the web application

use pushup_util::{PushupError, RuleId};
use std::fmt;
use std::str::FromStr;

/// One queued request: which rule to settle and whose name to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub rule_id: RuleId,
    pub display_name: String,
}

impl Command {
    pub fn new(rule_id: RuleId, display_name: impl Into<String>) -> Self {
        Self {
            rule_id,
            display_name: display_name.into(),
        }
    }
}

impl FromStr for Command {
    type Err = PushupError;

    /// Parse `<rule_id>|<display_name>`; everything after the first `|` is the name
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (rule, name) = raw
            .trim()
            .split_once('|')
            .ok_or_else(|| PushupError::invalid_command(format!("missing '|' in '{raw}'")))?;

        let rule_id = rule
            .parse::<RuleId>()
            .map_err(|_| PushupError::invalid_command(format!("bad rule id '{rule}'")))?;

        Ok(Self::new(rule_id, name))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.rule_id, self.display_name)
    }
}
