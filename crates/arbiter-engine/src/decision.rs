//! Decision result
//!
//! A [`Decision`] is what `decide()` hands back to callers: the final outcome
//! after actions ran, the outcome evaluation produced and whether the node's
//! actions succeeded.

use arbiter_types::Outcome;
use serde::{Deserialize, Serialize};

/// Outcome of evaluating a node and running its actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    /// Final outcome, after any downgrade for failed actions
    pub outcome: Outcome,

    /// Outcome produced by evaluation alone
    pub evaluated_outcome: Outcome,

    /// Whether the action block (and child actions, when run) succeeded
    pub actions_succeeded: bool,
}

impl Decision {
    pub fn new(outcome: Outcome, actions_succeeded: bool) -> Self {
        Self {
            outcome,
            evaluated_outcome: outcome,
            actions_succeeded,
        }
    }

    /// Replace the final outcome, keeping the evaluated one
    pub fn downgraded(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Check if the final outcome permits the request
    pub fn is_permitted(&self) -> bool {
        self.outcome.is_permit()
    }

    /// Check if the final outcome denies the request
    pub fn is_denied(&self) -> bool {
        self.outcome.is_deny()
    }

    /// Check if the final outcome differs from the evaluated one
    pub fn was_downgraded(&self) -> bool {
        self.outcome != self.evaluated_outcome
    }
}
