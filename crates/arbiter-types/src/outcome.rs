//! Decision outcomes
//!
//! An evaluation always ends in one of six outcomes. Three of them are the
//! classic Permit / Deny / NotApplicable; the remaining three say that the
//! decision could not be established and in which direction it was leaning.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of evaluating a Policy or PolicySet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Permit,
    Deny,
    NotApplicable,
    /// Could not be decided, would have been Permit
    IndeterminatePermit,
    /// Could not be decided, would have been Deny
    IndeterminateDeny,
    /// Could not be decided in either direction
    IndeterminateDenyPermit,
}

impl Outcome {
    /// All six outcomes in declaration order.
    pub const ALL: [Outcome; 6] = [
        Outcome::Permit,
        Outcome::Deny,
        Outcome::NotApplicable,
        Outcome::IndeterminatePermit,
        Outcome::IndeterminateDeny,
        Outcome::IndeterminateDenyPermit,
    ];

    /// Lowercase name used as the message of decision events
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permit => "permit",
            Self::Deny => "deny",
            Self::NotApplicable => "not_applicable",
            Self::IndeterminatePermit => "indeterminate_permit",
            Self::IndeterminateDeny => "indeterminate_deny",
            Self::IndeterminateDenyPermit => "indeterminate_deny_permit",
        }
    }

    /// Check if the outcome is one of the three indeterminate variants
    pub fn is_indeterminate(&self) -> bool {
        matches!(
            self,
            Self::IndeterminatePermit | Self::IndeterminateDeny | Self::IndeterminateDenyPermit
        )
    }

    /// Check if the outcome is anything other than NotApplicable
    pub fn is_applicable(&self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    pub fn is_permit(&self) -> bool {
        matches!(self, Self::Permit)
    }

    pub fn is_deny(&self) -> bool {
        matches!(self, Self::Deny)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The effect a Policy produces when its condition holds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetEffect {
    #[default]
    Permit,
    Deny,
}

impl TargetEffect {
    /// Outcome when the condition is true
    pub fn on_match(&self) -> Outcome {
        match self {
            Self::Permit => Outcome::Permit,
            Self::Deny => Outcome::Deny,
        }
    }

    /// Outcome when the condition is false.
    ///
    /// A strict target effect turns a non-match into the opposite decision
    /// instead of NotApplicable.
    pub fn on_mismatch(&self, strict: bool) -> Outcome {
        match (self, strict) {
            (_, false) => Outcome::NotApplicable,
            (Self::Permit, true) => Outcome::Deny,
            (Self::Deny, true) => Outcome::Permit,
        }
    }

    /// Outcome when the condition could not be evaluated
    pub fn indeterminate(&self) -> Outcome {
        match self {
            Self::Permit => Outcome::IndeterminatePermit,
            Self::Deny => Outcome::IndeterminateDeny,
        }
    }

    /// Map a three-valued condition result onto an outcome
    pub fn resolve(&self, condition: Option<bool>, strict: bool) -> Outcome {
        match condition {
            Some(true) => self.on_match(),
            Some(false) => self.on_mismatch(strict),
            None => self.indeterminate(),
        }
    }
}
