//! Enumerations that configure how decisions are combined and actions run

use crate::Outcome;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome category an action is eligible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    OnPermit,
    OnDeny,
    OnIndeterminate,
    OnNotApplicable,
}

impl ExecutionMode {
    /// Mode matching an outcome's category.
    ///
    /// All three indeterminate variants share `OnIndeterminate`.
    pub fn for_outcome(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Permit => Self::OnPermit,
            Outcome::Deny => Self::OnDeny,
            Outcome::NotApplicable => Self::OnNotApplicable,
            Outcome::IndeterminatePermit
            | Outcome::IndeterminateDeny
            | Outcome::IndeterminateDenyPermit => Self::OnIndeterminate,
        }
    }
}

/// Algorithm folding child outcomes of a PolicySet into one outcome
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CombiningAlgorithm {
    #[default]
    DenyOverrides,
    PermitOverrides,
    FirstApplicable,
    OnlyOneApplicable,
    DenyUnlessPermit,
    PermitUnlessDeny,
}

impl CombiningAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DenyOverrides => "DENY_OVERRIDES",
            Self::PermitOverrides => "PERMIT_OVERRIDES",
            Self::FirstApplicable => "FIRST_APPLICABLE",
            Self::OnlyOneApplicable => "ONLY_ONE_APPLICABLE",
            Self::DenyUnlessPermit => "DENY_UNLESS_PERMIT",
            Self::PermitUnlessDeny => "PERMIT_UNLESS_DENY",
        }
    }
}

impl fmt::Display for CombiningAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strategy for running the eligible actions of a node
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStrategy {
    /// Run every eligible action regardless of failures
    #[default]
    RunAll,
    /// Stop at the first failing action
    StopOnFailure,
    /// Stop at the first succeeding action
    UntilSuccess,
}

/// Kind of entity reported to the event sink and used for catalog lookups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Policy,
    PolicySet,
    PolicyRelationship,
    Condition,
    Constraint,
    Variable,
    Resolver,
    Action,
    ActionRelationship,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Policy => "policy",
            Self::PolicySet => "policy_set",
            Self::PolicyRelationship => "policy_relationship",
            Self::Condition => "condition",
            Self::Constraint => "constraint",
            Self::Variable => "variable",
            Self::Resolver => "resolver",
            Self::Action => "action",
            Self::ActionRelationship => "action_relationship",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
