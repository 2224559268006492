//! Actions and action relationships
//!
//! An action is a side effect run after a decision has been made. Actions are
//! attached to Policies and PolicySets through [`ActionRelationship`]s that
//! say when (execution modes, constraint) and in which order (priority) they
//! run.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use arbiter_types::{EntityKind, ExecutionMode, Outcome, Reference};
use tracing::debug;

use crate::catalog::Catalog;
use crate::condition::{ConditionNode, VariableNode};
use crate::context::EvaluationContext;
use crate::error::EvaluationError;

/// A side effect run for a decision.
///
/// `Ok(false)` and `Err` both count as a failed action; an `Err` additionally
/// reports its reason to the event sink.
pub trait Action: Send + Sync + fmt::Debug {
    fn execute(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
    ) -> Result<bool, EvaluationError>;
}

/// An action given inline or by catalog reference
#[derive(Debug, Clone)]
pub enum ActionNode {
    Inline(Arc<dyn Action>),
    Ref(Reference),
}

impl ActionNode {
    pub fn inline(action: impl Action + 'static) -> Self {
        Self::Inline(Arc::new(action))
    }

    pub fn execute(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
    ) -> Result<bool, EvaluationError> {
        match self {
            Self::Inline(action) => action.execute(context, catalog),
            Self::Ref(reference) => catalog
                .action(reference)
                .ok_or_else(|| EvaluationError::NotFound {
                    kind: EntityKind::Action,
                    reference: reference.clone(),
                })?
                .execute(context, catalog),
        }
    }
}

impl From<Reference> for ActionNode {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}

/// Attachment of an action to a Policy or PolicySet
#[derive(Debug, Clone)]
pub struct ActionRelationship {
    pub action: ActionNode,
    pub constraint: Option<ConditionNode>,
    pub priority: Option<i64>,

    /// Outcome categories the action runs for; empty means always
    pub execution_modes: HashSet<ExecutionMode>,
}

impl ActionRelationship {
    pub fn new(action: impl Into<ActionNode>) -> Self {
        Self {
            action: action.into(),
            constraint: None,
            priority: None,
            execution_modes: HashSet::new(),
        }
    }

    /// Relationship to an inline action
    pub fn inline(action: impl Action + 'static) -> Self {
        Self::new(ActionNode::inline(action))
    }

    pub fn with_constraint(mut self, constraint: ConditionNode) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Restrict the action to an outcome category. May be called repeatedly.
    pub fn on(mut self, mode: ExecutionMode) -> Self {
        self.execution_modes.insert(mode);
        self
    }

    /// Whether the action is eligible to run for `outcome`
    pub fn is_eligible(&self, outcome: Outcome) -> bool {
        self.execution_modes.is_empty()
            || self.execution_modes.contains(&ExecutionMode::for_outcome(outcome))
    }
}

/// Stores a resolved variable under a key of the session outputs
#[derive(Debug, Clone)]
pub struct SaveAction {
    pub key: String,
    pub value: VariableNode,

    /// Replace an existing value instead of failing
    pub overwrite: bool,
}

impl SaveAction {
    pub fn new(key: impl Into<String>, value: VariableNode) -> Self {
        Self {
            key: key.into(),
            value,
            overwrite: false,
        }
    }

    pub fn overwriting(mut self) -> Self {
        self.overwrite = true;
        self
    }
}

impl Action for SaveAction {
    fn execute(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
    ) -> Result<bool, EvaluationError> {
        if !self.overwrite && context.outputs().contains_key(&self.key) {
            return Err(EvaluationError::KeyExists(self.key.clone()));
        }

        let value = self.value.resolve(context, catalog)?;
        debug!(key = %self.key, "Saving output value");
        context.outputs_mut().insert(self.key.clone(), value);
        Ok(true)
    }
}
