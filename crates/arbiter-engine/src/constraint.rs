//! Constraint evaluation
//!
//! Constraints gate whether a Policy, PolicySet, relationship or action
//! participates at all. They use the Condition contract but fold its
//! three-valued result into a [`ConstraintVerdict`], with the caller choosing
//! how an undecidable constraint is treated.

use arbiter_types::EntityKind;
use tracing::debug;

use crate::catalog::Catalog;
use crate::condition::ConditionNode;
use crate::context::EvaluationContext;

/// Verdict of a constraint check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintVerdict {
    /// No constraint, or the constraint held
    Proceed,
    /// The constraint was false, or undecidable under lenient handling
    Skip,
    /// The constraint was undecidable under strict handling
    Indeterminate,
}

impl ConstraintVerdict {
    /// Fold a condition result into a verdict
    pub fn from_check(result: Option<bool>, lenient: bool) -> Self {
        match result {
            Some(true) => Self::Proceed,
            Some(false) => Self::Skip,
            None if lenient => Self::Skip,
            None => Self::Indeterminate,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Proceed => "proceed",
            Self::Skip => "skip",
            Self::Indeterminate => "indeterminate",
        }
    }
}

/// Check an optional constraint at the current path.
///
/// Errors raised by the constraint, including an unresolved reference, are
/// reported as a failure event and then treated as an undecidable result.
pub fn evaluate_constraint(
    context: &mut EvaluationContext,
    catalog: &Catalog,
    constraint: Option<&ConditionNode>,
    lenient: bool,
) -> ConstraintVerdict {
    let Some(constraint) = constraint else {
        return ConstraintVerdict::Proceed;
    };

    let scope = context.enter("constraint");
    let result = match constraint.check(&scope, catalog) {
        Ok(result) => result,
        Err(err) => {
            scope.emit(
                scope
                    .event(EntityKind::Constraint, false)
                    .with_reason(err.reason()),
            );
            None
        }
    };

    let verdict = ConstraintVerdict::from_check(result, lenient);
    debug!(path = %scope.path_id(), verdict = verdict.as_str(), lenient, "Constraint evaluated");
    scope.emit(
        scope
            .event(EntityKind::Constraint, true)
            .with_message(verdict.as_str()),
    );
    verdict
}
