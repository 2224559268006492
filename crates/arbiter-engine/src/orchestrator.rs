//! Action orchestrator
//!
//! Selects the actions of one node that are eligible for an outcome, orders
//! them by priority and runs them under the node's execution strategy.

use arbiter_types::{EntityKind, ExecutionStrategy, Outcome};
use tracing::{debug, info};

use crate::action::ActionRelationship;
use crate::catalog::Catalog;
use crate::combining::by_priority;
use crate::constraint::{evaluate_constraint, ConstraintVerdict};
use crate::context::EvaluationContext;

/// How a node's action block runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionBlockPolicy {
    pub strategy: ExecutionStrategy,
    pub ignore_errors: bool,
    pub lenient_constraints: bool,
}

/// Run a node's action block for `outcome` and report whether it succeeded.
///
/// - `RunAll` runs every eligible action; it succeeds when errors are ignored
///   or nothing failed.
/// - `StopOnFailure` stops at the first failure.
/// - `UntilSuccess` stops at the first success and fails when nothing succeeded.
pub fn run_action_block(
    context: &mut EvaluationContext,
    catalog: &Catalog,
    actions: &[ActionRelationship],
    outcome: Outcome,
    policy: ActionBlockPolicy,
) -> bool {
    let priorities: Vec<Option<i64>> = actions.iter().map(|a| a.priority).collect();
    let mut any_failed = false;
    let mut any_succeeded = false;

    for index in by_priority(&priorities) {
        let relationship = &actions[index];
        if !relationship.is_eligible(outcome) {
            continue;
        }

        let mut scope = context.enter(format!("actions[{index}]"));
        let succeeded = match evaluate_constraint(
            &mut scope,
            catalog,
            relationship.constraint.as_ref(),
            policy.lenient_constraints,
        ) {
            ConstraintVerdict::Skip => continue,
            ConstraintVerdict::Indeterminate => {
                scope.emit(
                    scope
                        .event(EntityKind::Action, false)
                        .with_message("constraint indeterminate"),
                );
                false
            }
            ConstraintVerdict::Proceed => run_one(&mut scope, catalog, relationship),
        };

        if succeeded {
            any_succeeded = true;
        } else {
            any_failed = true;
        }

        match policy.strategy {
            ExecutionStrategy::StopOnFailure if !succeeded => break,
            ExecutionStrategy::UntilSuccess if succeeded => break,
            _ => {}
        }
    }

    let result = match policy.strategy {
        ExecutionStrategy::RunAll => policy.ignore_errors || !any_failed,
        ExecutionStrategy::StopOnFailure => !any_failed,
        ExecutionStrategy::UntilSuccess => any_succeeded,
    };

    if !actions.is_empty() {
        info!(
            path = %context.path_id(),
            outcome = %outcome,
            strategy = ?policy.strategy,
            success = result,
            "Action block completed"
        );
    }
    result
}

fn run_one(
    context: &mut EvaluationContext,
    catalog: &Catalog,
    relationship: &ActionRelationship,
) -> bool {
    match relationship.action.execute(context, catalog) {
        Ok(success) => {
            debug!(path = %context.path_id(), success, "Action executed");
            context.emit(
                context
                    .event(EntityKind::Action, success)
                    .with_message(if success { "succeeded" } else { "failed" }),
            );
            success
        }
        Err(err) => {
            context.emit(
                context
                    .event(EntityKind::Action, false)
                    .with_message("failed")
                    .with_reason(err.reason()),
            );
            false
        }
    }
}
