//! Policy: the leaf decision unit
//!
//! A Policy maps a three-valued condition onto an outcome through its target
//! effect:
//!
//! | effect | condition true | condition false               | condition null        |
//! |--------|----------------|-------------------------------|-----------------------|
//! | Permit | Permit         | NotApplicable (strict: Deny)  | IndeterminatePermit   |
//! | Deny   | Deny           | NotApplicable (strict: Permit)| IndeterminateDeny     |
//!
//! A constraint, when present, is checked first. Named policies memoize their
//! outcome in the session's decision cache.

use arbiter_types::{EntityKind, ExecutionStrategy, Identity, Outcome, TargetEffect};
use tracing::debug;

use crate::action::ActionRelationship;
use crate::catalog::Catalog;
use crate::condition::ConditionNode;
use crate::constraint::{evaluate_constraint, ConstraintVerdict};
use crate::context::EvaluationContext;
use crate::decision::Decision;
use crate::orchestrator::{run_action_block, ActionBlockPolicy};

/// Leaf decision unit
#[derive(Debug, Clone)]
pub struct Policy {
    identity: Identity,
    constraint: Option<ConditionNode>,
    condition: ConditionNode,
    target_effect: TargetEffect,
    strict_target_effect: bool,
    lenient_constraints: bool,
    actions: Vec<ActionRelationship>,
    action_execution_strategy: ExecutionStrategy,
    ignore_errors: bool,
    labels: Vec<String>,
    description: Option<String>,
}

impl Policy {
    /// Start building a policy around its condition
    pub fn builder(condition: ConditionNode) -> PolicyBuilder {
        PolicyBuilder {
            policy: Policy {
                identity: Identity::anonymous(),
                constraint: None,
                condition,
                target_effect: TargetEffect::Permit,
                strict_target_effect: false,
                lenient_constraints: true,
                actions: Vec::new(),
                action_execution_strategy: ExecutionStrategy::RunAll,
                ignore_errors: true,
                labels: Vec::new(),
                description: None,
            },
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn target_effect(&self) -> TargetEffect {
        self.target_effect
    }

    pub fn actions(&self) -> &[ActionRelationship] {
        &self.actions
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Evaluate the policy against the context's request.
    ///
    /// Never fails: condition errors and unresolved references yield the
    /// indeterminate outcome for the target effect.
    pub fn evaluate(&self, context: &mut EvaluationContext, catalog: &Catalog) -> Outcome {
        let mut scope = context.enter_entity(EntityKind::Policy, &self.identity);
        let key = self.identity.key();

        if let Some(cached) = scope.cache().get(&key) {
            debug!(policy = %key, outcome = %cached, "Policy decision served from cache");
            scope.emit(
                scope
                    .event(EntityKind::Policy, true)
                    .with_message(cached.as_str())
                    .cached(true),
            );
            return cached;
        }

        let outcome = match evaluate_constraint(
            &mut scope,
            catalog,
            self.constraint.as_ref(),
            self.lenient_constraints,
        ) {
            ConstraintVerdict::Skip => Outcome::NotApplicable,
            ConstraintVerdict::Indeterminate => Outcome::IndeterminateDenyPermit,
            ConstraintVerdict::Proceed => self.check_condition(&mut scope, catalog),
        };

        scope.cache_mut().insert(key, outcome);
        debug!(path = %scope.path_id(), outcome = %outcome, "Policy evaluated");
        scope.emit(
            scope
                .event(EntityKind::Policy, true)
                .with_message(outcome.as_str()),
        );
        outcome
    }

    fn check_condition(&self, context: &mut EvaluationContext, catalog: &Catalog) -> Outcome {
        let scope = context.enter("condition");
        match self.condition.check(&scope, catalog) {
            Ok(result) => self.target_effect.resolve(result, self.strict_target_effect),
            Err(err) => {
                scope.emit(
                    scope
                        .event(EntityKind::Condition, false)
                        .with_reason(err.reason()),
                );
                self.target_effect.indeterminate()
            }
        }
    }

    /// Run this policy's actions for an already-computed outcome
    pub fn run_actions(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
        outcome: Outcome,
    ) -> bool {
        let mut scope = context.enter_entity(EntityKind::Policy, &self.identity);
        run_action_block(
            &mut scope,
            catalog,
            &self.actions,
            outcome,
            ActionBlockPolicy {
                strategy: self.action_execution_strategy,
                ignore_errors: self.ignore_errors,
                lenient_constraints: self.lenient_constraints,
            },
        )
    }

    /// Evaluate, then run actions for the outcome
    pub fn decide(&self, context: &mut EvaluationContext, catalog: &Catalog) -> Decision {
        let outcome = self.evaluate(context, catalog);
        let actions_succeeded = self.run_actions(context, catalog, outcome);
        Decision::new(outcome, actions_succeeded)
    }
}

/// Builder for [`Policy`]
#[derive(Debug)]
pub struct PolicyBuilder {
    policy: Policy,
}

impl PolicyBuilder {
    pub fn identity(mut self, identity: Identity) -> Self {
        self.policy.identity = identity;
        self
    }

    pub fn constraint(mut self, constraint: ConditionNode) -> Self {
        self.policy.constraint = Some(constraint);
        self
    }

    pub fn target_effect(mut self, effect: TargetEffect) -> Self {
        self.policy.target_effect = effect;
        self
    }

    /// Turn a non-matching condition into the opposite decision
    pub fn strict_target_effect(mut self, strict: bool) -> Self {
        self.policy.strict_target_effect = strict;
        self
    }

    /// Treat an undecidable constraint as not applicable (default) instead
    /// of indeterminate
    pub fn lenient_constraints(mut self, lenient: bool) -> Self {
        self.policy.lenient_constraints = lenient;
        self
    }

    pub fn action(mut self, action: ActionRelationship) -> Self {
        self.policy.actions.push(action);
        self
    }

    pub fn action_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.policy.action_execution_strategy = strategy;
        self
    }

    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.policy.ignore_errors = ignore;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.policy.labels.push(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.policy.description = Some(description.into());
        self
    }

    pub fn build(self) -> Policy {
        self.policy
    }
}
