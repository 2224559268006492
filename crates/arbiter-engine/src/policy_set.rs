//! PolicySet: the composite decision unit
//!
//! A PolicySet evaluates its children in priority order and folds their
//! outcomes with a [`CombiningAlgorithm`]. Children are Policies, nested
//! PolicySets or catalog references to either, attached through
//! [`PolicyRelationship`]s that may carry their own constraint.

use std::sync::Arc;

use arbiter_types::{
    CombiningAlgorithm, EntityKind, ExecutionStrategy, Identity, Outcome, Reference,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::action::ActionRelationship;
use crate::catalog::Catalog;
use crate::combining::{by_priority, combine, indeterminate_fallback};
use crate::condition::ConditionNode;
use crate::constraint::{evaluate_constraint, ConstraintVerdict};
use crate::context::EvaluationContext;
use crate::decision::Decision;
use crate::error::EvaluationError;
use crate::orchestrator::{run_action_block, ActionBlockPolicy};
use crate::policy::Policy;

/// A child of a PolicySet, inline or by catalog reference
#[derive(Debug, Clone)]
pub enum PolicyNode {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
    PolicyRef(Reference),
    PolicySetRef(Reference),
}

impl PolicyNode {
    pub fn policy_ref(reference: Reference) -> Self {
        Self::PolicyRef(reference)
    }

    pub fn policy_set_ref(reference: Reference) -> Self {
        Self::PolicySetRef(reference)
    }

    /// Evaluate the child. Exceeding the depth limit or an unresolved
    /// reference yields IndeterminateDenyPermit.
    pub fn evaluate(&self, context: &mut EvaluationContext, catalog: &Catalog) -> Outcome {
        if let Err(err) = check_depth(context) {
            report(context, EntityKind::PolicyRelationship, &err);
            return Outcome::IndeterminateDenyPermit;
        }

        match self.resolve(catalog) {
            Ok(Resolved::Policy(policy)) => policy.evaluate(context, catalog),
            Ok(Resolved::PolicySet(set)) => set.evaluate(context, catalog),
            Err((kind, err)) => {
                report(context, kind, &err);
                Outcome::IndeterminateDenyPermit
            }
        }
    }

    /// Run the child's actions for the outcome it produced
    pub fn run_actions(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
        outcome: Outcome,
    ) -> bool {
        if let Err(err) = check_depth(context) {
            report(context, EntityKind::PolicyRelationship, &err);
            return false;
        }

        match self.resolve(catalog) {
            Ok(Resolved::Policy(policy)) => policy.run_actions(context, catalog, outcome),
            Ok(Resolved::PolicySet(set)) => set.run_actions(context, catalog, outcome),
            Err((kind, err)) => {
                report(context, kind, &err);
                false
            }
        }
    }

    fn resolve(&self, catalog: &Catalog) -> Result<Resolved, (EntityKind, EvaluationError)> {
        let not_found = |kind: EntityKind, reference: &Reference| {
            (
                kind,
                EvaluationError::NotFound {
                    kind,
                    reference: reference.clone(),
                },
            )
        };

        match self {
            Self::Policy(policy) => Ok(Resolved::Policy(policy.clone())),
            Self::PolicySet(set) => Ok(Resolved::PolicySet(set.clone())),
            Self::PolicyRef(reference) => catalog
                .policy(reference)
                .map(Resolved::Policy)
                .ok_or_else(|| not_found(EntityKind::Policy, reference)),
            Self::PolicySetRef(reference) => catalog
                .policy_set(reference)
                .map(Resolved::PolicySet)
                .ok_or_else(|| not_found(EntityKind::PolicySet, reference)),
        }
    }
}

impl From<Policy> for PolicyNode {
    fn from(policy: Policy) -> Self {
        Self::Policy(Arc::new(policy))
    }
}

impl From<PolicySet> for PolicyNode {
    fn from(set: PolicySet) -> Self {
        Self::PolicySet(Arc::new(set))
    }
}

enum Resolved {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
}

fn check_depth(context: &EvaluationContext) -> Result<(), EvaluationError> {
    let max_depth = context.config().max_depth;
    if context.depth() >= max_depth {
        return Err(EvaluationError::DepthExceeded(max_depth));
    }
    Ok(())
}

fn report(context: &EvaluationContext, kind: EntityKind, err: &EvaluationError) {
    warn!(path = %context.path_id(), error = %err, "Policy child could not be evaluated");
    context.emit(context.event(kind, false).with_reason(err.reason()));
}

/// Attachment of a child to a PolicySet
#[derive(Debug, Clone)]
pub struct PolicyRelationship {
    pub policy: PolicyNode,
    pub constraint: Option<ConditionNode>,
    pub priority: Option<i64>,

    /// Run the child's actions (and its descendants') when the parent runs
    /// child actions
    pub run_action: bool,
}

impl PolicyRelationship {
    pub fn new(policy: impl Into<PolicyNode>) -> Self {
        Self {
            policy: policy.into(),
            constraint: None,
            priority: None,
            run_action: true,
        }
    }

    pub fn with_constraint(mut self, constraint: ConditionNode) -> Self {
        self.constraint = Some(constraint);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Never run this child's actions
    pub fn without_actions(mut self) -> Self {
        self.run_action = false;
        self
    }
}

/// Composite decision unit
#[derive(Debug, Clone)]
pub struct PolicySet {
    /// Keys this set's child records in the session context
    node_id: Uuid,
    identity: Identity,
    constraint: Option<ConditionNode>,
    policies: Vec<PolicyRelationship>,
    algorithm: CombiningAlgorithm,
    lenient_constraints: bool,
    strict_unless_logic: bool,
    run_child_actions: bool,
    indeterminate_on_action_fail: bool,
    actions: Vec<ActionRelationship>,
    action_execution_strategy: ExecutionStrategy,
    ignore_errors: bool,
    labels: Vec<String>,
    description: Option<String>,
}

impl PolicySet {
    /// Start building a policy set combining children with `algorithm`
    pub fn builder(algorithm: CombiningAlgorithm) -> PolicySetBuilder {
        PolicySetBuilder {
            set: PolicySet {
                node_id: Uuid::new_v4(),
                identity: Identity::anonymous(),
                constraint: None,
                policies: Vec::new(),
                algorithm,
                lenient_constraints: true,
                strict_unless_logic: false,
                run_child_actions: false,
                indeterminate_on_action_fail: false,
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

    pub fn algorithm(&self) -> CombiningAlgorithm {
        self.algorithm
    }

    pub fn policies(&self) -> &[PolicyRelationship] {
        &self.policies
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

    /// Evaluate the set against the context's request.
    ///
    /// Children excluded by their relationship constraint do not take part in
    /// combining. Under FIRST_APPLICABLE evaluation stops at the first
    /// applicable child.
    pub fn evaluate(&self, context: &mut EvaluationContext, catalog: &Catalog) -> Outcome {
        let mut scope = context.enter_entity(EntityKind::PolicySet, &self.identity);
        let key = self.identity.key();

        if let Some(cached) = scope.cache().get(&key) {
            debug!(policy_set = %key, outcome = %cached, "PolicySet decision served from cache");
            scope.emit(
                scope
                    .event(EntityKind::PolicySet, true)
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
            ConstraintVerdict::Skip => {
                self.exclude_children(&mut scope);
                Outcome::NotApplicable
            }
            ConstraintVerdict::Indeterminate => {
                self.exclude_children(&mut scope);
                Outcome::IndeterminateDenyPermit
            }
            ConstraintVerdict::Proceed => self.combine_children(&mut scope, catalog),
        };

        scope.cache_mut().insert(key, outcome);
        debug!(
            path = %scope.path_id(),
            algorithm = %self.algorithm,
            outcome = %outcome,
            "PolicySet evaluated"
        );
        scope.emit(
            scope
                .event(EntityKind::PolicySet, true)
                .with_message(outcome.as_str()),
        );
        outcome
    }

    fn order(&self) -> Vec<usize> {
        let priorities: Vec<Option<i64>> = self.policies.iter().map(|p| p.priority).collect();
        by_priority(&priorities)
    }

    fn combine_children(&self, context: &mut EvaluationContext, catalog: &Catalog) -> Outcome {
        let order = self.order();
        let mut outcomes = Vec::with_capacity(order.len());
        let mut reached = order.len();

        for (position, &index) in order.iter().enumerate() {
            let (contribution, recorded) = {
                let mut scope = context.enter(format!("policies[{index}]"));
                self.relationship_outcome(&mut scope, catalog, index)
            };
            context.record_child(self.node_id, index, recorded);

            if let Some(outcome) = contribution {
                outcomes.push(outcome);
                if self.stops_at(outcome) {
                    reached = position + 1;
                    break;
                }
            }
        }

        // children never reached must not run actions later
        for &index in &order[reached..] {
            context.record_child(self.node_id, index, None);
        }

        combine(self.algorithm, &outcomes, self.strict_unless_logic)
    }

    /// Mark every child as excluded when the set's own constraint stops
    /// evaluation before any child is reached
    fn exclude_children(&self, context: &mut EvaluationContext) {
        for index in 0..self.policies.len() {
            context.record_child(self.node_id, index, None);
        }
    }

    fn constraint_proceeds(&self, context: &mut EvaluationContext, catalog: &Catalog) -> bool {
        evaluate_constraint(
            context,
            catalog,
            self.constraint.as_ref(),
            self.lenient_constraints,
        ) == ConstraintVerdict::Proceed
    }

    fn stops_at(&self, contribution: Outcome) -> bool {
        self.algorithm == CombiningAlgorithm::FirstApplicable && contribution.is_applicable()
    }

    /// Evaluate one relationship at the current (already entered) path.
    ///
    /// Returns the outcome contributed to combining and the outcome to record
    /// for running the child's actions. A strictly undecidable relationship
    /// constraint contributes IndeterminateDenyPermit but records nothing, so
    /// the child's actions never run.
    fn relationship_outcome(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
        index: usize,
    ) -> (Option<Outcome>, Option<Outcome>) {
        let relationship = &self.policies[index];
        let (contribution, recorded) = match evaluate_constraint(
            context,
            catalog,
            relationship.constraint.as_ref(),
            self.lenient_constraints,
        ) {
            ConstraintVerdict::Skip => (None, None),
            ConstraintVerdict::Indeterminate => (Some(Outcome::IndeterminateDenyPermit), None),
            ConstraintVerdict::Proceed => {
                let outcome = relationship.policy.evaluate(context, catalog);
                (Some(outcome), Some(outcome))
            }
        };
        (contribution, recorded)
    }

    /// Run this set's actions for an already-computed outcome, then, when
    /// enabled, each child's actions for the outcome that child produced.
    pub fn run_actions(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
        outcome: Outcome,
    ) -> bool {
        let (own, children) = self.run_actions_split(context, catalog, outcome);
        own && children
    }

    fn run_actions_split(
        &self,
        context: &mut EvaluationContext,
        catalog: &Catalog,
        outcome: Outcome,
    ) -> (bool, bool) {
        let mut scope = context.enter_entity(EntityKind::PolicySet, &self.identity);
        let own = run_action_block(
            &mut scope,
            catalog,
            &self.actions,
            outcome,
            ActionBlockPolicy {
                strategy: self.action_execution_strategy,
                ignore_errors: self.ignore_errors,
                lenient_constraints: self.lenient_constraints,
            },
        );

        let children = if self.run_child_actions {
            self.run_children_actions(&mut scope, catalog)
        } else {
            true
        };
        (own, children)
    }

    /// Children without a record from this session are re-evaluated, after
    /// re-checking the set's own constraint once.
    fn run_children_actions(&self, context: &mut EvaluationContext, catalog: &Catalog) -> bool {
        let mut succeeded = true;
        let mut gate = None;

        for index in self.order() {
            let relationship = &self.policies[index];
            if !relationship.run_action {
                continue;
            }

            let (recorded, last) = match context.recorded_child(self.node_id, index) {
                Some(recorded) => (recorded, false),
                None => {
                    let proceeds =
                        *gate.get_or_insert_with(|| self.constraint_proceeds(context, catalog));
                    if !proceeds {
                        break;
                    }
                    let mut scope = context.enter(format!("policies[{index}]"));
                    let (contribution, recorded) =
                        self.relationship_outcome(&mut scope, catalog, index);
                    (recorded, contribution.is_some_and(|o| self.stops_at(o)))
                }
            };

            // excluded or never reached
            if let Some(child_outcome) = recorded {
                let mut scope = context.enter(format!("policies[{index}]"));
                if !relationship
                    .policy
                    .run_actions(&mut scope, catalog, child_outcome)
                {
                    succeeded = false;
                }
            }

            if last {
                break;
            }
        }

        succeeded
    }

    /// Evaluate, run actions and apply `indeterminate_on_action_fail`.
    ///
    /// When the set's own action block fails while errors are not ignored, the
    /// final outcome is downgraded to the algorithm's indeterminate fallback.
    pub fn decide(&self, context: &mut EvaluationContext, catalog: &Catalog) -> Decision {
        let outcome = self.evaluate(context, catalog);
        let (own, children) = self.run_actions_split(context, catalog, outcome);
        let decision = Decision::new(outcome, own && children);

        if self.indeterminate_on_action_fail && !self.ignore_errors && !own {
            let fallback = indeterminate_fallback(self.algorithm, self.strict_unless_logic);
            warn!(
                policy_set = %self.identity,
                evaluated = %outcome,
                fallback = %fallback,
                "Actions failed, downgrading decision"
            );
            return decision.downgraded(fallback);
        }
        decision
    }
}

/// Builder for [`PolicySet`]
#[derive(Debug)]
pub struct PolicySetBuilder {
    set: PolicySet,
}

impl PolicySetBuilder {
    pub fn identity(mut self, identity: Identity) -> Self {
        self.set.identity = identity;
        self
    }

    pub fn constraint(mut self, constraint: ConditionNode) -> Self {
        self.set.constraint = Some(constraint);
        self
    }

    /// Add a child relationship
    pub fn policy(mut self, relationship: PolicyRelationship) -> Self {
        self.set.policies.push(relationship);
        self
    }

    /// Add a child without a relationship constraint or priority
    pub fn child(self, node: impl Into<PolicyNode>) -> Self {
        self.policy(PolicyRelationship::new(node))
    }

    pub fn lenient_constraints(mut self, lenient: bool) -> Self {
        self.set.lenient_constraints = lenient;
        self
    }

    /// Escalate absorbed indeterminates to IndeterminateDenyPermit under the
    /// unless algorithms
    pub fn strict_unless_logic(mut self, strict: bool) -> Self {
        self.set.strict_unless_logic = strict;
        self
    }

    pub fn run_child_actions(mut self, run: bool) -> Self {
        self.set.run_child_actions = run;
        self
    }

    pub fn indeterminate_on_action_fail(mut self, downgrade: bool) -> Self {
        self.set.indeterminate_on_action_fail = downgrade;
        self
    }

    pub fn action(mut self, action: ActionRelationship) -> Self {
        self.set.actions.push(action);
        self
    }

    pub fn action_execution_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.set.action_execution_strategy = strategy;
        self
    }

    pub fn ignore_errors(mut self, ignore: bool) -> Self {
        self.set.ignore_errors = ignore;
        self
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.set.labels.push(label.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.set.description = Some(description.into());
        self
    }

    pub fn build(self) -> PolicySet {
        self.set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::RecordingEventSink;
    use crate::mocks::ConstantCondition;
    use arbiter_types::TargetEffect;
    use serde_json::json;

    fn leaf(effect: TargetEffect, condition: Option<bool>) -> Policy {
        Policy::builder(ConditionNode::inline(ConstantCondition::new(condition)))
            .target_effect(effect)
            .build()
    }

    fn permit() -> Policy {
        leaf(TargetEffect::Permit, Some(true))
    }

    fn deny() -> Policy {
        leaf(TargetEffect::Deny, Some(true))
    }

    fn not_applicable() -> Policy {
        leaf(TargetEffect::Permit, Some(false))
    }

    fn evaluate(set: &PolicySet) -> Outcome {
        let mut ctx = EvaluationContext::new(json!({}));
        set.evaluate(&mut ctx, &Catalog::empty())
    }

    #[test]
    fn test_deny_overrides() {
        let set = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
            .child(permit())
            .child(not_applicable())
            .child(deny())
            .build();
        assert_eq!(evaluate(&set), Outcome::Deny);
    }

    #[test]
    fn test_permit_overrides() {
        let set = PolicySet::builder(CombiningAlgorithm::PermitOverrides)
            .child(deny())
            .child(permit())
            .build();
        assert_eq!(evaluate(&set), Outcome::Permit);
    }

    #[test]
    fn test_empty_set_is_not_applicable() {
        let set = PolicySet::builder(CombiningAlgorithm::DenyOverrides).build();
        assert_eq!(evaluate(&set), Outcome::NotApplicable);
    }

    #[test]
    fn test_first_applicable_uses_priority_and_short_circuits() {
        let late = ConstantCondition::new(Some(true));
        let set = PolicySet::builder(CombiningAlgorithm::FirstApplicable)
            .policy(
                PolicyRelationship::new(Policy::builder(ConditionNode::inline(late.clone())).build())
                    .with_priority(-1),
            )
            .policy(PolicyRelationship::new(not_applicable()).with_priority(5))
            .policy(PolicyRelationship::new(deny()))
            .build();

        assert_eq!(evaluate(&set), Outcome::Deny);
        assert_eq!(late.calls(), 0);
    }

    #[test]
    fn test_relationship_constraint_excludes_child() {
        let set = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
            .child(permit())
            .policy(
                PolicyRelationship::new(deny())
                    .with_constraint(ConditionNode::inline(ConstantCondition::new(Some(false)))),
            )
            .build();
        assert_eq!(evaluate(&set), Outcome::Permit);
    }

    #[test]
    fn test_null_relationship_constraint() {
        let null = || ConditionNode::inline(ConstantCondition::new(None));

        let lenient = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
            .policy(PolicyRelationship::new(permit()).with_constraint(null()))
            .build();
        assert_eq!(evaluate(&lenient), Outcome::NotApplicable);

        let strict = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
            .lenient_constraints(false)
            .policy(PolicyRelationship::new(permit()).with_constraint(null()))
            .build();
        assert_eq!(evaluate(&strict), Outcome::IndeterminateDenyPermit);
    }

    #[test]
    fn test_outer_constraint_short_circuits() {
        let inner = ConstantCondition::new(Some(true));
        let set = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
            .constraint(ConditionNode::inline(ConstantCondition::new(Some(false))))
            .child(Policy::builder(ConditionNode::inline(inner.clone())).build())
            .build();

        assert_eq!(evaluate(&set), Outcome::NotApplicable);
        assert_eq!(inner.calls(), 0);
    }

    #[test]
    fn test_missing_ref_is_indeterminate() {
        let sink = Arc::new(RecordingEventSink::new());
        let mut ctx = EvaluationContext::new(json!({})).with_sink(sink.clone());
        let set = PolicySet::builder(CombiningAlgorithm::FirstApplicable)
            .identity(Identity::named("root").unwrap())
            .child(PolicyNode::policy_ref(Reference::new("pol999")))
            .build();

        assert_eq!(
            set.evaluate(&mut ctx, &Catalog::empty()),
            Outcome::IndeterminateDenyPermit
        );

        let failures = sink.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path_id, "policy_set(root)/policies[0]");
        assert_eq!(
            failures[0].reason.as_deref(),
            Some("NotFound: policy 'pol999' not found in catalog")
        );
    }

    #[test]
    fn test_named_set_is_cached() {
        let condition = ConstantCondition::new(Some(true));
        let set = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
            .identity(Identity::named("root").unwrap())
            .child(Policy::builder(ConditionNode::inline(condition.clone())).build())
            .build();

        let mut ctx = EvaluationContext::new(json!({}));
        let catalog = Catalog::empty();
        assert_eq!(set.evaluate(&mut ctx, &catalog), Outcome::Permit);
        assert_eq!(set.evaluate(&mut ctx, &catalog), Outcome::Permit);
        assert_eq!(condition.calls(), 1);

        ctx.reset_session();
        set.evaluate(&mut ctx, &catalog);
        assert_eq!(condition.calls(), 2);
    }

    #[test]
    fn test_unless_algorithms() {
        let indeterminate = || leaf(TargetEffect::Permit, None);

        let absorbed = PolicySet::builder(CombiningAlgorithm::DenyUnlessPermit)
            .child(indeterminate())
            .build();
        assert_eq!(evaluate(&absorbed), Outcome::Deny);

        let strict = PolicySet::builder(CombiningAlgorithm::DenyUnlessPermit)
            .strict_unless_logic(true)
            .child(indeterminate())
            .build();
        assert_eq!(evaluate(&strict), Outcome::IndeterminateDenyPermit);

        let overridden = PolicySet::builder(CombiningAlgorithm::PermitUnlessDeny)
            .strict_unless_logic(true)
            .child(indeterminate())
            .child(deny())
            .build();
        assert_eq!(evaluate(&overridden), Outcome::Deny);
    }

    #[test]
    fn test_only_one_applicable() {
        let one = PolicySet::builder(CombiningAlgorithm::OnlyOneApplicable)
            .child(not_applicable())
            .child(deny())
            .build();
        assert_eq!(evaluate(&one), Outcome::Deny);

        let two = PolicySet::builder(CombiningAlgorithm::OnlyOneApplicable)
            .child(permit())
            .child(deny())
            .build();
        assert_eq!(evaluate(&two), Outcome::IndeterminateDenyPermit);
    }
}
