//! End-to-end tests: running actions after a decision.
//!
//! Verifies that:
//! - Actions run in descending priority with stable ties
//! - Execution strategies and ignore_errors decide the block result
//! - Child actions run with each child's own outcome, only when enabled
//! - Children of a set stopped by its own constraint are never evaluated
//! - Failed actions can downgrade a PolicySet decision

mod common;

use std::sync::Arc;

use arbiter_engine::mocks::{ActionLog, ConstantCondition, FailingAction};
use arbiter_engine::{
    ActionNode, ActionRelationship, Catalog, ConditionNode, ConstantVariable, EngineConfig, EvaluationContext,
    EvaluationError, Policy, PolicyNode, PolicyRelationship, PolicySet, SaveAction, VariableNode,
};
use arbiter_types::{
    CombiningAlgorithm, EntityKind, ExecutionMode, ExecutionStrategy, Identity, Outcome,
    Reference, TargetEffect,
};
use common::*;
use serde_json::json;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn permit_with_actions(
    actions: Vec<ActionRelationship>,
    strategy: ExecutionStrategy,
    ignore_errors: bool,
) -> Policy {
    actions
        .into_iter()
        .fold(Policy::builder(condition(Some(true))), |builder, action| {
            builder.action(action)
        })
        .action_execution_strategy(strategy)
        .ignore_errors(ignore_errors)
        .build()
}

// ---------------------------------------------------------------------------
// Ordering and strategies
// ---------------------------------------------------------------------------

#[test]
fn actions_run_by_descending_priority() {
    init_test_logging();
    let log = ActionLog::new();
    let priorities = [Some(-1), None, Some(10), None, Some(10)];
    let actions = priorities
        .iter()
        .map(|priority| {
            let name = match priority {
                Some(p) => p.to_string(),
                None => "none".to_string(),
            };
            let rel = ActionRelationship::inline(log.action(name));
            match priority {
                Some(p) => rel.with_priority(*p),
                None => rel,
            }
        })
        .collect();

    let policy = permit_with_actions(actions, ExecutionStrategy::RunAll, true);
    let mut ctx = EvaluationContext::new(json!({}));
    let decision = policy.decide(&mut ctx, &Catalog::empty());

    assert!(decision.actions_succeeded);
    assert_eq!(log.entries(), vec!["10", "10", "none", "none", "-1"]);
}

#[test]
fn run_all_ignores_errors_when_asked() {
    let log = ActionLog::new();
    let actions = || {
        vec![
            ActionRelationship::inline(log.action("first")),
            ActionRelationship::inline(FailingAction::new("unreachable backend")),
            ActionRelationship::inline(log.action("third")),
        ]
    };
    let catalog = Catalog::empty();

    let tolerant = permit_with_actions(actions(), ExecutionStrategy::RunAll, true);
    let mut ctx = EvaluationContext::new(json!({}));
    assert!(tolerant.decide(&mut ctx, &catalog).actions_succeeded);

    let strict = permit_with_actions(actions(), ExecutionStrategy::RunAll, false);
    let mut ctx = EvaluationContext::new(json!({}));
    assert!(!strict.decide(&mut ctx, &catalog).actions_succeeded);

    assert_eq!(log.entries(), vec!["first", "third", "first", "third"]);
}

#[test]
fn stop_on_failure_halts_the_block() {
    let log = ActionLog::new();
    let actions = vec![
        ActionRelationship::inline(log.action("first")).with_priority(3),
        ActionRelationship::inline(log.failing_action("second")).with_priority(2),
        ActionRelationship::inline(log.action("third")).with_priority(1),
    ];

    let policy = permit_with_actions(actions, ExecutionStrategy::StopOnFailure, true);
    let (mut ctx, sink) = recording_context();
    let decision = policy.decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.outcome, Outcome::Permit);
    assert!(!decision.actions_succeeded);
    assert_eq!(log.entries(), vec!["first", "second"]);
    assert_eq!(sink.events_for(EntityKind::Action).len(), 2);
}

#[test]
fn until_success_stops_at_first_success() {
    let log = ActionLog::new();
    let actions = vec![
        ActionRelationship::inline(log.failing_action("primary")),
        ActionRelationship::inline(log.action("fallback")),
        ActionRelationship::inline(log.action("spare")),
    ];

    let policy = permit_with_actions(actions, ExecutionStrategy::UntilSuccess, true);
    let mut ctx = EvaluationContext::new(json!({}));
    assert!(policy.decide(&mut ctx, &Catalog::empty()).actions_succeeded);
    assert_eq!(log.entries(), vec!["primary", "fallback"]);
}

#[test]
fn only_eligible_actions_run() {
    let log = ActionLog::new();
    let policy = Policy::builder(condition(Some(false)))
        .action(ActionRelationship::inline(log.action("permit")).on(ExecutionMode::OnPermit))
        .action(
            ActionRelationship::inline(log.action("not-applicable"))
                .on(ExecutionMode::OnNotApplicable),
        )
        .build();

    let mut ctx = EvaluationContext::new(json!({}));
    let decision = policy.decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.outcome, Outcome::NotApplicable);
    assert_eq!(log.entries(), vec!["not-applicable"]);
}

// ---------------------------------------------------------------------------
// Child actions
// ---------------------------------------------------------------------------

fn tree(log: &ActionLog, run_child_actions: bool) -> PolicySet {
    let granting = Policy::builder(condition(Some(true)))
        .action(ActionRelationship::inline(log.action("grant")).on(ExecutionMode::OnPermit))
        .build();
    let blocking = Policy::builder(condition(Some(true)))
        .target_effect(TargetEffect::Deny)
        .action(ActionRelationship::inline(log.action("block")).on(ExecutionMode::OnDeny))
        .build();
    let muted = Policy::builder(condition(Some(true)))
        .action(ActionRelationship::inline(log.action("muted")))
        .build();

    PolicySet::builder(CombiningAlgorithm::DenyOverrides)
        .identity(Identity::named("root").unwrap())
        .run_child_actions(run_child_actions)
        .action(ActionRelationship::inline(log.action("root")))
        .policy(PolicyRelationship::new(granting))
        .policy(PolicyRelationship::new(blocking).with_priority(5))
        .policy(PolicyRelationship::new(muted).without_actions())
        .build()
}

#[test]
fn child_actions_use_each_child_outcome() {
    let log = ActionLog::new();
    let root = tree(&log, true);

    let mut ctx = EvaluationContext::new(json!({}));
    let decision = root.decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.outcome, Outcome::Deny);
    assert!(decision.actions_succeeded);
    assert_eq!(log.entries(), vec!["root", "block", "grant"]);
}

#[test]
fn child_actions_disabled_by_default() {
    let log = ActionLog::new();
    let root = tree(&log, false);

    let mut ctx = EvaluationContext::new(json!({}));
    root.decide(&mut ctx, &Catalog::empty());
    assert_eq!(log.entries(), vec!["root"]);
}

#[test]
fn child_actions_without_recorded_outcomes() {
    let log = ActionLog::new();
    let root = tree(&log, true);
    let config = EngineConfig {
        record_child_outcomes: false,
        ..EngineConfig::default()
    };

    let mut ctx = EvaluationContext::new(json!({})).with_config(config);
    let outcome = root.evaluate(&mut ctx, &Catalog::empty());
    assert!(root.run_actions(&mut ctx, &Catalog::empty(), outcome));
    assert_eq!(log.entries(), vec!["root", "block", "grant"]);
}

#[test]
fn excluded_children_do_not_run_actions() {
    let log = ActionLog::new();
    let excluded = Policy::builder(condition(Some(true)))
        .action(ActionRelationship::inline(log.action("excluded")))
        .build();
    let skipped = Policy::builder(condition(Some(true)))
        .action(ActionRelationship::inline(log.action("after-first")))
        .build();
    let first = Policy::builder(condition(Some(true)))
        .action(ActionRelationship::inline(log.action("first")))
        .build();

    let root = PolicySet::builder(CombiningAlgorithm::FirstApplicable)
        .run_child_actions(true)
        .policy(PolicyRelationship::new(excluded).with_constraint(condition(Some(false))))
        .policy(PolicyRelationship::new(first))
        .policy(PolicyRelationship::new(skipped))
        .build();

    let mut ctx = EvaluationContext::new(json!({}));
    let decision = root.decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.outcome, Outcome::Permit);
    assert_eq!(log.entries(), vec!["first"]);
}

#[test]
fn nested_sets_run_actions_through_references() {
    let log = ActionLog::new();
    let inner = PolicySet::builder(CombiningAlgorithm::PermitOverrides)
        .identity(Identity::named("inner").unwrap())
        .run_child_actions(true)
        .action(ActionRelationship::inline(log.action("inner")))
        .child(
            Policy::builder(condition(Some(true)))
                .action(ActionRelationship::inline(log.action("leaf")))
                .build(),
        )
        .build();
    let catalog = Catalog::builder().policy_set(inner).unwrap().build();

    let root = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
        .run_child_actions(true)
        .child(PolicyNode::policy_set_ref(Reference::new("inner")))
        .build();

    let mut ctx = EvaluationContext::new(json!({}));
    let decision = root.decide(&mut ctx, &catalog);

    assert_eq!(decision.outcome, Outcome::Permit);
    assert_eq!(log.entries(), vec!["inner", "leaf"]);
}

fn gated_set(log: &ActionLog, leaf: &ConstantCondition, gate: Option<bool>) -> PolicySet {
    PolicySet::builder(CombiningAlgorithm::DenyOverrides)
        .constraint(condition(gate))
        .lenient_constraints(gate.is_some())
        .run_child_actions(true)
        .child(
            Policy::builder(ConditionNode::inline(leaf.clone()))
                .action(ActionRelationship::inline(log.action("leaf")))
                .build(),
        )
        .build()
}

#[test]
fn skipped_set_keeps_children_dark() {
    for record_child_outcomes in [true, false] {
        let log = ActionLog::new();
        let leaf = ConstantCondition::new(Some(true));
        let root = gated_set(&log, &leaf, Some(false));
        let config = EngineConfig {
            record_child_outcomes,
            ..EngineConfig::default()
        };

        let mut ctx = EvaluationContext::new(json!({})).with_config(config);
        let decision = root.decide(&mut ctx, &Catalog::empty());

        assert_eq!(decision.outcome, Outcome::NotApplicable);
        assert_eq!(leaf.calls(), 0);
        assert!(log.entries().is_empty());
    }
}

#[test]
fn undecidable_set_constraint_keeps_children_dark() {
    for record_child_outcomes in [true, false] {
        let log = ActionLog::new();
        let leaf = ConstantCondition::new(Some(true));
        let root = gated_set(&log, &leaf, None);
        let config = EngineConfig {
            record_child_outcomes,
            ..EngineConfig::default()
        };

        let mut ctx = EvaluationContext::new(json!({})).with_config(config);
        let decision = root.decide(&mut ctx, &Catalog::empty());

        assert_eq!(decision.outcome, Outcome::IndeterminateDenyPermit);
        assert_eq!(leaf.calls(), 0);
        assert!(log.entries().is_empty());
    }
}

#[test]
fn sibling_roots_keep_separate_child_records() {
    let log = ActionLog::new();
    let a = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
        .run_child_actions(true)
        .child(
            Policy::builder(condition(Some(true)))
                .action(ActionRelationship::inline(log.action("a")))
                .build(),
        )
        .build();
    let b = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
        .run_child_actions(true)
        .policy(
            PolicyRelationship::new(
                Policy::builder(condition(Some(true)))
                    .action(ActionRelationship::inline(log.action("b")))
                    .build(),
            )
            .with_constraint(condition(Some(false))),
        )
        .build();

    let catalog = Catalog::empty();
    let mut ctx = EvaluationContext::new(json!({}));
    let outcome_a = a.evaluate(&mut ctx, &catalog);
    let outcome_b = b.evaluate(&mut ctx, &catalog);
    assert_eq!(outcome_a, Outcome::Permit);
    assert_eq!(outcome_b, Outcome::NotApplicable);

    assert!(a.run_actions(&mut ctx, &catalog, outcome_a));
    assert!(b.run_actions(&mut ctx, &catalog, outcome_b));
    assert_eq!(log.entries(), vec!["a"]);
}

// ---------------------------------------------------------------------------
// Downgrading
// ---------------------------------------------------------------------------

fn failing_set(algorithm: CombiningAlgorithm, ignore_errors: bool) -> PolicySet {
    PolicySet::builder(algorithm)
        .indeterminate_on_action_fail(true)
        .ignore_errors(ignore_errors)
        .action(ActionRelationship::inline(FailingAction::new("ledger offline")))
        .child(permit())
        .build()
}

#[test]
fn failed_actions_downgrade_decision() {
    let mut ctx = EvaluationContext::new(json!({}));
    let decision = failing_set(CombiningAlgorithm::DenyOverrides, false)
        .decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.evaluated_outcome, Outcome::Permit);
    assert_eq!(decision.outcome, Outcome::IndeterminateDenyPermit);
    assert!(decision.was_downgraded());
    assert!(!decision.actions_succeeded);
}

#[test]
fn ignored_errors_keep_decision() {
    let mut ctx = EvaluationContext::new(json!({}));
    let decision = failing_set(CombiningAlgorithm::DenyOverrides, true)
        .decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.outcome, Outcome::Permit);
    assert!(decision.actions_succeeded);
}

#[test]
fn only_one_applicable_falls_back_to_not_applicable() {
    let mut ctx = EvaluationContext::new(json!({}));
    let decision = failing_set(CombiningAlgorithm::OnlyOneApplicable, false)
        .decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.evaluated_outcome, Outcome::Permit);
    assert_eq!(decision.outcome, Outcome::NotApplicable);
    assert!(decision.was_downgraded());
}

#[test]
fn unless_algorithms_fall_back_to_deny() {
    let mut ctx = EvaluationContext::new(json!({}));
    let decision = failing_set(CombiningAlgorithm::PermitUnlessDeny, false)
        .decide(&mut ctx, &Catalog::empty());

    assert_eq!(decision.evaluated_outcome, Outcome::Permit);
    assert_eq!(decision.outcome, Outcome::Deny);
}

// ---------------------------------------------------------------------------
// Save action
// ---------------------------------------------------------------------------

#[test]
fn save_action_by_reference() {
    let catalog = Catalog::builder()
        .variable(
            Identity::named("tier").unwrap(),
            Arc::new(ConstantVariable(json!("gold"))),
        )
        .unwrap()
        .action(
            Identity::versioned("save-tier", "1.0.0").unwrap(),
            Arc::new(SaveAction::new(
                "tier",
                VariableNode::from(Reference::new("tier")),
            )),
        )
        .unwrap()
        .build();

    let policy = Policy::builder(condition(Some(true)))
        .action(ActionRelationship::new(ActionNode::from(Reference::new(
            "save-tier",
        ))))
        .ignore_errors(false)
        .build();

    let (mut ctx, sink) = recording_context();
    assert!(policy.decide(&mut ctx, &catalog).actions_succeeded);
    assert_eq!(ctx.outputs().get("tier"), Some(&json!("gold")));

    // a second run in the same session finds the key taken
    assert!(!policy.decide(&mut ctx, &catalog).actions_succeeded);
    let reason = EvaluationError::KeyExists("tier".into()).reason();
    assert!(sink
        .failures()
        .iter()
        .any(|e| e.reason.as_deref() == Some(reason.as_str())));
}
