//! # Arbiter Policy Decision Engine
//!
//! Evaluates trees of declaratively defined policies against a request and
//! returns one of six outcomes, then runs the side-effecting actions attached
//! to that outcome.
//!
//! ## Overview
//!
//! - [`Policy`]: leaf decision unit mapping a condition onto an outcome
//! - [`PolicySet`]: composite unit folding child outcomes with a
//!   [`CombiningAlgorithm`]
//! - [`Catalog`]: read-only store of named, versioned entities that
//!   references resolve against
//! - [`EvaluationContext`]: per-session state (request, decision cache,
//!   evaluation path, outputs, event sink)
//! - [`run_action_block`]: priority-ordered action execution under an
//!   [`ExecutionStrategy`]
//!
//! Conditions, variables and actions are supplied by the caller through the
//! [`Condition`], [`Variable`] and [`Action`] traits.
//!
//! Evaluation never returns an error. Failures inside conditions, unresolved
//! references and exceeded depth limits become indeterminate outcomes and
//! are reported to the session's [`EventSink`].
//!
//! ## Example
//!
//! ```rust
//! use arbiter_engine::mocks::ConstantCondition;
//! use arbiter_engine::{
//!     Catalog, ConditionNode, EvaluationContext, Policy, PolicyNode, PolicySet,
//! };
//! use arbiter_types::{CombiningAlgorithm, Identity, Outcome, Reference, TargetEffect};
//!
//! let deny_guests = Policy::builder(ConditionNode::inline(ConstantCondition::new(Some(true))))
//!     .identity(Identity::named("deny-guests").unwrap())
//!     .target_effect(TargetEffect::Deny)
//!     .build();
//!
//! let catalog = Catalog::builder().policy(deny_guests).unwrap().build();
//!
//! let root = PolicySet::builder(CombiningAlgorithm::DenyOverrides)
//!     .child(PolicyNode::policy_ref(Reference::new("deny-guests")))
//!     .build();
//!
//! let mut ctx = EvaluationContext::new(serde_json::json!({"role": "guest"}));
//! let decision = root.decide(&mut ctx, &catalog);
//! assert_eq!(decision.outcome, Outcome::Deny);
//! ```

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod action;
pub mod cache;
pub mod catalog;
pub mod combining;
pub mod condition;
pub mod config;
pub mod constraint;
pub mod context;
pub mod decision;
pub mod error;
pub mod event;
pub mod mocks;
pub mod orchestrator;
pub mod policy;
pub mod policy_set;

// Re-exports
pub use action::{Action, ActionNode, ActionRelationship, SaveAction};
pub use cache::DecisionCache;
pub use catalog::{Catalog, CatalogBuilder, CatalogEntity};
pub use combining::{by_priority, combine, indeterminate_fallback};
pub use condition::{
    Condition, ConditionNode, ConstantVariable, KeyResolver, RequestVariable, Resolver,
    ResolverNode, Variable, VariableNode,
};
pub use config::{EngineConfig, MAX_DEPTH_LIMIT};
pub use constraint::{evaluate_constraint, ConstraintVerdict};
pub use context::{entity_segment, EvaluationContext, PathScope};
pub use decision::Decision;
pub use error::{CatalogError, ConfigError, EngineError, EvaluationError, Result};
pub use event::{DecisionEvent, EventSink, RecordingEventSink, TracingEventSink};
pub use orchestrator::{run_action_block, ActionBlockPolicy};
pub use policy::{Policy, PolicyBuilder};
pub use policy_set::{PolicyNode, PolicyRelationship, PolicySet, PolicySetBuilder};

pub use arbiter_types::{
    CombiningAlgorithm, EntityKind, ExecutionMode, ExecutionStrategy, Identity, Outcome,
    Reference, TargetEffect,
};
