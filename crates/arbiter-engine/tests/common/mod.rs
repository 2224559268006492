//! Shared helpers for the engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use arbiter_engine::mocks::ConstantCondition;
use arbiter_engine::{ConditionNode, EvaluationContext, Policy, RecordingEventSink};
use arbiter_types::{Identity, TargetEffect};
use serde_json::json;
use tracing_subscriber::EnvFilter;

pub fn init_test_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("arbiter_engine=debug"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .with_target(true)
        .try_init();
}

/// Context with a recording sink attached
pub fn recording_context() -> (EvaluationContext, Arc<RecordingEventSink>) {
    let sink = Arc::new(RecordingEventSink::new());
    let ctx = EvaluationContext::new(json!({"subject": "alice"})).with_sink(sink.clone());
    (ctx, sink)
}

pub fn condition(result: Option<bool>) -> ConditionNode {
    ConditionNode::inline(ConstantCondition::new(result))
}

/// Anonymous policy with a fixed condition result
pub fn policy(effect: TargetEffect, result: Option<bool>) -> Policy {
    Policy::builder(condition(result)).target_effect(effect).build()
}

/// Named policy with a fixed condition result
pub fn named_policy(identity: Identity, effect: TargetEffect, result: Option<bool>) -> Policy {
    Policy::builder(condition(result))
        .identity(identity)
        .target_effect(effect)
        .build()
}

pub fn permit() -> Policy {
    policy(TargetEffect::Permit, Some(true))
}

pub fn deny() -> Policy {
    policy(TargetEffect::Deny, Some(true))
}
