//! Evaluation context
//!
//! The context carries the request being decided plus all mutable,
//! per-session state: the decision cache, the evaluation path, recorded child
//! outcomes and values written by actions. A context must not be shared by
//! concurrent evaluations; the catalog can be.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use arbiter_types::{EntityKind, Identity, Outcome};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::cache::DecisionCache;
use crate::config::EngineConfig;
use crate::event::{DecisionEvent, EventSink, TracingEventSink};

/// Owning set, the set's path and the relationship index. The same set can
/// sit at several paths, and unrelated sets can share a path.
type ChildKey = (Uuid, String, usize);

/// Per-session evaluation state
#[derive(Debug)]
pub struct EvaluationContext {
    /// Request ID for correlation
    request_id: String,

    /// The request being decided
    request: Value,

    /// Values written by actions
    outputs: Map<String, Value>,

    cache: DecisionCache,
    path: Vec<String>,

    /// Outcome recorded per child relationship. `None` marks a child excluded
    /// from combining, whose actions never run.
    child_outcomes: HashMap<ChildKey, Option<Outcome>>,

    sink: Arc<dyn EventSink>,
    config: EngineConfig,
}

impl EvaluationContext {
    /// Create a new context for a request
    pub fn new(request: Value) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            request,
            outputs: Map::new(),
            cache: DecisionCache::new(),
            path: Vec::new(),
            child_outcomes: HashMap::new(),
            sink: Arc::new(TracingEventSink),
            config: EngineConfig::default(),
        }
    }

    /// Set the event sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Set the engine configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the request ID
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn request(&self) -> &Value {
        &self.request
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn outputs(&self) -> &Map<String, Value> {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.outputs
    }

    pub fn cache(&self) -> &DecisionCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut DecisionCache {
        &mut self.cache
    }

    /// Forget cached decisions and recorded child outcomes before starting an
    /// independent session with the same context.
    pub fn reset_session(&mut self) {
        self.cache.clear();
        self.child_outcomes.clear();
    }

    /// Push a path segment; it is popped when the returned scope drops.
    pub fn enter(&mut self, segment: impl Into<String>) -> PathScope<'_> {
        self.path.push(segment.into());
        PathScope { context: self }
    }

    /// Push the segment for an entity, naming it by identity when it has one
    pub fn enter_entity(&mut self, kind: EntityKind, identity: &Identity) -> PathScope<'_> {
        self.enter(entity_segment(kind, identity))
    }

    /// Number of segments currently on the evaluation path
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Breadcrumb id of the current position
    pub fn path_id(&self) -> String {
        self.path.join(&self.config.path_separator)
    }

    /// Emit an event at the current path
    pub fn emit(&self, event: DecisionEvent) {
        self.sink.emit(event);
    }

    /// Build an event positioned at the current path
    pub fn event(&self, entity: EntityKind, success: bool) -> DecisionEvent {
        DecisionEvent::new(self.path_id(), entity, success).with_request_id(&self.request_id)
    }

    /// Record the outcome of child `index` of set `owner`, evaluated at the
    /// current path
    pub(crate) fn record_child(&mut self, owner: Uuid, index: usize, outcome: Option<Outcome>) {
        if self.config.record_child_outcomes {
            let key = (owner, self.path_id(), index);
            self.child_outcomes.insert(key, outcome);
        }
    }

    pub(crate) fn recorded_child(&self, owner: Uuid, index: usize) -> Option<Option<Outcome>> {
        self.child_outcomes
            .get(&(owner, self.path_id(), index))
            .copied()
    }
}

/// Path segment for an entity: its kind, plus the identity key in
/// parentheses when named.
pub fn entity_segment(kind: EntityKind, identity: &Identity) -> String {
    if identity.is_named() {
        format!("{}({})", kind, identity.key())
    } else {
        kind.to_string()
    }
}

/// Scope guard for one evaluation path segment.
///
/// Dereferences to the context so recursion continues through the guard; the
/// segment is popped on every exit path when the guard drops.
#[derive(Debug)]
pub struct PathScope<'a> {
    context: &'a mut EvaluationContext,
}

impl Deref for PathScope<'_> {
    type Target = EvaluationContext;

    fn deref(&self) -> &Self::Target {
        self.context
    }
}

impl DerefMut for PathScope<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.context
    }
}

impl Drop for PathScope<'_> {
    fn drop(&mut self) {
        self.context.path.pop();
    }
}
