//! Decision events
//!
//! Every decision, constraint and action boundary reports a
//! [`DecisionEvent`] to the session's [`EventSink`]. The engine never reads
//! events back; sinks exist for telemetry and auditing.

use arbiter_types::EntityKind;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// A single event emitted during evaluation or action execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEvent {
    /// Unique event ID
    pub id: Uuid,

    /// Event timestamp
    pub timestamp: DateTime<Utc>,

    /// Request the event belongs to
    pub request_id: Option<String>,

    /// Breadcrumb of the entity within the evaluated tree
    pub path_id: String,

    /// Kind of entity that produced the event
    pub entity: EntityKind,

    /// Whether the step succeeded
    pub success: bool,

    /// Outcome name or short status message
    pub message: Option<String>,

    /// Whether the outcome came from the decision cache
    pub from_cache: bool,

    /// Failure reason (error kind and message)
    pub reason: Option<String>,
}

impl DecisionEvent {
    pub fn new(path_id: impl Into<String>, entity: EntityKind, success: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            request_id: None,
            path_id: path_id.into(),
            entity,
            success,
            message: None,
            from_cache: false,
            reason: None,
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn cached(mut self, from_cache: bool) -> Self {
        self.from_cache = from_cache;
        self
    }
}

/// Receiver of decision events
pub trait EventSink: Send + Sync + std::fmt::Debug {
    fn emit(&self, event: DecisionEvent);
}

/// Sink forwarding events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DecisionEvent) {
        if event.success {
            debug!(
                request_id = event.request_id.as_deref().unwrap_or(""),
                path = %event.path_id,
                entity = %event.entity,
                message = event.message.as_deref().unwrap_or(""),
                from_cache = event.from_cache,
                "Decision event"
            );
        } else {
            warn!(
                request_id = event.request_id.as_deref().unwrap_or(""),
                path = %event.path_id,
                entity = %event.entity,
                message = event.message.as_deref().unwrap_or(""),
                reason = event.reason.as_deref().unwrap_or(""),
                "Decision step failed"
            );
        }
    }
}

/// In-memory sink keeping every event in emission order
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: RwLock<Vec<DecisionEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all events
    pub fn events(&self) -> Vec<DecisionEvent> {
        self.events.read().clone()
    }

    /// Events produced by a given kind of entity
    pub fn events_for(&self, entity: EntityKind) -> Vec<DecisionEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.entity == entity)
            .cloned()
            .collect()
    }

    /// Events reporting a failure
    pub fn failures(&self) -> Vec<DecisionEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| !e.success)
            .cloned()
            .collect()
    }

    /// Events answered from the decision cache
    pub fn cache_hits(&self) -> Vec<DecisionEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.from_cache)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Clear all events
    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl EventSink for RecordingEventSink {
    fn emit(&self, event: DecisionEvent) {
        self.events.write().push(event);
    }
}
