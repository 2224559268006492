//! Test doubles for conditions and actions.
//!
//! Used by the engine's own tests and available to downstream crates that
//! want to exercise policy trees without real condition or action backends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::action::Action;
use crate::catalog::Catalog;
use crate::condition::Condition;
use crate::context::EvaluationContext;
use crate::error::EvaluationError;

/// Condition returning a fixed three-valued result.
///
/// Counts how often it was checked, which makes cache hits and
/// short-circuiting observable.
#[derive(Debug, Clone)]
pub struct ConstantCondition {
    result: Option<bool>,
    calls: Arc<AtomicUsize>,
}

impl ConstantCondition {
    pub fn new(result: Option<bool>) -> Self {
        Self {
            result,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of checks so far, shared between clones
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Condition for ConstantCondition {
    fn check(
        &self,
        _context: &EvaluationContext,
        _catalog: &Catalog,
    ) -> Result<Option<bool>, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result)
    }
}

/// Condition that always raises an error
#[derive(Debug, Clone)]
pub struct FailingCondition {
    message: String,
}

impl FailingCondition {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Condition for FailingCondition {
    fn check(
        &self,
        _context: &EvaluationContext,
        _catalog: &Catalog,
    ) -> Result<Option<bool>, EvaluationError> {
        Err(EvaluationError::Condition(self.message.clone()))
    }
}

/// Shared, ordered log of executed action names
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A succeeding action writing to this log
    pub fn action(&self, name: impl Into<String>) -> RecordingAction {
        RecordingAction {
            name: name.into(),
            succeed: true,
            log: self.clone(),
        }
    }

    /// An action writing to this log and then reporting failure
    pub fn failing_action(&self, name: impl Into<String>) -> RecordingAction {
        RecordingAction {
            name: name.into(),
            succeed: false,
            log: self.clone(),
        }
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    fn push(&self, name: &str) {
        self.entries.lock().push(name.to_string());
    }
}

/// Action recording its name into an [`ActionLog`] when executed
#[derive(Debug, Clone)]
pub struct RecordingAction {
    name: String,
    succeed: bool,
    log: ActionLog,
}

impl RecordingAction {
    /// A succeeding action with its own log
    pub fn succeeding(name: impl Into<String>) -> Self {
        ActionLog::new().action(name)
    }

    pub fn log(&self) -> &ActionLog {
        &self.log
    }
}

impl Action for RecordingAction {
    fn execute(
        &self,
        _context: &mut EvaluationContext,
        _catalog: &Catalog,
    ) -> Result<bool, EvaluationError> {
        self.log.push(&self.name);
        Ok(self.succeed)
    }
}

/// Action that always raises an error
#[derive(Debug, Clone)]
pub struct FailingAction {
    message: String,
}

impl FailingAction {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Action for FailingAction {
    fn execute(
        &self,
        _context: &mut EvaluationContext,
        _catalog: &Catalog,
    ) -> Result<bool, EvaluationError> {
        Err(EvaluationError::Action(self.message.clone()))
    }
}
