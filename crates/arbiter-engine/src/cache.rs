//! Per-session decision cache
//!
//! Maps the identity key of a named Policy or PolicySet to the outcome of its
//! first evaluation. The engine only reads and inserts; clearing is left to
//! the caller between independent sessions.

use arbiter_types::Outcome;
use std::collections::HashMap;

/// Memoized outcomes keyed by identity key (`id` or `id:version`)
#[derive(Debug, Clone, Default)]
pub struct DecisionCache {
    outcomes: HashMap<String, Outcome>,
}

impl DecisionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a cached outcome. Blank keys never hit.
    pub fn get(&self, key: &str) -> Option<Outcome> {
        if key.is_empty() {
            return None;
        }
        self.outcomes.get(key).copied()
    }

    /// Store an outcome. Blank keys are ignored.
    pub fn insert(&mut self, key: impl Into<String>, outcome: Outcome) {
        let key = key.into();
        if key.is_empty() {
            return;
        }
        self.outcomes.insert(key, outcome);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.outcomes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn clear(&mut self) {
        self.outcomes.clear();
    }
}
