//! Contracts for conditions, variables and resolvers
//!
//! Comparison operators, boolean combinators, variable lookup and type
//! coercion live outside the engine. The engine only consumes them through
//! the traits in this module, either inline or by catalog reference.

use std::fmt;
use std::sync::Arc;

use arbiter_types::{EntityKind, Reference};
use serde_json::Value;

use crate::catalog::Catalog;
use crate::context::EvaluationContext;
use crate::error::EvaluationError;

/// A three-valued predicate over the request.
///
/// `Ok(None)` means the condition could not be decided (for example a
/// missing operand); `Err` is a failure the engine reports with its reason.
pub trait Condition: Send + Sync + fmt::Debug {
    fn check(
        &self,
        context: &EvaluationContext,
        catalog: &Catalog,
    ) -> Result<Option<bool>, EvaluationError>;
}

/// A value source consumed by actions and condition operands
pub trait Variable: Send + Sync + fmt::Debug {
    fn resolve(
        &self,
        context: &EvaluationContext,
        catalog: &Catalog,
    ) -> Result<Value, EvaluationError>;
}

/// A path-expression resolver (key, JMESPath, JQ, ...) applied to a value
pub trait Resolver: Send + Sync + fmt::Debug {
    fn resolve(&self, input: &Value) -> Result<Value, EvaluationError>;
}

/// A condition given inline or by catalog reference
#[derive(Debug, Clone)]
pub enum ConditionNode {
    Inline(Arc<dyn Condition>),
    Ref(Reference),
}

impl ConditionNode {
    pub fn inline(condition: impl Condition + 'static) -> Self {
        Self::Inline(Arc::new(condition))
    }

    pub fn reference(reference: Reference) -> Self {
        Self::Ref(reference)
    }

    /// Resolve and check the condition. An unresolved reference is reported
    /// as [`EvaluationError::NotFound`].
    pub fn check(
        &self,
        context: &EvaluationContext,
        catalog: &Catalog,
    ) -> Result<Option<bool>, EvaluationError> {
        match self {
            Self::Inline(condition) => condition.check(context, catalog),
            Self::Ref(reference) => catalog
                .condition(reference)
                .ok_or_else(|| EvaluationError::NotFound {
                    kind: EntityKind::Condition,
                    reference: reference.clone(),
                })?
                .check(context, catalog),
        }
    }
}

impl From<Reference> for ConditionNode {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}

/// A variable given inline or by catalog reference
#[derive(Debug, Clone)]
pub enum VariableNode {
    Inline(Arc<dyn Variable>),
    Ref(Reference),
}

impl VariableNode {
    pub fn inline(variable: impl Variable + 'static) -> Self {
        Self::Inline(Arc::new(variable))
    }

    pub fn resolve(
        &self,
        context: &EvaluationContext,
        catalog: &Catalog,
    ) -> Result<Value, EvaluationError> {
        match self {
            Self::Inline(variable) => variable.resolve(context, catalog),
            Self::Ref(reference) => catalog
                .variable(reference)
                .ok_or_else(|| EvaluationError::NotFound {
                    kind: EntityKind::Variable,
                    reference: reference.clone(),
                })?
                .resolve(context, catalog),
        }
    }
}

impl From<Reference> for VariableNode {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}

/// A resolver given inline or by catalog reference
#[derive(Debug, Clone)]
pub enum ResolverNode {
    Inline(Arc<dyn Resolver>),
    Ref(Reference),
}

impl ResolverNode {
    pub fn inline(resolver: impl Resolver + 'static) -> Self {
        Self::Inline(Arc::new(resolver))
    }

    pub fn apply(&self, input: &Value, catalog: &Catalog) -> Result<Value, EvaluationError> {
        match self {
            Self::Inline(resolver) => resolver.resolve(input),
            Self::Ref(reference) => catalog
                .resolver(reference)
                .ok_or_else(|| EvaluationError::NotFound {
                    kind: EntityKind::Resolver,
                    reference: reference.clone(),
                })?
                .resolve(input),
        }
    }
}

impl From<Reference> for ResolverNode {
    fn from(reference: Reference) -> Self {
        Self::Ref(reference)
    }
}

/// Resolver following a dot-separated key path (`subject.roles.0`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyResolver {
    path: String,
}

impl KeyResolver {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Resolver for KeyResolver {
    fn resolve(&self, input: &Value) -> Result<Value, EvaluationError> {
        let mut current = input;
        for key in self.path.split('.').filter(|k| !k.is_empty()) {
            let next = match current {
                Value::Object(map) => map.get(key),
                Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            current = next.ok_or_else(|| {
                EvaluationError::Variable(format!("key path '{}' not found", self.path))
            })?;
        }
        Ok(current.clone())
    }
}

/// Variable reading a value out of the request through a resolver
#[derive(Debug, Clone)]
pub struct RequestVariable {
    resolver: ResolverNode,
}

impl RequestVariable {
    pub fn new(resolver: ResolverNode) -> Self {
        Self { resolver }
    }

    /// Shorthand for a [`KeyResolver`] over the request
    pub fn key(path: impl Into<String>) -> Self {
        Self::new(ResolverNode::inline(KeyResolver::new(path)))
    }
}

impl Variable for RequestVariable {
    fn resolve(
        &self,
        context: &EvaluationContext,
        catalog: &Catalog,
    ) -> Result<Value, EvaluationError> {
        self.resolver.apply(context.request(), catalog)
    }
}

/// Variable holding a fixed value
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantVariable(pub Value);

impl Variable for ConstantVariable {
    fn resolve(
        &self,
        _context: &EvaluationContext,
        _catalog: &Catalog,
    ) -> Result<Value, EvaluationError> {
        Ok(self.0.clone())
    }
}
