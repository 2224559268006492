//! Entity catalog
//!
//! The catalog holds named, versioned Policies, PolicySets, Conditions,
//! Variables, Resolvers and Actions. It is built once, then shared read-only
//! by any number of evaluation sessions.
//!
//! ## Resolution
//!
//! A reference with a version matches that exact version. A reference without
//! a version selects the highest version registered under the id; an entry
//! registered without a version is only selected when no versioned entry
//! shares its id. Duplicate `(id, version)` pairs are rejected at build time,
//! so resolution is never ambiguous.

use std::collections::HashMap;
use std::sync::Arc;

use arbiter_types::{EntityKind, Identity, Reference, Version};
use tracing::debug;

use crate::action::Action;
use crate::condition::{Condition, Resolver, Variable};
use crate::error::CatalogError;
use crate::policy::Policy;
use crate::policy_set::PolicySet;

#[derive(Debug)]
struct Entry<T: ?Sized> {
    version: Option<Version>,
    value: Arc<T>,
}

/// Versioned entries of one entity kind, grouped by id
#[derive(Debug)]
struct Collection<T: ?Sized> {
    kind: EntityKind,
    entries: HashMap<String, Vec<Entry<T>>>,
}

impl<T: ?Sized> Collection<T> {
    fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
        }
    }

    fn insert(&mut self, identity: &Identity, value: Arc<T>) -> Result<(), CatalogError> {
        let id = identity
            .id()
            .ok_or(CatalogError::Unnamed { kind: self.kind })?;
        let versions = self.entries.entry(id.to_string()).or_default();

        if versions.iter().any(|e| e.version.as_ref() == identity.version()) {
            return Err(CatalogError::Duplicate {
                kind: self.kind,
                key: identity.key(),
            });
        }

        versions.push(Entry {
            version: identity.version().cloned(),
            value,
        });
        Ok(())
    }

    fn resolve(&self, reference: &Reference) -> Option<&Arc<T>> {
        let versions = self.entries.get(&reference.id)?;

        let entry = match &reference.version {
            Some(version) => versions.iter().find(|e| e.version.as_ref() == Some(version)),
            None => versions
                .iter()
                .filter(|e| e.version.is_some())
                .max_by(|a, b| a.version.cmp(&b.version))
                .or_else(|| versions.iter().find(|e| e.version.is_none())),
        };

        if entry.is_none() {
            debug!(kind = %self.kind, reference = %reference, "Catalog lookup missed");
        }
        entry.map(|e| &e.value)
    }

    fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

/// An entity returned by a kind-directed lookup
#[derive(Debug, Clone)]
pub enum CatalogEntity {
    Policy(Arc<Policy>),
    PolicySet(Arc<PolicySet>),
    Condition(Arc<dyn Condition>),
    Variable(Arc<dyn Variable>),
    Resolver(Arc<dyn Resolver>),
    Action(Arc<dyn Action>),
}

/// Read-only store of named entities
#[derive(Debug)]
pub struct Catalog {
    policies: Collection<Policy>,
    policy_sets: Collection<PolicySet>,
    conditions: Collection<dyn Condition>,
    variables: Collection<dyn Variable>,
    resolvers: Collection<dyn Resolver>,
    actions: Collection<dyn Action>,
}

impl Catalog {
    /// Start building a catalog
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder {
            catalog: Catalog::empty(),
        }
    }

    /// A catalog with no entries
    pub fn empty() -> Self {
        Self {
            policies: Collection::new(EntityKind::Policy),
            policy_sets: Collection::new(EntityKind::PolicySet),
            conditions: Collection::new(EntityKind::Condition),
            variables: Collection::new(EntityKind::Variable),
            resolvers: Collection::new(EntityKind::Resolver),
            actions: Collection::new(EntityKind::Action),
        }
    }

    /// Resolve a reference within the collection for `kind`.
    ///
    /// Kinds without a collection (relationships, constraints) never resolve.
    pub fn resolve(&self, kind: EntityKind, reference: &Reference) -> Option<CatalogEntity> {
        match kind {
            EntityKind::Policy => self.policy(reference).map(CatalogEntity::Policy),
            EntityKind::PolicySet => self.policy_set(reference).map(CatalogEntity::PolicySet),
            EntityKind::Condition | EntityKind::Constraint => {
                self.condition(reference).map(CatalogEntity::Condition)
            }
            EntityKind::Variable => self.variable(reference).map(CatalogEntity::Variable),
            EntityKind::Resolver => self.resolver(reference).map(CatalogEntity::Resolver),
            EntityKind::Action => self.action(reference).map(CatalogEntity::Action),
            EntityKind::PolicyRelationship | EntityKind::ActionRelationship => None,
        }
    }

    pub fn policy(&self, reference: &Reference) -> Option<Arc<Policy>> {
        self.policies.resolve(reference).cloned()
    }

    pub fn policy_set(&self, reference: &Reference) -> Option<Arc<PolicySet>> {
        self.policy_sets.resolve(reference).cloned()
    }

    pub fn condition(&self, reference: &Reference) -> Option<Arc<dyn Condition>> {
        self.conditions.resolve(reference).cloned()
    }

    pub fn variable(&self, reference: &Reference) -> Option<Arc<dyn Variable>> {
        self.variables.resolve(reference).cloned()
    }

    pub fn resolver(&self, reference: &Reference) -> Option<Arc<dyn Resolver>> {
        self.resolvers.resolve(reference).cloned()
    }

    pub fn action(&self, reference: &Reference) -> Option<Arc<dyn Action>> {
        self.actions.resolve(reference).cloned()
    }

    /// Total number of entries across all collections
    pub fn len(&self) -> usize {
        self.policies.len()
            + self.policy_sets.len()
            + self.conditions.len()
            + self.variables.len()
            + self.resolvers.len()
            + self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::empty()
    }
}

/// Builder validating entries as they are added
#[derive(Debug)]
pub struct CatalogBuilder {
    catalog: Catalog,
}

impl CatalogBuilder {
    pub fn policy(mut self, policy: Policy) -> Result<Self, CatalogError> {
        let identity = policy.identity().clone();
        self.catalog.policies.insert(&identity, Arc::new(policy))?;
        Ok(self)
    }

    pub fn policy_set(mut self, policy_set: PolicySet) -> Result<Self, CatalogError> {
        let identity = policy_set.identity().clone();
        self.catalog
            .policy_sets
            .insert(&identity, Arc::new(policy_set))?;
        Ok(self)
    }

    pub fn condition(
        mut self,
        identity: Identity,
        condition: Arc<dyn Condition>,
    ) -> Result<Self, CatalogError> {
        self.catalog.conditions.insert(&identity, condition)?;
        Ok(self)
    }

    pub fn variable(
        mut self,
        identity: Identity,
        variable: Arc<dyn Variable>,
    ) -> Result<Self, CatalogError> {
        self.catalog.variables.insert(&identity, variable)?;
        Ok(self)
    }

    pub fn resolver(
        mut self,
        identity: Identity,
        resolver: Arc<dyn Resolver>,
    ) -> Result<Self, CatalogError> {
        self.catalog.resolvers.insert(&identity, resolver)?;
        Ok(self)
    }

    pub fn action(
        mut self,
        identity: Identity,
        action: Arc<dyn Action>,
    ) -> Result<Self, CatalogError> {
        self.catalog.actions.insert(&identity, action)?;
        Ok(self)
    }

    pub fn build(self) -> Catalog {
        self.catalog
    }
}
