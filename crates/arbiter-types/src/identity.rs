//! Entity identity and catalog references
//!
//! Every entity may carry an `id` and a semantic `version`. The identity key
//! (`id` or `id:version`) is what the decision cache and the event path use;
//! entities without an id are anonymous and are never cached.

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised while constructing identities and references
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("entity id must not be blank")]
    BlankId,

    #[error("invalid version '{input}': {source}")]
    InvalidVersion {
        input: String,
        #[source]
        source: semver::Error,
    },
}

fn parse_version(input: &str) -> Result<Version, IdentityError> {
    Version::parse(input.trim()).map_err(|source| IdentityError::InvalidVersion {
        input: input.to_string(),
        source,
    })
}

/// Optional id plus optional version of a named entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawIdentity")]
pub struct Identity {
    id: Option<String>,
    version: Option<Version>,
}

#[derive(Deserialize)]
struct RawIdentity {
    id: Option<String>,
    version: Option<Version>,
}

impl TryFrom<RawIdentity> for Identity {
    type Error = IdentityError;

    fn try_from(raw: RawIdentity) -> Result<Self, Self::Error> {
        Identity::new(raw.id, raw.version)
    }
}

impl Identity {
    /// Create an identity, rejecting a present-but-blank id
    pub fn new(id: Option<String>, version: Option<Version>) -> Result<Self, IdentityError> {
        if let Some(ref id) = id {
            if id.trim().is_empty() {
                return Err(IdentityError::BlankId);
            }
        }
        Ok(Self { id, version })
    }

    /// Identity of an unnamed entity
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Named identity without a version
    pub fn named(id: impl Into<String>) -> Result<Self, IdentityError> {
        Self::new(Some(id.into()), None)
    }

    /// Named identity with a version parsed from a string such as `"1.2.0"`
    pub fn versioned(id: impl Into<String>, version: &str) -> Result<Self, IdentityError> {
        Self::new(Some(id.into()), Some(parse_version(version)?))
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    /// Whether the entity takes part in caching
    pub fn is_named(&self) -> bool {
        self.id.is_some()
    }

    /// Cache and correlation key: `""`, `id`, or `id:version`
    pub fn key(&self) -> String {
        match (&self.id, &self.version) {
            (None, _) => String::new(),
            (Some(id), None) => id.clone(),
            (Some(id), Some(version)) => format!("{}:{}", id, version),
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// Pointer to a catalog entry by id and optional exact version.
///
/// Without a version the highest version registered under the id is used.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub id: String,
    #[serde(default)]
    pub version: Option<Version>,
}

impl Reference {
    /// Reference to the latest version of `id`
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
        }
    }

    /// Pin the reference to an exact version
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Parse `id` or `id:version`
    pub fn parse(input: &str) -> Result<Self, IdentityError> {
        let (id, version) = match input.split_once(':') {
            Some((id, version)) => (id, Some(parse_version(version)?)),
            None => (input, None),
        };
        if id.trim().is_empty() {
            return Err(IdentityError::BlankId);
        }
        Ok(Self {
            id: id.to_string(),
            version,
        })
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "{}:{}", self.id, version),
            None => f.write_str(&self.id),
        }
    }
}
