use arbiter_types::{EntityKind, IdentityError, Reference};
use thiserror::Error;

/// Errors raised while building engine entities, catalogs and configuration.
///
/// Evaluation itself never returns these; it folds every failure into an
/// [`Outcome`](arbiter_types::Outcome) plus an event.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors specific to catalog construction.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("{kind} entries must be named to be added to the catalog")]
    Unnamed { kind: EntityKind },

    #[error("duplicate {kind} entry '{key}'")]
    Duplicate { kind: EntityKind, key: String },
}

/// Errors loading an [`EngineConfig`](crate::config::EngineConfig).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Failures raised by conditions, variables and actions during evaluation.
///
/// These are caught at the nearest Policy or Action boundary and converted
/// into an indeterminate outcome or a failed action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error("{kind} '{reference}' not found in catalog")]
    NotFound {
        kind: EntityKind,
        reference: Reference,
    },

    #[error("condition failed: {0}")]
    Condition(String),

    #[error("variable resolution failed: {0}")]
    Variable(String),

    #[error("action failed: {0}")]
    Action(String),

    #[error("output key '{0}' already exists")]
    KeyExists(String),

    #[error("maximum evaluation depth of {0} exceeded")]
    DepthExceeded(usize),
}

impl EvaluationError {
    /// Short error kind used as the prefix of event reasons
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NotFound",
            Self::Condition(_) => "ConditionError",
            Self::Variable(_) => "VariableError",
            Self::Action(_) => "ActionError",
            Self::KeyExists(_) => "KeyExists",
            Self::DepthExceeded(_) => "DepthExceeded",
        }
    }

    /// Reason string carried by failure events: error kind and message
    pub fn reason(&self) -> String {
        format!("{}: {}", self.kind(), self)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
