//! Arbiter Types - Core value types for the policy decision engine
//!
//! These types are shared by every layer of the engine and by callers that
//! only need to inspect decisions.
//!
//! ## Key Concepts
//!
//! - **Outcome**: Six-valued decision result (Permit, Deny, NotApplicable and
//!   three Indeterminate variants)
//! - **TargetEffect**: What a leaf Policy decides when its condition holds
//! - **CombiningAlgorithm**: How a PolicySet folds child outcomes
//! - **ExecutionMode / ExecutionStrategy**: When and how actions run
//! - **Identity / Reference**: Versioned naming of catalog entities

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]

pub mod identity;
pub mod modes;
pub mod outcome;

pub use identity::{Identity, IdentityError, Reference};
pub use modes::{CombiningAlgorithm, EntityKind, ExecutionMode, ExecutionStrategy};
pub use outcome::{Outcome, TargetEffect};

pub use semver::Version;
