//! Policy resolution error types

use abacus_types::ErrorKind;
use abacus_version::PolicyVersion;
use thiserror::Error;

use crate::chain::ReferenceChain;
use crate::document::{PolicyReference, PolicyType};

/// Error raised while storing or resolving policies.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    /// Following a reference would revisit a policy set already on the chain.
    #[error("Reference cycle: '{id}' is already in the reference chain [{chain}]")]
    ReferenceCycle { id: String, chain: ReferenceChain },

    /// Following a reference would make the chain longer than allowed.
    #[error("Reference depth exceeded: adding '{id}' to [{chain}] goes over the maximum of {max}")]
    DepthExceeded {
        id: String,
        chain: ReferenceChain,
        max: usize,
    },

    /// A reference inside a policy set matched no policy.
    #[error("Unresolved reference in policy set '{parent}': {reference}")]
    UnresolvedReference {
        reference: PolicyReference,
        parent: String,
    },

    #[error("{policy_type} '{id}' version {version} is already stored")]
    DuplicatePolicy {
        policy_type: PolicyType,
        id: String,
        version: PolicyVersion,
    },
}

impl PolicyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ReferenceCycle { .. }
            | Self::DepthExceeded { .. }
            | Self::UnresolvedReference { .. } => ErrorKind::ReferenceIntegrity,
            Self::DuplicatePolicy { .. } => ErrorKind::Configuration,
        }
    }
}

/// Result type for policy operations.
pub type Result<T> = std::result::Result<T, PolicyError>;
