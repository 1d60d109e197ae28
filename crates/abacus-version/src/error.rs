//! Version error types

use abacus_types::ErrorKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("Invalid policy version '{input}': {reason}")]
    InvalidVersion { input: String, reason: String },

    #[error("Invalid version pattern '{input}': {reason}")]
    InvalidPattern { input: String, reason: String },

    #[error("Inconsistent version constraint: {reason}")]
    InconsistentConstraint { reason: String },
}

impl VersionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidVersion { .. } | Self::InvalidPattern { .. } => ErrorKind::Syntax,
            Self::InconsistentConstraint { .. } => ErrorKind::Configuration,
        }
    }
}

/// Result type for version operations.
pub type Result<T> = std::result::Result<T, VersionError>;
