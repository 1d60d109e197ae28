//! Top-level error type

use abacus_config::ConfigError;
use abacus_policy::PolicyError;
use abacus_request::RequestError;
use abacus_types::{BagError, ErrorKind};
use abacus_version::VersionError;
use thiserror::Error;

/// Any error raised by the abacus crates.
#[derive(Debug, Error)]
pub enum AbacusError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Bag(#[from] BagError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl AbacusError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Request(e) => e.kind(),
            Self::Version(e) => e.kind(),
            Self::Policy(e) => e.kind(),
            Self::Bag(e) => e.kind(),
            Self::Config(e) => e.kind(),
        }
    }
}

/// Result type for abacus operations.
pub type Result<T> = std::result::Result<T, AbacusError>;
