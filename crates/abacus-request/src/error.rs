//! Request error types

use abacus_types::{AttributeKey, BagError, Datatype, ErrorKind};
use thiserror::Error;

/// Error raised while merging attributes or expanding a request.
///
/// Any of these aborts the expansion of the whole wire-level request; no
/// partial set of individual requests is ever returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Strict mode: the same attribute occurred twice in one category.
    #[error("Duplicate attribute {key}: attributes may not be repeated in strict mode")]
    DuplicateAttribute { key: AttributeKey },

    /// Two occurrences of an attribute disagree on the datatype.
    #[error("Datatype mismatch for attribute {key}: {source}")]
    DatatypeMismatch {
        key: AttributeKey,
        source: BagError,
    },

    #[error("Invalid value '{value}' for datatype {datatype}: {reason}")]
    InvalidValue {
        datatype: Datatype,
        value: String,
        reason: String,
    },

    /// The resource scope attribute is not exactly one `Immediate` value.
    #[error("Unsupported resource scope: {reason}")]
    UnsupportedScope { reason: String },

    /// A category received content (or an attribute) from two alternatives.
    #[error("Duplicate Attributes/Content for category {category}")]
    DuplicateContent { category: String },

    #[error("Unsupported datatype: {0}")]
    UnsupportedDatatype(Datatype),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Rejected merge configuration, raised before any request is processed.
    #[error("Invalid request configuration: {0}")]
    InvalidConfiguration(String),
}

impl RequestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateAttribute { .. }
            | Self::DatatypeMismatch { .. }
            | Self::InvalidValue { .. }
            | Self::UnsupportedScope { .. }
            | Self::DuplicateContent { .. } => ErrorKind::Syntax,
            Self::UnsupportedDatatype(_) | Self::UnsupportedFeature(_) => {
                ErrorKind::UnsupportedFeature
            }
            Self::InvalidConfiguration(_) => ErrorKind::Configuration,
        }
    }
}

/// Result type for request operations.
pub type Result<T> = std::result::Result<T, RequestError>;
