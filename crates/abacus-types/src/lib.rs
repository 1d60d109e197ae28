//! # abacus-types: Core types for `Abacus`
//!
//! This crate contains the attribute-level vocabulary shared by the request
//! and policy crates:
//! - Attribute identity ([`AttributeKey`])
//! - Typed values ([`Datatype`], [`AttributeValue`])
//! - Value bags ([`GrowableBag`] while merging, [`Bag`] once frozen)
//! - Opaque request content ([`ContentHandle`], [`XPathContext`])
//! - Well-known XACML identifiers ([`ids`])
//! - The error taxonomy shared by every crate ([`ErrorKind`])

use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Well-known identifiers
// ============================================================================

/// Standard XACML 3.0 identifiers used by the request core.
pub mod ids {
    /// `access-subject` attribute category.
    pub const CATEGORY_ACCESS_SUBJECT: &str =
        "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject";
    /// `resource` attribute category.
    pub const CATEGORY_RESOURCE: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:resource";
    /// `action` attribute category.
    pub const CATEGORY_ACTION: &str = "urn:oasis:names:tc:xacml:3.0:attribute-category:action";
    /// `environment` attribute category.
    pub const CATEGORY_ENVIRONMENT: &str =
        "urn:oasis:names:tc:xacml:3.0:attribute-category:environment";

    /// `subject-id` attribute.
    pub const SUBJECT_ID: &str = "urn:oasis:names:tc:xacml:1.0:subject:subject-id";
    /// `resource-id` attribute.
    pub const RESOURCE_ID: &str = "urn:oasis:names:tc:xacml:1.0:resource:resource-id";
    /// `action-id` attribute.
    pub const ACTION_ID: &str = "urn:oasis:names:tc:xacml:1.0:action:action-id";

    /// Resource scope attribute (Multiple Decision Profile, hierarchical resources).
    pub const RESOURCE_SCOPE: &str = "urn:oasis:names:tc:xacml:2.0:resource:scope";
    /// The only resource scope value this engine supports.
    pub const RESOURCE_SCOPE_IMMEDIATE: &str = "Immediate";

    /// Multiple Decision Profile content selector attribute (not supported).
    pub const MULTIPLE_CONTENT_SELECTOR: &str =
        "urn:oasis:names:tc:xacml:3.0:profile:multiple:content-selector";

    pub const XSD_STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    pub const XSD_DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    pub const XSD_ANY_URI: &str = "http://www.w3.org/2001/XMLSchema#anyURI";
    pub const XPATH_EXPRESSION: &str =
        "urn:oasis:names:tc:xacml:3.0:data-type:xpathExpression";
}

// ============================================================================
// Error taxonomy
// ============================================================================

/// Coarse classification of every error raised by the Abacus crates.
///
/// All failures are deterministic functions of their input; none of them is
/// worth retrying without changing the input or the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or inconsistent input (bad version string, datatype
    /// mismatch, duplicate attribute, duplicate content).
    Syntax,
    /// Valid input that asks for something this deployment does not support.
    UnsupportedFeature,
    /// Policy reference cycle, excessive depth or dangling reference.
    ReferenceIntegrity,
    /// Inconsistent configuration, detected before any request is processed.
    Configuration,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Syntax => "syntax",
            Self::UnsupportedFeature => "unsupported-feature",
            Self::ReferenceIntegrity => "reference-integrity",
            Self::Configuration => "configuration",
        };
        f.write_str(label)
    }
}

// ============================================================================
// Datatype & AttributeValue
// ============================================================================

/// Datatype identifier (a URI such as `http://www.w3.org/2001/XMLSchema#string`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Datatype(String);

impl Datatype {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn string() -> Self {
        Self::new(ids::XSD_STRING)
    }

    pub fn boolean() -> Self {
        Self::new(ids::XSD_BOOLEAN)
    }

    pub fn integer() -> Self {
        Self::new(ids::XSD_INTEGER)
    }

    pub fn double() -> Self {
        Self::new(ids::XSD_DOUBLE)
    }

    pub fn any_uri() -> Self {
        Self::new(ids::XSD_ANY_URI)
    }

    pub fn xpath_expression() -> Self {
        Self::new(ids::XPATH_EXPRESSION)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Datatype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Datatype {
    fn from(uri: &str) -> Self {
        Self::new(uri)
    }
}

/// A typed attribute value in canonical lexical form.
///
/// Construction from raw request text goes through a value factory, which
/// validates the lexical form against the datatype before building this.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeValue {
    datatype: Datatype,
    lexical: String,
}

impl AttributeValue {
    pub fn new(datatype: Datatype, lexical: impl Into<String>) -> Self {
        Self {
            datatype,
            lexical: lexical.into(),
        }
    }

    /// Shorthand for an `xs:string` value.
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Datatype::string(), value)
    }

    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    pub fn lexical(&self) -> &str {
        &self.lexical
    }
}

impl Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "\"{}\"^^{}", self.lexical, self.datatype)
    }
}

// ============================================================================
// AttributeKey
// ============================================================================

/// Identity of a named attribute across a request: category, optional
/// issuer and attribute id.
///
/// An absent issuer is distinct from every present issuer, including the
/// empty string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttributeKey {
    category: String,
    issuer: Option<String>,
    attribute_id: String,
}

impl AttributeKey {
    pub fn new(
        category: impl Into<String>,
        issuer: Option<impl Into<String>>,
        attribute_id: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            issuer: issuer.map(Into::into),
            attribute_id: attribute_id.into(),
        }
    }

    /// Creates a key with no issuer.
    pub fn unissued(category: impl Into<String>, attribute_id: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            issuer: None,
            attribute_id: attribute_id.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn issuer(&self) -> Option<&str> {
        self.issuer.as_deref()
    }

    pub fn attribute_id(&self) -> &str {
        &self.attribute_id
    }

    /// Returns the issuer-less counterpart of this key (same category and id).
    pub fn without_issuer(&self) -> Self {
        Self::unissued(self.category.clone(), self.attribute_id.clone())
    }
}

impl Display for AttributeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.issuer {
            Some(issuer) => write!(f, "{}#{} (issuer: {issuer})", self.category, self.attribute_id),
            None => write!(f, "{}#{}", self.category, self.attribute_id),
        }
    }
}

// ============================================================================
// Bags
// ============================================================================

/// Where the values of a bag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeSource {
    /// Named attributes declared in the request.
    Request,
    /// Values selected from a category's `Content`.
    RequestContent,
}

/// Error raised when a bag's single-datatype invariant would be broken.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BagError {
    #[error("Datatype mismatch: bag holds {expected} values, got a {actual} value")]
    DatatypeMismatch { expected: Datatype, actual: Datatype },
}

impl BagError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Syntax
    }
}

/// A bag under construction. Values keep their insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowableBag {
    datatype: Datatype,
    values: Vec<AttributeValue>,
    source: AttributeSource,
}

impl GrowableBag {
    pub fn new(datatype: Datatype, source: AttributeSource) -> Self {
        Self {
            datatype,
            values: Vec::new(),
            source,
        }
    }

    /// Appends a value.
    ///
    /// # Errors
    ///
    /// [`BagError::DatatypeMismatch`] if the value's datatype differs from
    /// the bag's; the bag is left unchanged.
    pub fn push(&mut self, value: AttributeValue) -> Result<(), BagError> {
        if value.datatype() != &self.datatype {
            return Err(BagError::DatatypeMismatch {
                expected: self.datatype.clone(),
                actual: value.datatype().clone(),
            });
        }
        self.values.push(value);
        Ok(())
    }

    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    pub fn source(&self) -> AttributeSource {
        self.source
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Freezes the bag. The result is immutable and cheap to clone.
    pub fn freeze(self) -> Bag {
        Bag {
            datatype: self.datatype,
            values: self.values.into(),
            source: self.source,
        }
    }
}

/// An immutable bag of same-datatype values.
///
/// Clones share the underlying storage, so a frozen bag can be handed to
/// every individual decision request derived from one wire request and read
/// concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Bag {
    datatype: Datatype,
    values: Arc<[AttributeValue]>,
    source: AttributeSource,
}

impl Bag {
    /// Builds a frozen bag directly from values.
    ///
    /// # Errors
    ///
    /// [`BagError::DatatypeMismatch`] on the first value of another datatype.
    pub fn from_values(
        datatype: Datatype,
        values: impl IntoIterator<Item = AttributeValue>,
        source: AttributeSource,
    ) -> Result<Self, BagError> {
        let mut bag = GrowableBag::new(datatype, source);
        for value in values {
            bag.push(value)?;
        }
        Ok(bag.freeze())
    }

    pub fn empty(datatype: Datatype, source: AttributeSource) -> Self {
        GrowableBag::new(datatype, source).freeze()
    }

    pub fn datatype(&self) -> &Datatype {
        &self.datatype
    }

    pub fn source(&self) -> AttributeSource {
        self.source
    }

    pub fn values(&self) -> &[AttributeValue] {
        &self.values
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttributeValue> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the value if the bag holds exactly one.
    pub fn single_value(&self) -> Option<&AttributeValue> {
        match &*self.values {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn contains(&self, value: &AttributeValue) -> bool {
        self.values.contains(value)
    }
}

impl<'a> IntoIterator for &'a Bag {
    type Item = &'a AttributeValue;
    type IntoIter = std::slice::Iter<'a, AttributeValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// ============================================================================
// Content
// ============================================================================

/// Opaque handle to a category's `Content` element.
///
/// The core never looks inside; it only carries the bytes to the evaluation
/// engine and enforces that each category has at most one content node.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ContentHandle(Bytes);

impl ContentHandle {
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self(content.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for ContentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ContentHandle({} bytes)", self.0.len())
    }
}

/// Evaluation context for XPath-valued attributes: the content node of the
/// category the attribute was declared in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathContext {
    category: String,
    content: ContentHandle,
}

impl XPathContext {
    pub fn new(category: impl Into<String>, content: ContentHandle) -> Self {
        Self {
            category: category.into(),
            content,
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn content(&self) -> &ContentHandle {
        &self.content
    }
}

// ============================================================================
// Tests
// ============================================================================
