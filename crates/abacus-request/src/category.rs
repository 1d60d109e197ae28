//! Category-level parsing.
//!
//! A [`RawCategory`] is one `<Attributes>` element of the wire request,
//! already tokenized by the I/O layer. A [`CategoryParser`] validates it and
//! produces a [`CategoryGroup`]: frozen bags per attribute key, the
//! category's content, and the attributes to echo in the result.

use abacus_types::{AttributeKey, Bag, ContentHandle, Datatype, XPathContext, ids};
use tracing::warn;

use crate::attributes::AttributeMap;
use crate::error::{RequestError, Result};
use crate::merger::{AttributeAccumulator, AttributeMerger};

// ============================================================================
// Raw input
// ============================================================================

/// One `<Attribute>` element: id, optional issuer, datatype and raw values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub attribute_id: String,
    pub issuer: Option<String>,
    pub datatype: Datatype,
    pub values: Vec<String>,
    /// `IncludeInResult="true"`: echo this attribute in the decision result.
    pub include_in_result: bool,
}

impl RawAttribute {
    pub fn new(
        attribute_id: impl Into<String>,
        datatype: Datatype,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            attribute_id: attribute_id.into(),
            issuer: None,
            datatype,
            values: values.into_iter().map(Into::into).collect(),
            include_in_result: false,
        }
    }

    /// Shorthand for an `xs:string` attribute.
    pub fn string(
        attribute_id: impl Into<String>,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self::new(attribute_id, Datatype::string(), values)
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    pub fn included_in_result(mut self) -> Self {
        self.include_in_result = true;
        self
    }
}

/// One `<Attributes>` element: a category id, its attributes and optional
/// `<Content>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCategory {
    pub category_id: String,
    pub attributes: Vec<RawAttribute>,
    pub content: Option<ContentHandle>,
}

impl RawCategory {
    pub fn new(category_id: impl Into<String>) -> Self {
        Self {
            category_id: category_id.into(),
            attributes: Vec::new(),
            content: None,
        }
    }

    pub fn with_attribute(mut self, attribute: RawAttribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_content(mut self, content: ContentHandle) -> Self {
        self.content = Some(content);
        self
    }
}

// ============================================================================
// CategoryGroup
// ============================================================================

/// An attribute declared with `IncludeInResult`, with the values of that
/// declaration only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EchoedAttribute {
    pub key: AttributeKey,
    pub values: Bag,
}

/// The attributes of one category to return with the decision result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryEcho {
    pub category_id: String,
    pub attributes: Vec<EchoedAttribute>,
}

/// A parsed category occurrence.
///
/// The group is immutable. Its attribute entries can only be taken out once,
/// through [`into_parts`](Self::into_parts), which consumes the group: a
/// caller has to drain it into an accumulator instead of re-scanning it.
/// Cloning is cheap because bags share their values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    category_id: String,
    attributes: AttributeMap<Bag>,
    content: Option<ContentHandle>,
    echo: Option<CategoryEcho>,
}

/// The owned contents of a [`CategoryGroup`].
#[derive(Debug)]
pub struct CategoryParts {
    pub category_id: String,
    pub attributes: std::vec::IntoIter<(AttributeKey, Bag)>,
    pub content: Option<ContentHandle>,
    pub echo: Option<CategoryEcho>,
}

impl CategoryGroup {
    pub fn new(
        category_id: impl Into<String>,
        attributes: AttributeMap<Bag>,
        content: Option<ContentHandle>,
        echo: Option<CategoryEcho>,
    ) -> Self {
        Self {
            category_id: category_id.into(),
            attributes,
            content,
            echo,
        }
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn content(&self) -> Option<&ContentHandle> {
        self.content.as_ref()
    }

    pub fn attributes_to_echo(&self) -> Option<&CategoryEcho> {
        self.echo.as_ref()
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    /// True if the occurrence yielded neither attributes nor content.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.content.is_none()
    }

    pub fn into_parts(self) -> CategoryParts {
        CategoryParts {
            category_id: self.category_id,
            attributes: self.attributes.into_iter(),
            content: self.content,
            echo: self.echo,
        }
    }
}

// ============================================================================
// CategoryParser
// ============================================================================

/// Validates raw category occurrences into [`CategoryGroup`]s.
pub trait CategoryParser: Send + Sync {
    /// Parses several occurrences of the same category through a single
    /// accumulator, as if they were one occurrence.
    fn parse_merged(
        &self,
        category_id: &str,
        occurrences: &[&RawCategory],
    ) -> Result<CategoryGroup>;

    /// Parses a single occurrence.
    fn parse(&self, occurrence: &RawCategory) -> Result<CategoryGroup> {
        self.parse_merged(&occurrence.category_id, std::slice::from_ref(&occurrence))
    }
}

/// The standard parser: values through the merger's value factory,
/// attributes through the [`AttributeMerger`].
#[derive(Debug, Clone)]
pub struct StandardCategoryParser {
    merger: AttributeMerger,
}

impl StandardCategoryParser {
    pub fn new(merger: AttributeMerger) -> Self {
        Self { merger }
    }

    pub fn merger(&self) -> &AttributeMerger {
        &self.merger
    }
}

impl CategoryParser for StandardCategoryParser {
    fn parse_merged(
        &self,
        category_id: &str,
        occurrences: &[&RawCategory],
    ) -> Result<CategoryGroup> {
        let mut content: Option<ContentHandle> = None;
        for occurrence in occurrences {
            debug_assert_eq!(occurrence.category_id, category_id);
            if let Some(handle) = &occurrence.content {
                if content.is_some() {
                    warn!(category = %category_id, "Category has more than one Content element");
                    return Err(RequestError::DuplicateContent {
                        category: category_id.to_string(),
                    });
                }
                content = Some(handle.clone());
            }
        }

        let xpath_context = content
            .as_ref()
            .map(|handle| XPathContext::new(category_id, handle.clone()));

        let mut accumulator = AttributeAccumulator::new();
        let mut echoed = Vec::new();
        for raw in occurrences.iter().flat_map(|o| o.attributes.iter()) {
            if raw.attribute_id == ids::MULTIPLE_CONTENT_SELECTOR {
                return Err(RequestError::UnsupportedFeature(format!(
                    "Multiple Decision Profile content selector ({}) in category {category_id}",
                    ids::MULTIPLE_CONTENT_SELECTOR
                )));
            }

            let values = self.merger.merge_occurrence(
                category_id,
                raw,
                xpath_context.as_ref(),
                &mut accumulator,
            )?;
            if raw.include_in_result {
                echoed.push(EchoedAttribute {
                    key: AttributeKey::new(
                        category_id,
                        raw.issuer.as_deref(),
                        raw.attribute_id.as_str(),
                    ),
                    values,
                });
            }
        }

        let echo = (!echoed.is_empty()).then(|| CategoryEcho {
            category_id: category_id.to_string(),
            attributes: echoed,
        });

        Ok(CategoryGroup::new(category_id, accumulator.freeze(), content, echo))
    }
}
