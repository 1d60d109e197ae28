//! Mutable accumulator for one individual decision request.

use abacus_types::{Bag, ContentHandle};
use tracing::warn;

use crate::attributes::AttributeMap;
use crate::category::{CategoryEcho, CategoryGroup};
use crate::error::{RequestError, Result};
use crate::request::IndividualDecisionRequest;

/// Collects category groups into one [`IndividualDecisionRequest`].
///
/// Owned by a single expansion. `Clone` is a deep copy of the attribute
/// map, the content map and the echo list (bags themselves are shared, being
/// immutable), so clones can be grown independently.
#[derive(Debug, Clone, Default)]
pub struct DecisionRequestBuilder {
    named_attributes: AttributeMap<Bag>,
    content_by_category: Vec<(String, ContentHandle)>,
    echo: Vec<CategoryEcho>,
    return_policy_id_list: bool,
}

impl DecisionRequestBuilder {
    pub fn new(return_policy_id_list: bool) -> Self {
        Self {
            return_policy_id_list,
            ..Self::default()
        }
    }

    pub fn attribute_count(&self) -> usize {
        self.named_attributes.len()
    }

    /// Drains `group` into the builder.
    ///
    /// # Errors
    ///
    /// [`RequestError::DuplicateContent`] if the builder already holds
    /// content or one of the group's attributes for that category. The
    /// builder may be partially updated and must be discarded.
    pub fn put_group(&mut self, group: CategoryGroup) -> Result<()> {
        let parts = group.into_parts();
        let category = parts.category_id;

        if let Some(content) = parts.content {
            if self.content_by_category.iter().any(|(c, _)| *c == category) {
                warn!(category = %category, "Duplicate Content for category");
                return Err(RequestError::DuplicateContent { category });
            }
            self.content_by_category.push((category.clone(), content));
        }

        for (key, bag) in parts.attributes {
            if !self.named_attributes.insert_new(key, bag) {
                warn!(category = %category, "Duplicate Attributes for category");
                return Err(RequestError::DuplicateContent { category });
            }
        }

        if let Some(echo) = parts.echo {
            self.echo.push(echo);
        }
        Ok(())
    }

    /// Freezes the builder.
    pub fn build(self) -> IndividualDecisionRequest {
        IndividualDecisionRequest {
            named_attributes: self.named_attributes,
            content_by_category: self.content_by_category,
            echo: self.echo,
            return_policy_id_list: self.return_policy_id_list,
        }
    }
}
