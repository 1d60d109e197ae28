//! Individual decision requests.

use abacus_types::{AttributeKey, Bag, ContentHandle};

use crate::attributes::AttributeMap;
use crate::category::CategoryEcho;

/// One fully merged, self-contained access request, ready for policy
/// evaluation.
///
/// Immutable once built. All bags are shared, so a request is `Send + Sync`
/// and cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndividualDecisionRequest {
    pub(crate) named_attributes: AttributeMap<Bag>,
    pub(crate) content_by_category: Vec<(String, ContentHandle)>,
    pub(crate) echo: Vec<CategoryEcho>,
    pub(crate) return_policy_id_list: bool,
}

impl IndividualDecisionRequest {
    /// The bag for `key`, if the request declared it.
    pub fn attribute(&self, key: &AttributeKey) -> Option<&Bag> {
        self.named_attributes.get(key)
    }

    /// All named attributes, in declaration order.
    pub fn attributes(&self) -> impl Iterator<Item = (&AttributeKey, &Bag)> {
        self.named_attributes.iter()
    }

    pub fn attribute_count(&self) -> usize {
        self.named_attributes.len()
    }

    /// The `Content` of `category_id`, if any.
    pub fn content(&self, category_id: &str) -> Option<&ContentHandle> {
        self.content_by_category
            .iter()
            .find(|(category, _)| category == category_id)
            .map(|(_, content)| content)
    }

    pub fn contents(&self) -> impl Iterator<Item = (&str, &ContentHandle)> {
        self.content_by_category
            .iter()
            .map(|(category, content)| (category.as_str(), content))
    }

    /// Attributes marked `IncludeInResult`, grouped per category in
    /// declaration order.
    pub fn attributes_to_echo(&self) -> &[CategoryEcho] {
        &self.echo
    }

    /// Whether the result must list the applicable policy ids.
    pub fn returns_policy_id_list(&self) -> bool {
        self.return_policy_id_list
    }

    /// Distinct categories carrying attributes or content, in first-seen
    /// order.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        let from_attributes = self.named_attributes.keys().map(AttributeKey::category);
        let from_content = self.content_by_category.iter().map(|(c, _)| c.as_str());
        for category in from_attributes.chain(from_content) {
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
        seen
    }
}
