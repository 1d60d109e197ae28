//! Request expansion.
//!
//! Turns the category occurrences of one wire-level request into the
//! individual decision requests to evaluate.
//!
//! With the Multiple Decision Profile, a category that occurs several times
//! contributes one alternative per occurrence, and the request stands for
//! the cross product of all alternatives:
//!
//! ```text
//!   Subject(s1)  Resource(r1, r2)  Action(a1, a2, a3)
//!        │              │                  │
//!        ▼              ▼                  ▼
//!   1 × 2 × 3 = 6 individual requests
//!   (s1,r1,a1) (s1,r2,a1) (s1,r1,a2) (s1,r2,a2) (s1,r1,a3) (s1,r2,a3)
//! ```

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::builder::DecisionRequestBuilder;
use crate::category::{CategoryGroup, CategoryParser, RawCategory, StandardCategoryParser};
use crate::error::{RequestError, Result};
use crate::request::IndividualDecisionRequest;

/// Expands a wire-level request into individual decision requests.
pub trait RequestExpander: Send + Sync {
    /// Expands `occurrences` (in wire order).
    ///
    /// Any parse failure aborts the whole expansion; partial results are
    /// never returned.
    fn expand(
        &self,
        occurrences: &[RawCategory],
        return_policy_id_list: bool,
    ) -> Result<Vec<IndividualDecisionRequest>>;
}

/// Groups items by category id, preserving first-seen category order and
/// the order of items within a category.
fn bucket_by_category<'a, T>(
    items: impl IntoIterator<Item = (&'a str, T)>,
) -> Vec<(&'a str, Vec<T>)> {
    let mut buckets: Vec<(&str, Vec<T>)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();
    for (category, item) in items {
        let position = *positions.entry(category).or_insert_with(|| {
            buckets.push((category, Vec::new()));
            buckets.len() - 1
        });
        buckets[position].1.push(item);
    }
    buckets
}

// ============================================================================
// Multiple Decision Profile
// ============================================================================

/// Expander implementing the Multiple Decision Profile (repeated categories).
#[derive(Debug, Clone)]
pub struct MultipleDecisionExpander<P = StandardCategoryParser> {
    parser: P,
}

impl<P: CategoryParser> MultipleDecisionExpander<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: CategoryParser> RequestExpander for MultipleDecisionExpander<P> {
    fn expand(
        &self,
        occurrences: &[RawCategory],
        return_policy_id_list: bool,
    ) -> Result<Vec<IndividualDecisionRequest>> {
        let mut groups: Vec<CategoryGroup> = Vec::with_capacity(occurrences.len());
        for occurrence in occurrences {
            let group = self.parser.parse(occurrence)?;
            if group.is_empty() {
                debug!(category = %occurrence.category_id, "Dropping empty category occurrence");
                continue;
            }
            groups.push(group);
        }

        let categories = bucket_by_category(
            groups
                .iter()
                .enumerate()
                .map(|(i, group)| (group.category_id(), i)),
        );

        let mut builders = vec![DecisionRequestBuilder::new(return_policy_id_list)];
        for (category, alternatives) in &categories {
            debug!(category = %category, alternatives = alternatives.len(), "Expanding category");

            // A category may carry content only once, whatever the alternatives.
            let with_content = alternatives
                .iter()
                .filter(|&&i| groups[i].content().is_some())
                .count();
            if with_content > 1 {
                warn!(
                    category = %category,
                    alternatives = with_content,
                    "Content repeated across alternatives"
                );
                return Err(RequestError::DuplicateContent {
                    category: (*category).to_string(),
                });
            }

            let Some((first, rest)) = alternatives.split_first() else {
                continue;
            };
            let before = if rest.is_empty() {
                Vec::new()
            } else {
                builders.clone()
            };

            for builder in &mut builders {
                builder.put_group(groups[*first].clone())?;
            }
            for &alternative in rest {
                for base in &before {
                    let mut branch = base.clone();
                    branch.put_group(groups[alternative].clone())?;
                    builders.push(branch);
                }
            }
        }

        debug!(
            requests = builders.len(),
            categories = categories.len(),
            "Expanded multiple decision request"
        );
        Ok(builders
            .into_iter()
            .map(DecisionRequestBuilder::build)
            .collect())
    }
}

// ============================================================================
// Single decision
// ============================================================================

/// Expander for deployments without the Multiple Decision Profile: every
/// occurrence of a category is merged into one, and exactly one individual
/// request comes out.
#[derive(Debug, Clone)]
pub struct SingleDecisionExpander<P = StandardCategoryParser> {
    parser: P,
}

impl<P: CategoryParser> SingleDecisionExpander<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }
}

impl<P: CategoryParser> RequestExpander for SingleDecisionExpander<P> {
    fn expand(
        &self,
        occurrences: &[RawCategory],
        return_policy_id_list: bool,
    ) -> Result<Vec<IndividualDecisionRequest>> {
        let categories = bucket_by_category(
            occurrences
                .iter()
                .map(|occurrence| (occurrence.category_id.as_str(), occurrence)),
        );

        let mut builder = DecisionRequestBuilder::new(return_policy_id_list);
        for (category, occurrences) in &categories {
            let group = self.parser.parse_merged(category, occurrences)?;
            if group.is_empty() {
                debug!(category = %category, "Dropping empty category");
                continue;
            }
            builder.put_group(group)?;
        }

        debug!(
            categories = categories.len(),
            attributes = builder.attribute_count(),
            "Built single decision request"
        );
        Ok(vec![builder.build()])
    }
}
