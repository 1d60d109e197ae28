//! # abacus-request: Request normalization
//!
//! Turns the tokenized categories of a wire-level XACML request into the
//! individual decision requests handed to the evaluation engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │  RawCategory occurrences (wire order)        │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  CategoryParser                              │
//! │  ├─ ValueFactory: raw text → typed values    │
//! │  └─ AttributeMerger: Strict / Lax policies   │
//! └─────────────────┬───────────────────────────┘
//!                   │  CategoryGroup per occurrence
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  RequestExpander                             │
//! │  ├─ bucket alternatives per category         │
//! │  └─ cross product via DecisionRequestBuilder │
//! └─────────────────┬───────────────────────────┘
//!                   │
//!                   ▼
//! ┌─────────────────────────────────────────────┐
//! │  Vec<IndividualDecisionRequest> (immutable)  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use std::sync::Arc;
//! use abacus_request::{
//!     AttributeMerger, MergePolicy, MultipleDecisionExpander, RawAttribute, RawCategory,
//!     RequestExpander, StandardCategoryParser, StandardValueFactory,
//! };
//! use abacus_types::ids;
//!
//! let merger = AttributeMerger::new(MergePolicy::LaxIssuerCopy, Arc::new(StandardValueFactory));
//! let expander = MultipleDecisionExpander::new(StandardCategoryParser::new(merger));
//!
//! let request = [
//!     RawCategory::new(ids::CATEGORY_ACCESS_SUBJECT)
//!         .with_attribute(RawAttribute::string(ids::SUBJECT_ID, ["alice"])),
//!     RawCategory::new(ids::CATEGORY_RESOURCE)
//!         .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["doc1"])),
//!     RawCategory::new(ids::CATEGORY_RESOURCE)
//!         .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["doc2"])),
//! ];
//!
//! let individual = expander.expand(&request, false).unwrap();
//! assert_eq!(individual.len(), 2);
//! ```

mod attributes;
mod builder;
mod category;
mod error;
mod expander;
mod merger;
mod request;
mod value;

#[cfg(test)]
mod tests;

pub use attributes::AttributeMap;
pub use builder::DecisionRequestBuilder;
pub use category::{
    CategoryEcho, CategoryGroup, CategoryParser, CategoryParts, EchoedAttribute, RawAttribute,
    RawCategory, StandardCategoryParser,
};
pub use error::{RequestError, Result};
pub use expander::{MultipleDecisionExpander, RequestExpander, SingleDecisionExpander};
pub use merger::{AttributeAccumulator, AttributeMerger, MergePolicy};
pub use request::IndividualDecisionRequest;
pub use value::{StandardValueFactory, ValueFactory};
