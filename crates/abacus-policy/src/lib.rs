//! # abacus-policy: Policy lookup and reference resolution
//!
//! Resolves `PolicyIdReference` and `PolicySetIdReference` elements to stored
//! policies, picking the latest version that satisfies the reference's
//! version constraint, and following nested policy set references while
//! guarding against cycles and excessive nesting.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────┐     ┌───────────────────────────────┐
//! │  PolicyResolver      │────▶│  PolicyLookup                  │
//! │  ├─ Static           │     │  (InMemoryPolicyStore, ...)    │
//! │  └─ Contextual ──────┼────▶│  ContextualPolicyLookup        │
//! └──────────┬───────────┘     └───────────────────────────────┘
//!            │
//!            ▼
//! ┌──────────────────────┐     ┌───────────────────────────────┐
//! │  join_chains         │     │  EvaluationContext            │
//! │  cycle + depth check │     │  request + ResolutionCache    │
//! └──────────────────────┘     └───────────────────────────────┘
//! ```
//!
//! ## Examples
//!
//! ```
//! use abacus_policy::{
//!     InMemoryPolicyStore, MaxDepth, PolicyDocument, PolicyReference, PolicyType,
//!     ReferenceChain, StaticPolicyResolver,
//! };
//! use abacus_version::{PolicyVersion, VersionConstraint};
//!
//! let store = InMemoryPolicyStore::from_documents([
//!     PolicyDocument::policy_set(
//!         "root",
//!         PolicyVersion::parse("1.0").unwrap(),
//!         vec![PolicyReference::policy("read-docs")],
//!         "<PolicySet/>",
//!     ),
//!     PolicyDocument::policy("read-docs", PolicyVersion::parse("2.3").unwrap(), "<Policy/>"),
//! ])
//! .unwrap();
//!
//! let resolver = StaticPolicyResolver::new(store, MaxDepth::Bounded(8));
//! let root = resolver
//!     .resolve_static(
//!         PolicyType::PolicySet,
//!         "root",
//!         &VersionConstraint::any(),
//!         &ReferenceChain::new(),
//!     )
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(root.children()[0].version().as_str(), "2.3");
//! ```

mod chain;
mod document;
mod error;
mod provider;
mod resolver;


pub use chain::{MaxDepth, ReferenceChain, join_chains};
pub use document::{PolicyDocument, PolicyReference, PolicyType};
pub use error::{PolicyError, Result};
pub use provider::{ContextualPolicyLookup, InMemoryPolicyStore, PolicyLookup};
pub use resolver::{
    ContextualPolicyResolver, EvaluationContext, PolicyResolver, ResolutionCache, ResolutionKey,
    ResolvedPolicy, StaticPolicyResolver,
};
