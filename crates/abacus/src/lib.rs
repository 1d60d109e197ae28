//! # Abacus
//!
//! The request-side core of an XACML 3.0 attribute-based access control
//! decision point.
//!
//! Abacus turns the tokenized categories of a wire-level request into
//! individual decision requests, and resolves the policy references the
//! evaluation engine meets along the way:
//!
//! - **Attribute merging** - repeated attributes under Strict or Lax rules
//! - **Multiple Decision Profile** - repeated categories expand into the
//!   cross product of individual requests
//! - **Version matching** - `Version` / `EarliestVersion` / `LatestVersion`
//!   constraints over dotted policy versions
//! - **Reference resolution** - cycle and depth checked, memoized per
//!   process or per request
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                            Abacus                              │
//! │  ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌─────────────┐  │
//! │  │  Config  │ → │  Merger  │ → │ Expander │ → │ Individual  │  │
//! │  │ (layers) │   │ (bags)   │   │  (MDP)   │   │  requests   │  │
//! │  └──────────┘   └──────────┘   └──────────┘   └──────┬──────┘  │
//! │                                                      ▼         │
//! │                 ┌──────────┐   ┌──────────┐   ┌─────────────┐  │
//! │                 │ Versions │ ← │ Resolver │ ← │ (evaluator) │  │
//! │                 └──────────┘   └──────────┘   └─────────────┘  │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use abacus::{AbacusConfig, RawAttribute, RawCategory, RequestPipeline, ids};
//!
//! let pipeline = RequestPipeline::from_config(&AbacusConfig::default())?;
//!
//! let requests = pipeline.expand(
//!     &[
//!         RawCategory::new(ids::CATEGORY_ACCESS_SUBJECT)
//!             .with_attribute(RawAttribute::string(ids::SUBJECT_ID, ["alice"])),
//!         RawCategory::new(ids::CATEGORY_RESOURCE)
//!             .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["doc1"])),
//!         RawCategory::new(ids::CATEGORY_RESOURCE)
//!             .with_attribute(RawAttribute::string(ids::RESOURCE_ID, ["doc2"])),
//!     ],
//!     true,
//! )?;
//! assert_eq!(requests.len(), 2);
//! # Ok::<(), abacus::AbacusError>(())
//! ```

mod error;
mod pipeline;


pub use error::{AbacusError, Result};
pub use pipeline::RequestPipeline;

// Re-export configuration
pub use abacus_config::{AbacusConfig, ConfigError, ConfigLoader, PolicyConfig, RequestConfig};

// Re-export core types
pub use abacus_types::{
    AttributeKey, AttributeSource, AttributeValue, Bag, BagError, ContentHandle, Datatype,
    ErrorKind, GrowableBag, XPathContext, ids,
};

// Re-export version algebra
pub use abacus_version::{
    PatternToken, PolicyVersion, VersionConstraint, VersionError, VersionPattern,
};

// Re-export request normalization
pub use abacus_request::{
    AttributeMerger, CategoryEcho, CategoryGroup, CategoryParser, DecisionRequestBuilder,
    EchoedAttribute, IndividualDecisionRequest, MergePolicy, MultipleDecisionExpander,
    RawAttribute, RawCategory, RequestError, RequestExpander, SingleDecisionExpander,
    StandardCategoryParser, StandardValueFactory, ValueFactory,
};

// Re-export policy resolution
pub use abacus_policy::{
    ContextualPolicyLookup, ContextualPolicyResolver, EvaluationContext, InMemoryPolicyStore,
    MaxDepth, PolicyDocument, PolicyError, PolicyLookup, PolicyReference, PolicyResolver,
    PolicyType, ReferenceChain, ResolvedPolicy, StaticPolicyResolver, join_chains,
};
