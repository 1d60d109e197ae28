//! Configuration-driven request pipeline.

use std::sync::Arc;

use abacus_config::AbacusConfig;
use abacus_policy::{
    ContextualPolicyLookup, ContextualPolicyResolver, MaxDepth, PolicyLookup, StaticPolicyResolver,
};
use abacus_request::{
    AttributeMerger, IndividualDecisionRequest, MergePolicy, MultipleDecisionExpander,
    RawCategory, RequestExpander, SingleDecisionExpander, StandardCategoryParser,
    StandardValueFactory, ValueFactory,
};
use tracing::{debug, info};

use crate::error::Result;

/// The request side of a decision point, assembled from configuration.
///
/// The merge policy, expander and reference depth bound are fixed at
/// construction, so a bad configuration fails here and never while serving
/// requests. A pipeline holds no per-request state and can be shared by
/// every worker.
pub struct RequestPipeline {
    merge_policy: MergePolicy,
    multiple_decision_profile: bool,
    max_depth: MaxDepth,
    expander: Box<dyn RequestExpander>,
}

impl RequestPipeline {
    /// Builds the pipeline with the standard datatypes.
    pub fn from_config(config: &AbacusConfig) -> Result<Self> {
        Self::with_value_factory(config, Arc::new(StandardValueFactory))
    }

    /// Builds the pipeline with a custom value factory.
    pub fn with_value_factory(
        config: &AbacusConfig,
        factory: Arc<dyn ValueFactory>,
    ) -> Result<Self> {
        config.validate()?;
        let request = &config.request;
        let merge_policy = MergePolicy::from_flags(
            request.strict_attribute_issuer_match,
            request.allow_attribute_duplicates,
        )?;
        let max_depth = MaxDepth::from_config(config.policies.max_policy_set_ref_depth);

        let parser = StandardCategoryParser::new(AttributeMerger::new(merge_policy, factory));
        let expander: Box<dyn RequestExpander> = if request.multiple_decision_profile {
            Box::new(MultipleDecisionExpander::new(parser))
        } else {
            Box::new(SingleDecisionExpander::new(parser))
        };

        info!(
            merge_policy = ?merge_policy,
            multiple_decision_profile = request.multiple_decision_profile,
            max_policy_set_ref_depth = %max_depth,
            "Request pipeline configured"
        );
        Ok(Self {
            merge_policy,
            multiple_decision_profile: request.multiple_decision_profile,
            max_depth,
            expander,
        })
    }

    /// Expands a wire-level request into individual decision requests.
    pub fn expand(
        &self,
        occurrences: &[RawCategory],
        return_policy_id_list: bool,
    ) -> Result<Vec<IndividualDecisionRequest>> {
        let requests = self.expander.expand(occurrences, return_policy_id_list)?;
        debug!(
            occurrences = occurrences.len(),
            requests = requests.len(),
            "Expanded request"
        );
        Ok(requests)
    }

    pub fn merge_policy(&self) -> MergePolicy {
        self.merge_policy
    }

    pub fn multiple_decision_profile(&self) -> bool {
        self.multiple_decision_profile
    }

    pub fn max_policy_set_ref_depth(&self) -> MaxDepth {
        self.max_depth
    }

    /// A resolver over `lookup` bounded by the configured depth.
    pub fn static_resolver<L: PolicyLookup>(&self, lookup: L) -> StaticPolicyResolver<L> {
        StaticPolicyResolver::new(lookup, self.max_depth)
    }

    /// A request-dependent resolver over `lookup` bounded by the configured
    /// depth.
    pub fn contextual_resolver<L: ContextualPolicyLookup>(
        &self,
        lookup: L,
    ) -> ContextualPolicyResolver<L> {
        ContextualPolicyResolver::new(lookup, self.max_depth)
    }
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPipeline")
            .field("merge_policy", &self.merge_policy)
            .field("multiple_decision_profile", &self.multiple_decision_profile)
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}
