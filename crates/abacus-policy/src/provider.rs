//! Policy lookup backends.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use abacus_request::IndividualDecisionRequest;
use abacus_version::PolicyVersion;
use tracing::debug;

use crate::document::{PolicyDocument, PolicyType};
use crate::error::{PolicyError, Result};

/// Finds stored policies by type and id, independently of any request.
///
/// Implementations are shared by every concurrent evaluation and must be
/// safe for concurrent reads.
pub trait PolicyLookup: Send + Sync {
    /// The latest stored version of `id`, if any.
    fn lookup(&self, policy_type: PolicyType, id: &str) -> Option<Arc<PolicyDocument>>;

    /// Every stored version of `id`, in ascending version order.
    ///
    /// Defaults to the single candidate returned by [`lookup`](Self::lookup).
    fn lookup_versions(&self, policy_type: PolicyType, id: &str) -> Vec<Arc<PolicyDocument>> {
        self.lookup(policy_type, id).into_iter().collect()
    }
}

/// Finds policies whose selection may depend on the request being evaluated.
///
/// Within one request, the same `(type, id)` must always yield the same
/// candidates.
pub trait ContextualPolicyLookup: Send + Sync {
    /// Every version of `id` visible to `request`, in ascending version order.
    fn lookup_versions(
        &self,
        policy_type: PolicyType,
        id: &str,
        request: &IndividualDecisionRequest,
    ) -> Vec<Arc<PolicyDocument>>;
}

// ============================================================================
// In-memory store
// ============================================================================

/// Policies held in memory, several versions per id.
///
/// Built once, then shared read-only.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPolicyStore {
    policies: HashMap<(PolicyType, String), BTreeMap<PolicyVersion, Arc<PolicyDocument>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `document`.
    ///
    /// # Errors
    ///
    /// [`PolicyError::DuplicatePolicy`] if the same type, id and version is
    /// already stored.
    pub fn insert(&mut self, document: PolicyDocument) -> Result<()> {
        let versions = self
            .policies
            .entry((document.policy_type(), document.id().to_string()))
            .or_default();
        if versions.contains_key(document.version()) {
            return Err(PolicyError::DuplicatePolicy {
                policy_type: document.policy_type(),
                id: document.id().to_string(),
                version: document.version().clone(),
            });
        }
        debug!(
            policy_type = %document.policy_type(),
            id = %document.id(),
            version = %document.version(),
            "Stored policy"
        );
        versions.insert(document.version().clone(), Arc::new(document));
        Ok(())
    }

    /// Builds a store from `documents`.
    pub fn from_documents(documents: impl IntoIterator<Item = PolicyDocument>) -> Result<Self> {
        let mut store = Self::new();
        for document in documents {
            store.insert(document)?;
        }
        Ok(store)
    }

    /// Number of stored documents, counting every version.
    pub fn len(&self) -> usize {
        self.policies.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }
}

impl PolicyLookup for InMemoryPolicyStore {
    fn lookup(&self, policy_type: PolicyType, id: &str) -> Option<Arc<PolicyDocument>> {
        self.policies
            .get(&(policy_type, id.to_string()))
            .and_then(|versions| versions.values().next_back())
            .cloned()
    }

    fn lookup_versions(&self, policy_type: PolicyType, id: &str) -> Vec<Arc<PolicyDocument>> {
        self.policies
            .get(&(policy_type, id.to_string()))
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl<L: PolicyLookup + ?Sized> PolicyLookup for Arc<L> {
    fn lookup(&self, policy_type: PolicyType, id: &str) -> Option<Arc<PolicyDocument>> {
        (**self).lookup(policy_type, id)
    }

    fn lookup_versions(&self, policy_type: PolicyType, id: &str) -> Vec<Arc<PolicyDocument>> {
        (**self).lookup_versions(policy_type, id)
    }
}
