//! Policy(Set) reference resolution.
//!
//! ```text
//!   resolve(PolicySet "root", constraint, chain = [])
//!        │
//!        ├─ lookup versions ──▶ latest version matching the constraint
//!        │
//!        ├─ join_chains([], ["root"]) ──▶ cycle / depth check
//!        │
//!        └─ resolve each reference with chain ["root"]
//!              ├─ Policy "p1"          (leaf)
//!              └─ PolicySet "child"    (descends with ["root", "child"])
//! ```
//!
//! Resolved trees are memoized. A [`StaticPolicyResolver`] shares its memo
//! across all requests; a [`ContextualPolicyResolver`] keeps it in the
//! [`EvaluationContext`] of one request. A memoized tree is reused under a
//! different caller chain only after checking that its descent still fits.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use abacus_request::IndividualDecisionRequest;
use abacus_version::{PolicyVersion, VersionConstraint};
use tracing::{debug, warn};

use crate::chain::{MaxDepth, ReferenceChain, join_chains};
use crate::document::{PolicyDocument, PolicyReference, PolicyType};
use crate::error::{PolicyError, Result};
use crate::provider::{ContextualPolicyLookup, PolicyLookup};

// ============================================================================
// ResolvedPolicy
// ============================================================================

/// A policy or policy set with all of its references resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPolicy {
    document: Arc<PolicyDocument>,
    children: Vec<Arc<ResolvedPolicy>>,
    /// Longest run of policy set ids appended to the chain below this node.
    descent_depth: usize,
    /// Every policy set id appended to the chain anywhere below this node.
    descent_ids: BTreeSet<String>,
}

impl ResolvedPolicy {
    fn leaf(document: Arc<PolicyDocument>) -> Self {
        Self {
            document,
            children: Vec::new(),
            descent_depth: 0,
            descent_ids: BTreeSet::new(),
        }
    }

    fn branch(document: Arc<PolicyDocument>, children: Vec<Arc<ResolvedPolicy>>) -> Self {
        let mut descent_ids = BTreeSet::from([document.id().to_string()]);
        let mut deepest = 0;
        for child in &children {
            deepest = deepest.max(child.descent_depth);
            descent_ids.extend(child.descent_ids.iter().cloned());
        }
        Self {
            document,
            children,
            descent_depth: deepest + 1,
            descent_ids,
        }
    }

    pub fn document(&self) -> &Arc<PolicyDocument> {
        &self.document
    }

    pub fn policy_type(&self) -> PolicyType {
        self.document.policy_type()
    }

    pub fn id(&self) -> &str {
        self.document.id()
    }

    pub fn version(&self) -> &PolicyVersion {
        self.document.version()
    }

    /// Resolved references, in the order the policy set declares them.
    pub fn children(&self) -> &[Arc<ResolvedPolicy>] {
        &self.children
    }

    /// Number of policy set ids this tree appends to the chain on its
    /// deepest path.
    pub fn descent_depth(&self) -> usize {
        self.descent_depth
    }

    /// The distinct `(id, version)` pairs of the tree, depth first.
    pub fn policy_ids(&self) -> Vec<(&str, &PolicyVersion)> {
        let mut ids = Vec::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids<'a>(&'a self, ids: &mut Vec<(&'a str, &'a PolicyVersion)>) {
        let entry = (self.id(), self.version());
        if !ids.contains(&entry) {
            ids.push(entry);
        }
        for child in &self.children {
            child.collect_ids(ids);
        }
    }

    /// Checks that descending this tree below `chain` stays acyclic and
    /// within `max_depth`.
    pub fn check_fits(&self, chain: &ReferenceChain, max_depth: MaxDepth) -> Result<()> {
        if let Some(id) = self.descent_ids.iter().find(|id| chain.contains(id)) {
            warn!(id = %id, chain = %chain, "Memoized policy set would close a reference cycle");
            return Err(PolicyError::ReferenceCycle {
                id: id.clone(),
                chain: chain.clone(),
            });
        }
        if let MaxDepth::Bounded(max) = max_depth
            && chain.len() + self.descent_depth > max
        {
            warn!(
                id = %self.id(),
                chain = %chain,
                max,
                "Memoized policy set is too deep for this chain"
            );
            return Err(PolicyError::DepthExceeded {
                id: self.id().to_string(),
                chain: chain.clone(),
                max,
            });
        }
        Ok(())
    }
}

// ============================================================================
// Evaluation context
// ============================================================================

/// Memo key: what a reference asks for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionKey {
    pub policy_type: PolicyType,
    pub id: String,
    pub constraint: VersionConstraint,
}

impl ResolutionKey {
    pub fn new(
        policy_type: PolicyType,
        id: impl Into<String>,
        constraint: VersionConstraint,
    ) -> Self {
        Self {
            policy_type,
            id: id.into(),
            constraint,
        }
    }
}

impl From<&PolicyReference> for ResolutionKey {
    fn from(reference: &PolicyReference) -> Self {
        Self::new(reference.policy_type, reference.id.clone(), reference.constraint.clone())
    }
}

/// Resolutions memoized for one request. A `None` entry records a miss.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    entries: HashMap<ResolutionKey, Option<Arc<ResolvedPolicy>>>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &ResolutionKey) -> Option<&Option<Arc<ResolvedPolicy>>> {
        self.entries.get(key)
    }

    /// Records `resolved` unless `key` already has an entry, and returns
    /// the entry.
    pub fn get_or_insert(
        &mut self,
        key: ResolutionKey,
        resolved: Option<Arc<ResolvedPolicy>>,
    ) -> Option<Arc<ResolvedPolicy>> {
        self.entries.entry(key).or_insert(resolved).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Per-request state handed to resolvers during evaluation.
///
/// Owned by the worker evaluating one individual request and dropped with
/// it, so nothing cached here leaks into another request.
#[derive(Debug, Clone)]
pub struct EvaluationContext {
    request: Arc<IndividualDecisionRequest>,
    cache: ResolutionCache,
}

impl EvaluationContext {
    pub fn new(request: impl Into<Arc<IndividualDecisionRequest>>) -> Self {
        Self {
            request: request.into(),
            cache: ResolutionCache::new(),
        }
    }

    pub fn request(&self) -> &IndividualDecisionRequest {
        &self.request
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }
}

// ============================================================================
// Resolution walk
// ============================================================================

/// Where a resolution walk gets candidates from and memoizes results to.
trait ResolutionSource {
    fn candidates(&self, policy_type: PolicyType, id: &str) -> Vec<Arc<PolicyDocument>>;
    fn memoized(&self, key: &ResolutionKey) -> Option<Option<Arc<ResolvedPolicy>>>;
    /// Stores `resolved` unless an entry already exists; returns the stored
    /// entry so every caller sees the same tree.
    fn memoize(
        &mut self,
        key: ResolutionKey,
        resolved: Option<Arc<ResolvedPolicy>>,
    ) -> Option<Arc<ResolvedPolicy>>;
}

/// The latest candidate satisfying `constraint`.
fn select_version(
    candidates: Vec<Arc<PolicyDocument>>,
    constraint: &VersionConstraint,
) -> Option<Arc<PolicyDocument>> {
    candidates
        .into_iter()
        .filter(|doc| constraint.matches(doc.version()))
        .max_by(|a, b| a.version().cmp(b.version()))
}

fn resolve_with<S: ResolutionSource>(
    source: &mut S,
    key: ResolutionKey,
    chain: &ReferenceChain,
    max_depth: MaxDepth,
) -> Result<Option<Arc<ResolvedPolicy>>> {
    if let Some(memoized) = source.memoized(&key) {
        debug!(policy_type = %key.policy_type, id = %key.id, "Resolution cache hit");
        if let Some(resolved) = &memoized {
            resolved.check_fits(chain, max_depth)?;
        }
        return Ok(memoized);
    }

    let candidates = source.candidates(key.policy_type, &key.id);
    debug!(
        policy_type = %key.policy_type,
        id = %key.id,
        candidates = candidates.len(),
        constraint = %key.constraint,
        "Looked up policy"
    );
    let Some(document) = select_version(candidates, &key.constraint) else {
        return Ok(source.memoize(key, None));
    };

    let resolved = if document.references().is_empty() {
        ResolvedPolicy::leaf(document)
    } else {
        let descent = join_chains(chain, &[document.id()], max_depth)?;
        let mut children = Vec::with_capacity(document.references().len());
        for reference in document.references() {
            match resolve_with(source, ResolutionKey::from(reference), &descent, max_depth)? {
                Some(child) => children.push(child),
                None => {
                    warn!(
                        parent = %document.id(),
                        reference = %reference,
                        "Unresolved policy reference"
                    );
                    return Err(PolicyError::UnresolvedReference {
                        reference: reference.clone(),
                        parent: document.id().to_string(),
                    });
                }
            }
        }
        ResolvedPolicy::branch(document, children)
    };

    Ok(source.memoize(key, Some(Arc::new(resolved))))
}

// ============================================================================
// Resolvers
// ============================================================================

/// Resolves policy references during evaluation.
pub trait PolicyResolver: Send + Sync {
    /// Resolves the latest `policy_type` `id` matching `constraint`, with
    /// `chain` the policy sets already descended through.
    ///
    /// Returns `Ok(None)` if nothing matches. A reference nested inside the
    /// resolved policy set that matches nothing is an error.
    fn resolve(
        &self,
        policy_type: PolicyType,
        id: &str,
        constraint: &VersionConstraint,
        chain: &ReferenceChain,
        context: &mut EvaluationContext,
    ) -> Result<Option<Arc<ResolvedPolicy>>>;

    /// Whether results are independent of the request, and so reusable
    /// across evaluations.
    fn is_static(&self) -> bool;

    fn resolve_reference(
        &self,
        reference: &PolicyReference,
        chain: &ReferenceChain,
        context: &mut EvaluationContext,
    ) -> Result<Option<Arc<ResolvedPolicy>>> {
        self.resolve(reference.policy_type, &reference.id, &reference.constraint, chain, context)
    }
}

type Memo = HashMap<ResolutionKey, Option<Arc<ResolvedPolicy>>>;

/// Resolver over a request-independent lookup.
///
/// The same `(type, id, constraint)` always resolves to the same tree, so
/// results are memoized once and shared by all evaluations.
#[derive(Debug)]
pub struct StaticPolicyResolver<L> {
    lookup: L,
    max_depth: MaxDepth,
    memo: RwLock<Memo>,
}

impl<L: PolicyLookup> StaticPolicyResolver<L> {
    pub fn new(lookup: L, max_depth: MaxDepth) -> Self {
        Self {
            lookup,
            max_depth,
            memo: RwLock::new(HashMap::new()),
        }
    }

    pub fn max_depth(&self) -> MaxDepth {
        self.max_depth
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    /// Resolves without an evaluation context.
    pub fn resolve_static(
        &self,
        policy_type: PolicyType,
        id: &str,
        constraint: &VersionConstraint,
        chain: &ReferenceChain,
    ) -> Result<Option<Arc<ResolvedPolicy>>> {
        let mut source = StaticSource {
            lookup: &self.lookup,
            memo: &self.memo,
        };
        resolve_with(
            &mut source,
            ResolutionKey::new(policy_type, id, constraint.clone()),
            chain,
            self.max_depth,
        )
    }
}

impl<L: PolicyLookup> PolicyResolver for StaticPolicyResolver<L> {
    fn resolve(
        &self,
        policy_type: PolicyType,
        id: &str,
        constraint: &VersionConstraint,
        chain: &ReferenceChain,
        _context: &mut EvaluationContext,
    ) -> Result<Option<Arc<ResolvedPolicy>>> {
        self.resolve_static(policy_type, id, constraint, chain)
    }

    fn is_static(&self) -> bool {
        true
    }
}

struct StaticSource<'a, L> {
    lookup: &'a L,
    memo: &'a RwLock<Memo>,
}

impl<L: PolicyLookup> ResolutionSource for StaticSource<'_, L> {
    fn candidates(&self, policy_type: PolicyType, id: &str) -> Vec<Arc<PolicyDocument>> {
        self.lookup.lookup_versions(policy_type, id)
    }

    fn memoized(&self, key: &ResolutionKey) -> Option<Option<Arc<ResolvedPolicy>>> {
        // The memo only ever gains complete entries, so a poisoned lock
        // still holds consistent data.
        self.memo
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn memoize(
        &mut self,
        key: ResolutionKey,
        resolved: Option<Arc<ResolvedPolicy>>,
    ) -> Option<Arc<ResolvedPolicy>> {
        self.memo
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key)
            .or_insert(resolved)
            .clone()
    }
}

/// Resolver over a lookup that may depend on the request.
///
/// Results are memoized in the [`EvaluationContext`] only, so they stay
/// consistent within one request and are never reused by another.
#[derive(Debug)]
pub struct ContextualPolicyResolver<L> {
    lookup: L,
    max_depth: MaxDepth,
}

impl<L: ContextualPolicyLookup> ContextualPolicyResolver<L> {
    pub fn new(lookup: L, max_depth: MaxDepth) -> Self {
        Self { lookup, max_depth }
    }

    pub fn max_depth(&self) -> MaxDepth {
        self.max_depth
    }

    pub fn lookup(&self) -> &L {
        &self.lookup
    }
}

impl<L: ContextualPolicyLookup> PolicyResolver for ContextualPolicyResolver<L> {
    fn resolve(
        &self,
        policy_type: PolicyType,
        id: &str,
        constraint: &VersionConstraint,
        chain: &ReferenceChain,
        context: &mut EvaluationContext,
    ) -> Result<Option<Arc<ResolvedPolicy>>> {
        let mut source = ContextualSource {
            lookup: &self.lookup,
            request: &context.request,
            cache: &mut context.cache,
        };
        resolve_with(
            &mut source,
            ResolutionKey::new(policy_type, id, constraint.clone()),
            chain,
            self.max_depth,
        )
    }

    fn is_static(&self) -> bool {
        false
    }
}

struct ContextualSource<'a, L> {
    lookup: &'a L,
    request: &'a IndividualDecisionRequest,
    cache: &'a mut ResolutionCache,
}

impl<L: ContextualPolicyLookup> ResolutionSource for ContextualSource<'_, L> {
    fn candidates(&self, policy_type: PolicyType, id: &str) -> Vec<Arc<PolicyDocument>> {
        self.lookup.lookup_versions(policy_type, id, self.request)
    }

    fn memoized(&self, key: &ResolutionKey) -> Option<Option<Arc<ResolvedPolicy>>> {
        self.cache.get(key).cloned()
    }

    fn memoize(
        &mut self,
        key: ResolutionKey,
        resolved: Option<Arc<ResolvedPolicy>>,
    ) -> Option<Arc<ResolvedPolicy>> {
        self.cache.get_or_insert(key, resolved)
    }
}
