//! Policy set reference chains.
//!
//! A chain records the policy set ids descended through from the resolution
//! root down to the policy set being resolved. Joining a chain with further
//! ids is where cycles and excessive nesting are caught.

use std::fmt::Display;

use tracing::warn;

use crate::error::{PolicyError, Result};

// ============================================================================
// ReferenceChain
// ============================================================================

/// Ordered policy set ids from the resolution root to the current policy set.
///
/// Chains only grow: [`join_chains`] returns a new chain and leaves its input
/// untouched, so every resolution call path owns its own snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ReferenceChain(Vec<String>);

impl ReferenceChain {
    /// The empty chain, used at the resolution root.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns true if `id` occurs anywhere in the chain.
    pub fn contains(&self, id: &str) -> bool {
        self.0.iter().any(|entry| entry == id)
    }

    /// The innermost policy set id.
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for ReferenceChain {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Display for ReferenceChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}

// ============================================================================
// MaxDepth
// ============================================================================

/// Upper bound on the length of a reference chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum MaxDepth {
    #[default]
    Unlimited,
    Bounded(usize),
}

impl MaxDepth {
    /// Maps the configured integer: any negative value means unlimited.
    pub fn from_config(value: i64) -> Self {
        usize::try_from(value).map_or(Self::Unlimited, Self::Bounded)
    }

    /// Returns true if a chain of `len` ids is within the bound.
    pub fn allows(self, len: usize) -> bool {
        match self {
            Self::Unlimited => true,
            Self::Bounded(max) => len <= max,
        }
    }
}

impl Display for MaxDepth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::Bounded(max) => write!(f, "{max}"),
        }
    }
}

// ============================================================================
// join_chains
// ============================================================================

/// Appends `extension` to a copy of `base`.
///
/// Each appended id must not already be on the growing chain (ids are
/// compared without regard to version), and the resulting chain must fit
/// within `max_depth`. An empty extension returns `base` unchanged.
///
/// # Errors
///
/// - [`PolicyError::ReferenceCycle`] naming the repeated id and the chain
///   built so far.
/// - [`PolicyError::DepthExceeded`] naming the id that crossed the bound.
pub fn join_chains<S: AsRef<str>>(
    base: &ReferenceChain,
    extension: &[S],
    max_depth: MaxDepth,
) -> Result<ReferenceChain> {
    let mut joined = base.clone();
    for id in extension {
        let id = id.as_ref();
        if joined.contains(id) {
            warn!(id = %id, chain = %joined, "Policy set reference cycle");
            return Err(PolicyError::ReferenceCycle {
                id: id.to_string(),
                chain: joined,
            });
        }
        if let MaxDepth::Bounded(max) = max_depth
            && joined.len() + 1 > max
        {
            warn!(id = %id, chain = %joined, max, "Policy set reference depth exceeded");
            return Err(PolicyError::DepthExceeded {
                id: id.to_string(),
                chain: joined,
                max,
            });
        }
        joined.0.push(id.to_string());
    }
    Ok(joined)
}
