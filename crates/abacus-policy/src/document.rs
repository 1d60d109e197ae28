//! Policies, policy sets and the references between them.

use std::fmt::Display;

use abacus_version::{PolicyVersion, VersionConstraint};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Whether a document (or a reference) names a `Policy` or a `PolicySet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PolicyType {
    Policy,
    PolicySet,
}

impl Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Policy => f.write_str("Policy"),
            Self::PolicySet => f.write_str("PolicySet"),
        }
    }
}

// ============================================================================
// PolicyReference
// ============================================================================

/// A `PolicyIdReference` or `PolicySetIdReference`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PolicyReference {
    pub policy_type: PolicyType,
    pub id: String,
    #[serde(default)]
    pub constraint: VersionConstraint,
}

impl PolicyReference {
    /// A `PolicyIdReference` matching any version.
    pub fn policy(id: impl Into<String>) -> Self {
        Self {
            policy_type: PolicyType::Policy,
            id: id.into(),
            constraint: VersionConstraint::any(),
        }
    }

    /// A `PolicySetIdReference` matching any version.
    pub fn policy_set(id: impl Into<String>) -> Self {
        Self {
            policy_type: PolicyType::PolicySet,
            id: id.into(),
            constraint: VersionConstraint::any(),
        }
    }

    pub fn with_constraint(mut self, constraint: VersionConstraint) -> Self {
        self.constraint = constraint;
        self
    }
}

impl Display for PolicyReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}IdReference '{}' ({})", self.policy_type, self.id, self.constraint)
    }
}

// ============================================================================
// PolicyDocument
// ============================================================================

/// A stored policy or policy set: the candidate a lookup returns.
///
/// Only policy sets carry references. The policy body is kept as opaque
/// bytes; interpreting it is up to the evaluation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDocument {
    policy_type: PolicyType,
    id: String,
    version: PolicyVersion,
    references: Vec<PolicyReference>,
    content: Bytes,
}

impl PolicyDocument {
    pub fn policy(
        id: impl Into<String>,
        version: PolicyVersion,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            policy_type: PolicyType::Policy,
            id: id.into(),
            version,
            references: Vec::new(),
            content: content.into(),
        }
    }

    /// A policy set whose children are `references`, in evaluation order.
    pub fn policy_set(
        id: impl Into<String>,
        version: PolicyVersion,
        references: Vec<PolicyReference>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            policy_type: PolicyType::PolicySet,
            id: id.into(),
            version,
            references,
            content: content.into(),
        }
    }

    pub fn policy_type(&self) -> PolicyType {
        self.policy_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn version(&self) -> &PolicyVersion {
        &self.version
    }

    pub fn references(&self) -> &[PolicyReference] {
        &self.references
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_deserializes_with_validated_constraint() {
        let json = r#"{
            "policy_type": "PolicySet",
            "id": "urn:example:ps",
            "constraint": { "earliest_version": "1.2", "latest_version": "1.+" }
        }"#;
        let reference: PolicyReference = serde_json::from_str(json).unwrap();
        assert_eq!(reference.policy_type, PolicyType::PolicySet);
        assert!(reference.constraint.matches(&PolicyVersion::parse("1.4").unwrap()));
        assert!(!reference.constraint.matches(&PolicyVersion::parse("1.1").unwrap()));
    }

    #[test]
    fn reference_with_inconsistent_constraint_is_rejected() {
        let json = r#"{
            "policy_type": "Policy",
            "id": "p",
            "constraint": { "earliest_version": "2.0", "latest_version": "1.0" }
        }"#;
        assert!(serde_json::from_str::<PolicyReference>(json).is_err());
    }

    #[test]
    fn reference_without_constraint_matches_any_version() {
        let reference: PolicyReference =
            serde_json::from_str(r#"{ "policy_type": "Policy", "id": "p" }"#).unwrap();
        assert_eq!(reference, PolicyReference::policy("p"));
        assert_eq!(reference.to_string(), "PolicyIdReference 'p' (any version)");
    }

    #[test]
    fn policies_have_no_references() {
        let doc = PolicyDocument::policy("p", PolicyVersion::parse("1.0").unwrap(), "<Policy/>");
        assert_eq!(doc.policy_type(), PolicyType::Policy);
        assert!(doc.references().is_empty());
        assert_eq!(doc.content().as_ref(), b"<Policy/>");
    }
}
