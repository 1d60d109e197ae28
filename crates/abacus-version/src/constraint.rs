//! Version constraints attached to policy references.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VersionError};
use crate::pattern::VersionPattern;
use crate::version::PolicyVersion;

/// The `Version`, `EarliestVersion` and `LatestVersion` attributes of a
/// `PolicyIdReference`/`PolicySetIdReference`.
///
/// An absent pattern matches every version. The three patterns are checked
/// for mutual consistency at construction, so a constraint that can never
/// match is rejected before any request is processed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ConstraintFields", into = "ConstraintFields")]
pub struct VersionConstraint {
    version: Option<VersionPattern>,
    earliest: Option<VersionPattern>,
    latest: Option<VersionPattern>,
}

impl VersionConstraint {
    /// The constraint that matches every version.
    pub fn any() -> Self {
        Self::default()
    }

    /// Builds a constraint, validating its patterns against each other.
    ///
    /// # Errors
    ///
    /// [`VersionError::InconsistentConstraint`] if:
    /// - `version` is literal and lies outside a literal `earliest`/`latest`
    ///   bound, or
    /// - `earliest` and `latest` are both literal and `earliest > latest`.
    pub fn new(
        version: Option<VersionPattern>,
        earliest: Option<VersionPattern>,
        latest: Option<VersionPattern>,
    ) -> Result<Self> {
        let literal = |p: &Option<VersionPattern>| p.as_ref().and_then(VersionPattern::to_literal);
        let (version_lit, earliest_lit, latest_lit) =
            (literal(&version), literal(&earliest), literal(&latest));

        if let Some(v) = &version_lit {
            if let Some(e) = &earliest_lit
                && v < e
            {
                return Err(VersionError::InconsistentConstraint {
                    reason: format!("Version '{v}' is earlier than EarliestVersion '{e}'"),
                });
            }
            if let Some(l) = &latest_lit
                && v > l
            {
                return Err(VersionError::InconsistentConstraint {
                    reason: format!("Version '{v}' is later than LatestVersion '{l}'"),
                });
            }
        }

        if let (Some(e), Some(l)) = (&earliest_lit, &latest_lit)
            && e > l
        {
            return Err(VersionError::InconsistentConstraint {
                reason: format!("EarliestVersion '{e}' is later than LatestVersion '{l}'"),
            });
        }

        Ok(Self {
            version,
            earliest,
            latest,
        })
    }

    /// Parses and validates a constraint from its three optional attributes.
    pub fn parse(
        version: Option<&str>,
        earliest: Option<&str>,
        latest: Option<&str>,
    ) -> Result<Self> {
        Self::new(
            version.map(VersionPattern::parse).transpose()?,
            earliest.map(VersionPattern::parse).transpose()?,
            latest.map(VersionPattern::parse).transpose()?,
        )
    }

    /// Constraint matching exactly one literal version.
    pub fn exact(version: &PolicyVersion) -> Self {
        Self {
            version: Some(VersionPattern::from(version)),
            earliest: None,
            latest: None,
        }
    }

    pub fn version(&self) -> Option<&VersionPattern> {
        self.version.as_ref()
    }

    pub fn earliest(&self) -> Option<&VersionPattern> {
        self.earliest.as_ref()
    }

    pub fn latest(&self) -> Option<&VersionPattern> {
        self.latest.as_ref()
    }

    pub fn is_unconstrained(&self) -> bool {
        self.version.is_none() && self.earliest.is_none() && self.latest.is_none()
    }

    /// Returns true if `version` satisfies all three patterns.
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        self.version.as_ref().is_none_or(|p| p.matches(version))
            && self
                .earliest
                .as_ref()
                .is_none_or(|p| p.is_earlier_or_matches(version))
            && self
                .latest
                .as_ref()
                .is_none_or(|p| p.is_later_or_matches(version))
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = [
            ("Version", &self.version),
            ("EarliestVersion", &self.earliest),
            ("LatestVersion", &self.latest),
        ];
        let mut first = true;
        for (name, pattern) in fields {
            if let Some(pattern) = pattern {
                if !first {
                    f.write_str(", ")?;
                }
                write!(f, "{name}={pattern}")?;
                first = false;
            }
        }
        if first {
            f.write_str("any version")?;
        }
        Ok(())
    }
}

/// Serialized form; deserialization re-runs the consistency checks.
#[derive(Serialize, Deserialize)]
struct ConstraintFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<VersionPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    earliest_version: Option<VersionPattern>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    latest_version: Option<VersionPattern>,
}

impl TryFrom<ConstraintFields> for VersionConstraint {
    type Error = VersionError;

    fn try_from(fields: ConstraintFields) -> Result<Self> {
        Self::new(fields.version, fields.earliest_version, fields.latest_version)
    }
}

impl From<VersionConstraint> for ConstraintFields {
    fn from(constraint: VersionConstraint) -> Self {
        Self {
            version: constraint.version,
            earliest_version: constraint.earliest,
            latest_version: constraint.latest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn v(s: &str) -> PolicyVersion {
        PolicyVersion::parse(s).unwrap()
    }

    #[test]
    fn unconstrained_matches_everything() {
        let any = VersionConstraint::any();
        assert!(any.is_unconstrained());
        assert!(any.matches(&v("0")));
        assert!(any.matches(&v("99.1.2")));
        assert_eq!(any.to_string(), "any version");
    }

    #[test_case(Some("1.*"), None, None, "1.4" => true; "version pattern only")]
    #[test_case(Some("1.*"), None, None, "2.4" => false; "version pattern mismatch")]
    #[test_case(None, Some("1.2"), Some("1.5"), "1.3" => true; "inside range")]
    #[test_case(None, Some("1.2"), Some("1.5"), "1.1" => false; "below earliest")]
    #[test_case(None, Some("1.2"), Some("1.5"), "1.6" => false; "above latest")]
    #[test_case(None, Some("1.2"), Some("1.5"), "1.5.1" => false; "longer than latest")]
    #[test_case(None, Some("1.2"), Some("1.+"), "1.9.9" => true; "open latest")]
    #[test_case(Some("1.+"), Some("1.3"), None, "1.2.9" => false; "all three must hold")]
    fn matches(
        version: Option<&str>,
        earliest: Option<&str>,
        latest: Option<&str>,
        candidate: &str,
    ) -> bool {
        VersionConstraint::parse(version, earliest, latest)
            .unwrap()
            .matches(&v(candidate))
    }

    #[test_case(Some("1.0"), Some("1.1"), None; "version before earliest")]
    #[test_case(Some("2.0"), None, Some("1.9"); "version after latest")]
    #[test_case(None, Some("2.0"), Some("1.0"); "earliest after latest")]
    #[test_case(None, Some("1.0.0"), Some("1.0"); "earliest longer than latest")]
    fn rejects_inconsistent(version: Option<&str>, earliest: Option<&str>, latest: Option<&str>) {
        let err = VersionConstraint::parse(version, earliest, latest).unwrap_err();
        assert!(
            matches!(err, VersionError::InconsistentConstraint { .. }),
            "unexpected error: {err}"
        );
        assert_eq!(err.kind(), abacus_types::ErrorKind::Configuration);
    }

    #[test]
    fn wildcard_bounds_are_not_cross_checked() {
        // Only literal bounds are compared at construction time.
        assert!(VersionConstraint::parse(Some("1.*"), Some("3.0"), None).is_ok());
    }

    #[test]
    fn pattern_errors_surface_as_syntax() {
        let err = VersionConstraint::parse(Some("1..2"), None, None).unwrap_err();
        assert_eq!(err.kind(), abacus_types::ErrorKind::Syntax);
    }

    #[test]
    fn exact_constraint() {
        let exact = VersionConstraint::exact(&v("1.2"));
        assert!(exact.matches(&v("1.2")));
        assert!(!exact.matches(&v("1.2.0")));
        assert_eq!(exact.to_string(), "Version=1.2");
    }

    #[test]
    fn display_lists_present_fields() {
        let c = VersionConstraint::parse(Some("1.+"), Some("1.1"), Some("1.9")).unwrap();
        assert_eq!(
            c.to_string(),
            "Version=1.+, EarliestVersion=1.1, LatestVersion=1.9"
        );
    }

    #[test]
    fn serialization_roundtrip_revalidates() {
        let c = VersionConstraint::parse(None, Some("1.0"), Some("2.*")).unwrap();
        let json = serde_json::to_string(&c).expect("serialize constraint");
        assert_eq!(json, r#"{"earliest_version":"1.0","latest_version":"2.*"}"#);
        let back: VersionConstraint = serde_json::from_str(&json).expect("deserialize constraint");
        assert_eq!(back, c);

        let bad = r#"{"earliest_version":"3.0","latest_version":"2.0"}"#;
        assert!(serde_json::from_str::<VersionConstraint>(bad).is_err());
    }
}
