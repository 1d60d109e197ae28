//! Property tests for the version algebra.

use proptest::prelude::*;

use crate::{PolicyVersion, VersionConstraint, VersionPattern};

fn numbers() -> impl Strategy<Value = Vec<u64>> {
    proptest::collection::vec(0u64..20, 1..6)
}

fn version(numbers: &[u64]) -> PolicyVersion {
    let text = numbers
        .iter()
        .map(u64::to_string)
        .collect::<Vec<_>>()
        .join(".");
    PolicyVersion::parse(&text).unwrap()
}

/// Patterns built from small literals, `*` and an optional trailing `+`.
fn pattern() -> impl Strategy<Value = VersionPattern> {
    (
        proptest::collection::vec(
            prop_oneof![(0u64..20).prop_map(|n| n.to_string()), Just("*".to_string())],
            1..5,
        ),
        any::<bool>(),
    )
        .prop_map(|(mut fields, plus)| {
            if plus {
                fields.push("+".to_string());
            }
            VersionPattern::parse(&fields.join(".")).unwrap()
        })
}

proptest! {
    /// Property: displaying a parsed version gives back the input string.
    #[test]
    fn prop_display_roundtrip(text in "[0-9]{1,6}(\\.[0-9]{1,6}){0,5}") {
        let parsed = PolicyVersion::parse(&text).unwrap();
        prop_assert_eq!(parsed.to_string(), text);
    }

    /// Property: extending a version always yields a strictly later version.
    #[test]
    fn prop_extension_is_later(
        base in numbers(),
        tail in proptest::collection::vec(0u64..20, 1..4)
    ) {
        let mut longer = base.clone();
        longer.extend(tail);
        prop_assert!(version(&base) < version(&longer));
        prop_assert!(version(&longer) > version(&base));
    }

    /// Property: ordering and equality agree.
    #[test]
    fn prop_ordering_consistent_with_eq(a in numbers(), b in numbers()) {
        let (va, vb) = (version(&a), version(&b));
        prop_assert_eq!(va.cmp(&vb) == std::cmp::Ordering::Equal, va == vb);
        prop_assert_eq!(va.cmp(&vb), vb.cmp(&va).reverse());
    }

    /// Property: a literal pattern matches exactly the equal version.
    #[test]
    fn prop_literal_pattern_is_equality(a in numbers(), b in numbers()) {
        let pattern = VersionPattern::from(&version(&a));
        prop_assert_eq!(pattern.matches(&version(&b)), a == b);
    }

    /// Property: a matching version also satisfies both bound checks.
    #[test]
    fn prop_match_implies_bounds(pattern in pattern(), v in numbers()) {
        let v = version(&v);
        if pattern.matches(&v) {
            prop_assert!(pattern.is_later_or_matches(&v));
            prop_assert!(pattern.is_earlier_or_matches(&v));
        }
    }

    /// Property: with literal bounds, a constraint is the closed interval
    /// `[earliest, latest]` under the version ordering.
    #[test]
    fn prop_literal_bounds_are_interval(e in numbers(), l in numbers(), v in numbers()) {
        let (ve, vl, vv) = (version(&e), version(&l), version(&v));
        prop_assume!(ve <= vl);

        let constraint = VersionConstraint::new(
            None,
            Some(VersionPattern::from(&ve)),
            Some(VersionPattern::from(&vl)),
        )
        .unwrap();
        prop_assert_eq!(constraint.matches(&vv), ve <= vv && vv <= vl);
    }
}
