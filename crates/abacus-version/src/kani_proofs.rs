//! Kani proofs for the version algebra
//!
//! These proofs check the ordering and matching rules over small, bounded
//! number sequences.
//!
//! Run with: `cargo kani --tests --harness verify_*`

#[cfg(kani)]
use crate::pattern::VersionPattern;
#[cfg(kani)]
use crate::version::PolicyVersion;

/// Property: a strict prefix always orders before the longer version.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_prefix_orders_first() {
    let a: u8 = kani::any();
    let b: u8 = kani::any();
    let tail: u8 = kani::any();

    let short = PolicyVersion::from_numbers(vec![u64::from(a), u64::from(b)]);
    let long = PolicyVersion::from_numbers(vec![u64::from(a), u64::from(b), u64::from(tail)]);

    assert!(short < long);
    assert!(long > short);
}

/// Property: a literal pattern matches exactly the version it denotes.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_literal_pattern_matches_only_itself() {
    let a: u8 = kani::any();
    let b: u8 = kani::any();
    let c: u8 = kani::any();
    let d: u8 = kani::any();

    let literal = PolicyVersion::from_numbers(vec![u64::from(a), u64::from(b)]);
    let other = PolicyVersion::from_numbers(vec![u64::from(c), u64::from(d)]);
    let pattern = VersionPattern::from(&literal);

    assert_eq!(pattern.matches(&other), literal == other);
}

/// Property: whenever a pattern matches, both bound checks accept too.
#[cfg(kani)]
#[kani::proof]
#[kani::unwind(5)]
fn verify_match_implies_bounds() {
    let a: u8 = kani::any();
    let b: u8 = kani::any();
    let version = PolicyVersion::from_numbers(vec![u64::from(a), u64::from(b)]);

    for text in ["1.*", "*.0", "1.+", "2.3"] {
        let Ok(pattern) = VersionPattern::parse(text) else {
            continue;
        };
        if pattern.matches(&version) {
            assert!(pattern.is_later_or_matches(&version));
            assert!(pattern.is_earlier_or_matches(&version));
        }
    }
}
