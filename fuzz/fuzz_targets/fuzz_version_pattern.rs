#![no_main]

use abacus_version::{PolicyVersion, VersionConstraint, VersionPattern};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    version: String,
    pattern: String,
    earliest: Option<String>,
    latest: Option<String>,
}

fuzz_target!(|input: Input| {
    // Parsing must never panic, whatever the text.
    let version = PolicyVersion::parse(&input.version);
    let pattern = VersionPattern::parse(&input.pattern);

    if let Ok(version) = &version {
        // Display keeps the original text.
        assert_eq!(version.to_string(), input.version);
        assert_eq!(PolicyVersion::parse(version.as_str()).as_ref(), Ok(version));
    }

    if let (Ok(version), Ok(pattern)) = (&version, &pattern) {
        if pattern.matches(version) {
            assert!(pattern.is_earlier_or_matches(version));
            assert!(pattern.is_later_or_matches(version));
        }
        if let Some(literal) = pattern.to_literal() {
            assert_eq!(pattern.matches(version), &literal == version);
        }
    }

    if let Ok(constraint) = VersionConstraint::parse(
        Some(input.pattern.as_str()),
        input.earliest.as_deref(),
        input.latest.as_deref(),
    ) && let Ok(version) = &version
    {
        let matched = constraint.matches(version);
        if matched {
            assert!(constraint.version().is_none_or(|p| p.matches(version)));
        }
    }
});
