//! # abacus-version: XACML policy version algebra
//!
//! Policy references select a policy by id and, optionally, by version
//! constraints. This crate implements the version model of XACML 3.0:
//!
//! - [`PolicyVersion`]: a literal dotted version (`1.0.3`), totally ordered
//!   with the "longer prefix is later" rule (`1.0 < 1.0.0`)
//! - [`VersionPattern`]: a dotted pattern with `*` (one arbitrary number)
//!   and a trailing `+` (any number of trailing numbers)
//! - [`VersionConstraint`]: the `Version` / `EarliestVersion` /
//!   `LatestVersion` triple, validated for consistency on construction
//!
//! ## Examples
//!
//! ```
//! use abacus_version::{PolicyVersion, VersionConstraint, VersionPattern};
//!
//! let pattern = VersionPattern::parse("1.*.3").unwrap();
//! assert!(pattern.matches(&PolicyVersion::parse("1.5.3").unwrap()));
//! assert!(!pattern.matches(&PolicyVersion::parse("1.5.4").unwrap()));
//!
//! let constraint = VersionConstraint::parse(None, Some("1.2"), Some("1.+")).unwrap();
//! assert!(constraint.matches(&PolicyVersion::parse("1.7.1").unwrap()));
//! assert!(!constraint.matches(&PolicyVersion::parse("1.1").unwrap()));
//! ```

mod constraint;
mod error;
mod pattern;
mod version;

// Kani proofs for bounded model checking
#[cfg(any(test, kani))]
mod kani_proofs;

#[cfg(test)]
mod tests;

pub use constraint::VersionConstraint;
pub use error::{Result, VersionError};
pub use pattern::{PatternToken, VersionPattern};
pub use version::PolicyVersion;
