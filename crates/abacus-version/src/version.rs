//! Literal policy versions.

use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VersionError};

/// A policy version: a non-empty sequence of non-negative integers written
/// in dotted form (`"1.0.3"`).
///
/// The original text is kept for display, so `parse(s).to_string() == s`.
/// Equality, hashing and ordering only look at the numbers.
///
/// # Ordering
///
/// Numbers are compared pairwise and the first difference decides. When one
/// sequence is a strict prefix of the other, the longer one is greater:
///
/// ```
/// use abacus_version::PolicyVersion;
///
/// let short: PolicyVersion = "1.0".parse().unwrap();
/// let long: PolicyVersion = "1.0.0".parse().unwrap();
/// assert!(short < long);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PolicyVersion {
    numbers: Vec<u64>,
    text: String,
}

impl PolicyVersion {
    /// Parses a dotted version string.
    ///
    /// # Errors
    ///
    /// [`VersionError::InvalidVersion`] on an empty string, an empty token
    /// (leading, trailing or doubled dot) or a token that is not a plain
    /// non-negative decimal integer.
    pub fn parse(input: &str) -> Result<Self> {
        let numbers = input
            .split('.')
            .map(parse_number)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|reason| VersionError::InvalidVersion {
                input: input.to_string(),
                reason,
            })?;

        Ok(Self {
            numbers,
            text: input.to_string(),
        })
    }

    pub(crate) fn from_numbers(numbers: Vec<u64>) -> Self {
        debug_assert!(!numbers.is_empty());
        let text = numbers
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(".");
        Self { numbers, text }
    }

    /// The number sequence, always non-empty.
    pub fn numbers(&self) -> &[u64] {
        &self.numbers
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Parses one dotted token as a non-negative integer.
///
/// Only ASCII digits are accepted; `u64::from_str` alone would let `+1`
/// through.
pub(crate) fn parse_number(token: &str) -> std::result::Result<u64, String> {
    if token.is_empty() {
        return Err("empty number".to_string());
    }
    if !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("'{token}' is not a non-negative integer"));
    }
    token
        .parse::<u64>()
        .map_err(|_| format!("'{token}' is out of range"))
}

impl PartialEq for PolicyVersion {
    fn eq(&self, other: &Self) -> bool {
        self.numbers == other.numbers
    }
}

impl Eq for PolicyVersion {}

impl Hash for PolicyVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.numbers.hash(state);
    }
}

impl Ord for PolicyVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Lexicographic slice ordering already ranks a strict prefix first.
        self.numbers.cmp(&other.numbers)
    }
}

impl PartialOrd for PolicyVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for PolicyVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for PolicyVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PolicyVersion {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<PolicyVersion> for String {
    fn from(version: PolicyVersion) -> Self {
        version.text
    }
}
