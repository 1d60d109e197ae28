//! Version patterns (`VersionMatchType` in XACML 3.0, section 5.13).

use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VersionError};
use crate::version::{PolicyVersion, parse_number};

/// One dotted field of a [`VersionPattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternToken {
    /// Matches exactly this number.
    Number(u64),
    /// `*`: matches exactly one arbitrary number.
    Wildcard,
    /// `+`: matches any number of trailing numbers, including none. Always
    /// the last token.
    Plus,
}

/// A version pattern such as `1.*.3` or `2.+`.
///
/// Three questions can be asked of a pattern about a [`PolicyVersion`]:
/// - [`matches`](Self::matches): does the version match the pattern?
/// - [`is_later_or_matches`](Self::is_later_or_matches): could some version
///   matching the pattern be later than or equal to it? (`LatestVersion`)
/// - [`is_earlier_or_matches`](Self::is_earlier_or_matches): could some
///   version matching the pattern be earlier than or equal to it?
///   (`EarliestVersion`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionPattern {
    tokens: Vec<PatternToken>,
    text: String,
}

impl VersionPattern {
    /// Parses a dotted pattern.
    ///
    /// # Errors
    ///
    /// [`VersionError::InvalidPattern`] on an empty token, a token that is
    /// neither a non-negative integer nor `*`/`+`, or a `+` that is not last.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: String| VersionError::InvalidPattern {
            input: input.to_string(),
            reason,
        };

        let fields: Vec<&str> = input.split('.').collect();
        let last = fields.len() - 1;
        let mut tokens = Vec::with_capacity(fields.len());
        for (i, field) in fields.into_iter().enumerate() {
            let token = match field {
                "*" => PatternToken::Wildcard,
                "+" if i == last => PatternToken::Plus,
                "+" => return Err(invalid("'+' is only allowed as the last field".to_string())),
                number => PatternToken::Number(parse_number(number).map_err(invalid)?),
            };
            tokens.push(token);
        }

        Ok(Self {
            tokens,
            text: input.to_string(),
        })
    }

    pub fn tokens(&self) -> &[PatternToken] {
        &self.tokens
    }

    /// True if the pattern contains neither `*` nor `+`.
    pub fn is_literal(&self) -> bool {
        self.tokens
            .iter()
            .all(|t| matches!(t, PatternToken::Number(_)))
    }

    /// The literal version this pattern denotes, if it has no `*`/`+`.
    pub fn to_literal(&self) -> Option<PolicyVersion> {
        self.tokens
            .iter()
            .map(|t| match t {
                PatternToken::Number(n) => Some(*n),
                PatternToken::Wildcard | PatternToken::Plus => None,
            })
            .collect::<Option<Vec<_>>>()
            .map(PolicyVersion::from_numbers)
    }

    /// Returns true if `version` matches this pattern.
    pub fn matches(&self, version: &PolicyVersion) -> bool {
        let mut numbers = version.numbers().iter();
        for token in &self.tokens {
            match (token, numbers.next()) {
                (PatternToken::Plus, _) => return true,
                (_, None) => return false,
                (PatternToken::Wildcard, Some(_)) => {}
                (PatternToken::Number(expected), Some(actual)) => {
                    if expected != actual {
                        return false;
                    }
                }
            }
        }
        numbers.next().is_none()
    }

    /// Returns true if `version` matches, or if some version matching this
    /// pattern is later than `version`.
    pub fn is_later_or_matches(&self, version: &PolicyVersion) -> bool {
        let mut numbers = version.numbers().iter();
        for token in &self.tokens {
            match (token, numbers.next()) {
                // Out of version numbers: every match is longer, hence later.
                (PatternToken::Plus | PatternToken::Wildcard, _) | (_, None) => return true,
                (PatternToken::Number(p), Some(n)) => {
                    if p != n {
                        return p > n;
                    }
                }
            }
        }
        // Pattern exhausted: a longer version is later than the pattern.
        numbers.next().is_none()
    }

    /// Returns true if `version` matches, or if some version matching this
    /// pattern is earlier than `version`.
    pub fn is_earlier_or_matches(&self, version: &PolicyVersion) -> bool {
        let mut numbers = version.numbers().iter();
        for token in &self.tokens {
            match (token, numbers.next()) {
                (PatternToken::Plus, _) => return true,
                // Every match is longer than the version, hence later.
                (_, None) => return false,
                // A wildcard can only go below a non-zero number.
                (PatternToken::Wildcard, Some(n)) => {
                    if *n != 0 {
                        return true;
                    }
                }
                (PatternToken::Number(p), Some(n)) => {
                    if p != n {
                        return p < n;
                    }
                }
            }
        }
        true
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl PartialEq for VersionPattern {
    fn eq(&self, other: &Self) -> bool {
        self.tokens == other.tokens
    }
}

impl Eq for VersionPattern {}

impl Hash for VersionPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.tokens.hash(state);
    }
}

impl Display for VersionPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

impl FromStr for VersionPattern {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for VersionPattern {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<VersionPattern> for String {
    fn from(pattern: VersionPattern) -> Self {
        pattern.text
    }
}

impl From<&PolicyVersion> for VersionPattern {
    fn from(version: &PolicyVersion) -> Self {
        Self {
            tokens: version
                .numbers()
                .iter()
                .map(|n| PatternToken::Number(*n))
                .collect(),
            text: version.to_string(),
        }
    }
}
