//! Configuration management for abacus
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (ABACUS_* prefix, `__` between sections)
//! 2. abacus.local.toml (gitignored, local overrides)
//! 3. abacus.toml (git-tracked, project config)
//! 4. ~/.config/abacus/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main abacus configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbacusConfig {
    pub request: RequestConfig,
    pub policies: PolicyConfig,
}

/// How wire-level requests are merged and expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Match attributes by issuer exactly; issuer-less designators then miss
    /// issued attributes.
    pub strict_attribute_issuer_match: bool,
    /// Allow an attribute to repeat within a category, concatenating values.
    pub allow_attribute_duplicates: bool,
    /// Expand repeated categories into several individual requests.
    pub multiple_decision_profile: bool,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            strict_attribute_issuer_match: false,
            allow_attribute_duplicates: true,
            multiple_decision_profile: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Maximum length of a policy set reference chain. Negative is unlimited.
    pub max_policy_set_ref_depth: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_policy_set_ref_depth: -1,
        }
    }
}

impl AbacusConfig {
    /// Load configuration from default locations
    pub fn load() -> Result<Self> {
        ConfigLoader::new().load()
    }

    /// Load configuration from specific project directory
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Self> {
        ConfigLoader::new().with_project_dir(project_dir).load()
    }

    /// Read a single TOML file, without the other layers.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::ParseError {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Create a configuration that rejects repeated attributes and matches
    /// issuers exactly
    pub fn strict() -> Self {
        Self {
            request: RequestConfig {
                strict_attribute_issuer_match: true,
                allow_attribute_duplicates: false,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Reject flag combinations no merge policy implements.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let request = &self.request;
        if !request.allow_attribute_duplicates && !request.strict_attribute_issuer_match {
            return Err(ConfigError::ValidationError(
                "request.allow_attribute_duplicates = false requires \
                 request.strict_attribute_issuer_match = true"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AbacusConfig::default();
        assert!(!config.request.strict_attribute_issuer_match);
        assert!(config.request.allow_attribute_duplicates);
        assert!(config.request.multiple_decision_profile);
        assert_eq!(config.policies.max_policy_set_ref_depth, -1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_strict_config_is_valid() {
        let config = AbacusConfig::strict();
        assert!(config.request.strict_attribute_issuer_match);
        assert!(!config.request.allow_attribute_duplicates);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicates_without_issuer_match_are_rejected() {
        let mut config = AbacusConfig::default();
        config.request.allow_attribute_duplicates = false;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert_eq!(err.kind(), abacus_types::ErrorKind::Configuration);
    }

    #[test]
    fn test_from_file() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("abacus.toml");
        fs::write(
            &path,
            r#"
[request]
multiple_decision_profile = false

[policies]
max_policy_set_ref_depth = 10
"#,
        )
        .expect("Failed to write config");

        let config = AbacusConfig::from_file(&path).expect("Failed to read config");
        assert!(!config.request.multiple_decision_profile);
        assert!(config.request.allow_attribute_duplicates);
        assert_eq!(config.policies.max_policy_set_ref_depth, 10);
    }

    #[test]
    fn test_from_file_errors() {
        let temp_dir = tempdir().expect("Failed to create temp dir");

        let missing = AbacusConfig::from_file(temp_dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));

        let path = temp_dir.path().join("broken.toml");
        fs::write(&path, "[request\n").expect("Failed to write config");
        assert!(matches!(
            AbacusConfig::from_file(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }
}
