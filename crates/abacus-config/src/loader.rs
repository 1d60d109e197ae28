//! Configuration loader with multi-source merging

use crate::{AbacusConfig, Paths};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

/// Configuration loader with builder pattern
pub struct ConfigLoader {
    project_dir: PathBuf,
    env_prefix: String,
    env_override: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader with default project directory (current dir)
    pub fn new() -> Self {
        Self {
            project_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            env_prefix: "ABACUS".to_string(),
            env_override: None,
        }
    }

    /// Set the project directory
    pub fn with_project_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.project_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the environment variable prefix (default: "ABACUS")
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Read environment variables from `vars` instead of the process
    /// environment.
    pub fn with_env_vars(
        mut self,
        vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        self.env_override = Some(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        );
        self
    }

    /// Load configuration from all sources with proper precedence
    ///
    /// Missing files are skipped, so a tree without any configuration loads
    /// the built-in defaults. A file that fails to parse, or a merged
    /// configuration that fails [`AbacusConfig::validate`], is an error.
    pub fn load(self) -> Result<AbacusConfig> {
        let mut builder = config::Config::builder();

        // 1. Start with built-in defaults
        let defaults = AbacusConfig::default();
        builder = builder.add_source(config::Config::try_from(&defaults)?);

        // 2. User config (~/.config/abacus/config.toml)
        let paths = Paths::new();
        if let Ok(user_config_file) = paths.user_config_file()
            && user_config_file.exists()
        {
            builder = builder.add_source(
                config::File::from(user_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 3. Project config (abacus.toml)
        let project_config_file = Paths::project_config_file(&self.project_dir);
        if project_config_file.exists() {
            builder = builder.add_source(
                config::File::from(project_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 4. Local config (abacus.local.toml, gitignored)
        let local_config_file = Paths::local_config_file(&self.project_dir);
        if local_config_file.exists() {
            builder = builder.add_source(
                config::File::from(local_config_file)
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // 5. Environment variables (ABACUS_REQUEST__ALLOW_ATTRIBUTE_DUPLICATES=false)
        let environment = config::Environment::with_prefix(&self.env_prefix)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true);
        let environment = match self.env_override {
            Some(vars) => environment.source(Some(vars.into_iter().collect())),
            None => environment,
        };
        builder = builder.add_source(environment);

        // Build and deserialize
        let config = builder.build().context("Failed to build configuration")?;

        let abacus_config: AbacusConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        if let Err(err) = abacus_config.validate() {
            let message = format!("Configuration rejected: {err}");
            return Err(anyhow::Error::new(err).context(message));
        }

        Ok(abacus_config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
