//! Configuration loading for `cem.toml`
//!
//! Every field has a default, so an empty file (or no file at all) is a
//! valid configuration.
//!
//! ```toml
//! use_transparent_parts = true
//! default_namespace = "minecraft"
//! max_expression_depth = 64
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::resource::DEFAULT_NAMESPACE;

/// Name of the configuration file searched for by [`find_config_from`].
pub const CONFIG_FILE_NAME: &str = "cem.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse cem.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// Model loading options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CemConfig {
    /// Wrap assembled parts so they follow the reference model's pose
    pub use_transparent_parts: bool,
    /// Namespace for locations written without one
    pub default_namespace: String,
    /// Deepest nesting accepted in an animation expression
    pub max_expression_depth: usize,
}

impl Default for CemConfig {
    fn default() -> Self {
        Self {
            use_transparent_parts: false,
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            max_expression_depth: 64,
        }
    }
}

impl CemConfig {
    /// Parse and validate configuration text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: CemConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Load `cem.toml` found by walking up from `start`, or the defaults
    /// when there is none.
    pub fn discover(start: &Path) -> Result<Self, ConfigError> {
        match find_config_from(start.to_path_buf()) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "using configuration file");
                Self::load(&path)
            }
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        if self.default_namespace.is_empty() {
            errors.push("default_namespace must not be empty".to_string());
        } else if !self
            .default_namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '_' | '-' | '.'))
        {
            errors.push(format!("default_namespace '{}' has characters outside [a-z0-9_.-]", self.default_namespace));
        }
        if self.max_expression_depth == 0 {
            errors.push("max_expression_depth must be at least 1".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// Find `cem.toml` by walking up from a directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_config_is_default() {
        let config = CemConfig::from_toml_str("").unwrap();
        assert_eq!(config, CemConfig::default());
        assert!(!config.use_transparent_parts);
        assert_eq!(config.default_namespace, "minecraft");
    }

    #[test]
    fn test_partial_config() {
        let config = CemConfig::from_toml_str("use_transparent_parts = true").unwrap();
        assert!(config.use_transparent_parts);
        assert_eq!(config.max_expression_depth, 64);
    }

    #[test]
    fn test_validation_collects_errors() {
        let err = CemConfig::from_toml_str("default_namespace = \"Bad NS\"\nmax_expression_depth = 0").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors.len(), 2),
            other => panic!("Expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_parse_error() {
        let err = CemConfig::from_toml_str("use_transparent_parts = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_discover_walks_up() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE_NAME), "use_transparent_parts = true\n").unwrap();
        let nested = temp.path().join("resourcepacks/pack");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_config_from(nested.clone()), Some(temp.path().join(CONFIG_FILE_NAME)));
        let config = CemConfig::discover(&nested).unwrap();
        assert!(config.use_transparent_parts);
    }

    #[test]
    fn test_discover_without_file_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let config = CemConfig::discover(temp.path());
        // A cem.toml further up the real filesystem would be picked up too
        assert!(config.is_ok());
    }
}
