//! Policy configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::SafetyCategory;
use crate::error::PolicyError;
use crate::parser::DEFAULT_MAX_INPUT_BYTES;

/// Configuration for the safety engine.
///
/// Lists extend the built-in tables; they never replace them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Category for command lines the grammar rejects. Never `safe`.
    pub unparsed_category: SafetyCategory,

    /// Longer command lines are reported as unparsed.
    pub max_input_bytes: usize,

    /// Extra command names refused outright.
    pub denied_commands: Vec<String>,

    /// Extra command names treated as read-only.
    pub safe_commands: Vec<String>,

    /// Extra sensitive locations (absolute or `~`-relative).
    pub sensitive_paths: Vec<String>,

    /// Absolute roots that do not trip the absolute path rule,
    /// typically the project directory.
    pub allowed_paths: Vec<String>,

    /// Treat command names produced by expansion (`$CMD`) as unparsable.
    pub flag_dynamic_command_names: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            unparsed_category: SafetyCategory::Ambiguous,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            denied_commands: vec![],
            safe_commands: vec![],
            sensitive_paths: vec![],
            allowed_paths: vec![],
            flag_dynamic_command_names: true,
        }
    }
}

impl PolicyConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, PolicyError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Check the values a deserializer cannot check.
    pub fn validate(&self) -> Result<(), PolicyError> {
        if self.unparsed_category == SafetyCategory::Safe {
            return Err(PolicyError::InvalidConfig(
                "unparsed_category cannot be `safe`".to_string(),
            ));
        }
        if self.max_input_bytes == 0 {
            return Err(PolicyError::InvalidConfig(
                "max_input_bytes must be greater than zero".to_string(),
            ));
        }

        for (key, entries) in [
            ("denied_commands", &self.denied_commands),
            ("safe_commands", &self.safe_commands),
            ("sensitive_paths", &self.sensitive_paths),
            ("allowed_paths", &self.allowed_paths),
        ] {
            if entries.iter().any(|entry| entry.trim().is_empty()) {
                return Err(PolicyError::InvalidConfig(format!(
                    "{key} contains an empty entry"
                )));
            }
        }

        if let Some(name) = self
            .safe_commands
            .iter()
            .find(|name| self.denied_commands.contains(name))
        {
            return Err(PolicyError::InvalidConfig(format!(
                "`{name}` is listed in both denied_commands and safe_commands"
            )));
        }

        if let Some(path) = self
            .sensitive_paths
            .iter()
            .find(|path| !path.starts_with(['/', '~']))
        {
            return Err(PolicyError::InvalidConfig(format!(
                "sensitive path `{path}` must be absolute or start with `~`"
            )));
        }

        for path in &self.allowed_paths {
            if !path.starts_with('/') {
                return Err(PolicyError::InvalidConfig(format!(
                    "allowed path `{path}` must be absolute"
                )));
            }
            if path.trim_end_matches('/').is_empty() {
                return Err(PolicyError::InvalidConfig(
                    "allowed_paths cannot contain the filesystem root".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Set the category for unparsed input.
    pub fn with_unparsed_category(mut self, category: SafetyCategory) -> Self {
        self.unparsed_category = category;
        self
    }

    /// Set the input size limit.
    pub fn with_max_input_bytes(mut self, limit: usize) -> Self {
        self.max_input_bytes = limit;
        self
    }

    /// Add a command name to refuse.
    pub fn with_denied_command(mut self, name: impl Into<String>) -> Self {
        self.denied_commands.push(name.into());
        self
    }

    /// Add a read-only command name.
    pub fn with_safe_command(mut self, name: impl Into<String>) -> Self {
        self.safe_commands.push(name.into());
        self
    }

    /// Add a sensitive location.
    pub fn with_sensitive_path(mut self, path: impl Into<String>) -> Self {
        self.sensitive_paths.push(path.into());
        self
    }

    /// Add an absolute root exempt from the absolute path rule.
    pub fn with_allowed_path(mut self, path: impl Into<String>) -> Self {
        self.allowed_paths.push(path.into());
        self
    }
}
