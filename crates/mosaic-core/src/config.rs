//! Composition engine configuration
//!
//! Configuration can come from defaults, a TOML file, or environment
//! variables prefixed with `MOSAIC_`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{ComposeError, Result};

/// Environment variable overriding [`ComposeConfig::conflict_policy`]
pub const ENV_CONFLICT_POLICY: &str = "MOSAIC_CONFLICT_POLICY";

/// Environment variable overriding [`ComposeConfig::materialize_accessors`]
pub const ENV_MATERIALIZE_ACCESSORS: &str = "MOSAIC_MATERIALIZE_ACCESSORS";

/// What to do with a member conflict nobody resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictPolicy {
    /// Report the conflict and keep the last-merged member
    #[default]
    Warn,
    /// Report the conflict and fail the composition
    Fail,
}

impl std::str::FromStr for ConflictPolicy {
    type Err = ComposeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "warn" => Ok(Self::Warn),
            "fail" => Ok(Self::Fail),
            other => Err(ComposeError::invalid_config(format!(
                "unknown conflict policy `{other}` (expected `warn` or `fail`)"
            ))),
        }
    }
}

/// Settings consulted by a composer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposeConfig {
    /// Handling of unresolved member conflicts
    pub conflict_policy: ConflictPolicy,
    /// Copy inherited accessors onto each new instance as owned members
    pub materialize_accessors: bool,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Warn,
            materialize_accessors: true,
        }
    }
}

impl ComposeConfig {
    /// Strict configuration: unresolved conflicts fail the composition
    pub fn strict() -> Self {
        Self {
            conflict_policy: ConflictPolicy::Fail,
            ..Self::default()
        }
    }

    /// Parse from TOML text; absent keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ComposeError::invalid_config(format!(
                "failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Apply `MOSAIC_*` environment overrides
    pub fn merge_with_env(&mut self) -> Result<()> {
        if let Ok(policy) = std::env::var(ENV_CONFLICT_POLICY) {
            self.conflict_policy = policy.parse()?;
        }
        if let Ok(flag) = std::env::var(ENV_MATERIALIZE_ACCESSORS) {
            self.materialize_accessors = parse_flag(ENV_MATERIALIZE_ACCESSORS, &flag)?;
        }
        Ok(())
    }

    /// Take every field of `other` that differs from the default
    pub fn merge_with(&mut self, other: &Self) {
        let defaults = Self::default();
        if other.conflict_policy != defaults.conflict_policy {
            self.conflict_policy = other.conflict_policy;
        }
        if other.materialize_accessors != defaults.materialize_accessors {
            self.materialize_accessors = other.materialize_accessors;
        }
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ComposeError::invalid_config(format!(
            "{key} must be a boolean, got `{other}`"
        ))),
    }
}
