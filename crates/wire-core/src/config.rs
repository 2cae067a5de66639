//! Engine configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How structures are provided to the structure builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureMode {
    /// Reuse one process-wide layout engine.
    #[default]
    Singleton,
    /// Create an isolated layout engine per build.
    Fresh,
}

/// Configuration for the resolution engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Structure provider selection.
    pub structure: StructureMode,
    /// Store key of the resolver cache document.
    pub resolvers_cache_key: String,
    /// Sentinel handle identifying flake structures.
    pub flakes_handle: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            structure: StructureMode::default(),
            resolvers_cache_key: "wire_resolvers".to_string(),
            flakes_handle: "wire_flakes".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load config from a file (TOML, or JSON for `.json` paths).
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;

        if path.ends_with(".json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path))
        } else {
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path))
        }
    }

    /// Parse config from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Set the structure provider mode.
    pub fn with_structure(mut self, mode: StructureMode) -> Self {
        self.structure = mode;
        self
    }

    /// Set the resolver cache store key.
    pub fn with_resolvers_cache_key(mut self, key: impl Into<String>) -> Self {
        self.resolvers_cache_key = key.into();
        self
    }

    /// Set the flakes sentinel handle.
    pub fn with_flakes_handle(mut self, handle: impl Into<String>) -> Self {
        self.flakes_handle = handle.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.structure, StructureMode::Singleton);
        assert_eq!(config.resolvers_cache_key, "wire_resolvers");
        assert_eq!(config.flakes_handle, "wire_flakes");
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EngineConfig::from_toml_str("structure = \"fresh\"\n").unwrap();
        assert_eq!(config.structure, StructureMode::Fresh);
        assert_eq!(config.flakes_handle, "wire_flakes");
    }

    #[test]
    fn test_from_toml_rejects_unknown_mode() {
        assert!(EngineConfig::from_toml_str("structure = \"shared\"\n").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = EngineConfig::load("/nonexistent/wire.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
