//! Configuration management for Markdown Bridge
//!
//! Handles loading and managing configuration. Every value has a default, so a
//! missing configuration file is not an error.

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier used for the configuration directory
pub const APP_ID: &str = "markdown-bridge";

/// Configuration file name inside the configuration directory
pub const CONFIG_FILE: &str = "config.json";

/// Debounce window for outbound change notifications, in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// How long a text query waits for the embedded surface, in milliseconds
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 2000;

/// Namespace tagging the persisted Markdown region
pub const DEFAULT_NAMESPACE: &str = "urn:markdown-bridge:source";

/// Fenced code language promoted to a diagram container
pub const DEFAULT_DIAGRAM_KEYWORD: &str = "mermaid";

/// Class carried by promoted diagram containers
pub const DEFAULT_DIAGRAM_CLASS: &str = "mermaid";

/// Maximum file size to open (in bytes) - 10MB
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Channel and synchronization settings
    pub bridge: BridgeConfig,

    /// Rendering pipeline settings
    pub render: RenderConfig,

    /// Persistence region settings
    pub persistence: PersistenceConfig,

    /// File handling settings
    pub files: FileConfig,
}

impl Config {
    /// Load configuration from the default location or return defaults
    pub fn load() -> ConfigResult<Self> {
        let path = Self::config_dir()?.join(CONFIG_FILE);
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        let config: Self =
            serde_json::from_str(&raw).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the rest of the crate cannot work with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.persistence.namespace.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "persistence.namespace".into(),
                reason: "must not be empty".into(),
            });
        }
        let keyword = &self.render.diagram_keyword;
        if keyword.is_empty() || !keyword.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ConfigError::InvalidValue {
                key: "render.diagram_keyword".into(),
                reason: "must be a non-empty identifier".into(),
            });
        }
        if self.render.diagram_class.is_empty() || self.render.diagram_class.contains(&['"', '<', '>', ' '][..]) {
            return Err(ConfigError::InvalidValue {
                key: "render.diagram_class".into(),
                reason: "must be a single class name".into(),
            });
        }
        Ok(())
    }

    /// Get the configuration directory path
    pub fn config_dir() -> ConfigResult<PathBuf> {
        dirs::config_dir()
            .map(|p| p.join(APP_ID))
            .ok_or(ConfigError::DirectoryError)
    }
}

/// Host <-> surface channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Coalescing window for local edits in the surface
    pub debounce_ms: u64,

    /// Upper bound for the fallback text query
    pub query_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
        }
    }
}

/// Rendering pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Fenced code language treated as a diagram
    pub diagram_keyword: String,

    /// Class name given to promoted diagram containers
    pub diagram_class: String,

    /// Enable footnote syntax
    pub footnotes: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            diagram_keyword: DEFAULT_DIAGRAM_KEYWORD.to_string(),
            diagram_class: DEFAULT_DIAGRAM_CLASS.to_string(),
            footnotes: true,
        }
    }
}

/// Persistence region configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Namespace identifying the region
    pub namespace: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
        }
    }
}

/// File handling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Maximum file size to open (in bytes)
    pub max_file_size: u64,

    /// Watch the open file for external changes
    pub watch_files: bool,

    /// Debounce interval for watcher events in milliseconds
    pub watch_debounce_ms: u64,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            watch_files: true,
            watch_debounce_ms: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bridge.debounce_ms, 100);
        assert_eq!(config.render.diagram_keyword, "mermaid");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"bridge": {"debounce_ms": 250}}"#).unwrap();
        assert_eq!(config.bridge.debounce_ms, 250);
        assert_eq!(config.bridge.query_timeout_ms, DEFAULT_QUERY_TIMEOUT_MS);
        assert_eq!(config.persistence.namespace, DEFAULT_NAMESPACE);
    }

    #[test]
    fn test_empty_namespace_rejected() {
        let mut config = Config::default();
        config.persistence.namespace = "  ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"render": {"diagram_keyword": "graph"}}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.render.diagram_keyword, "graph");
        assert_eq!(config.render.diagram_class, DEFAULT_DIAGRAM_CLASS);
    }

    #[test]
    fn test_load_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError(_))));
    }
}
