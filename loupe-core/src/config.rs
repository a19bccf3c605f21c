//! # Configuration management for Loupe Core
//!
//! Settings live in a TOML file under the user's config directory. The
//! `plugins` section carries one free-form table per plugin; those tables are
//! copied into the [`PluginContext`] at startup, where each plugin reads its
//! own section and writes its defaults back when the section is missing.
//!
//! Settings are resolved in the following order of priority:
//! 1. Command line arguments (highest priority)
//! 2. Configuration file
//! 3. Default values (lowest priority)

use crate::{Error, Result};
use loupe_plugin_api::PluginContext;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Main configuration structure for Loupe.
///
/// # Example
///
/// ```rust
/// use loupe_core::Config;
///
/// let config = Config::default();
/// assert_eq!(config.app.log_level, "info");
/// assert!(config.app.vault_root.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application-wide settings
    pub app: AppConfig,
    /// Plugin settings
    pub plugins: PluginConfig,
}

/// Application-wide configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Vault opened when no `--vault` argument is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vault_root: Option<PathBuf>,
    /// Canvas file opened when no `--canvas` argument is given
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_canvas: Option<PathBuf>,
    /// Log level: error, warn, info, debug or trace
    pub log_level: String,
}

/// Plugin configuration settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Plugin-specific settings, keyed by section name
    pub plugin_settings: HashMap<String, serde_json::Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            vault_root: None,
            default_canvas: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default location or create default config.
    ///
    /// If the file doesn't exist or can't be loaded, the default
    /// configuration is returned and written to the default location.
    pub fn load_or_default() -> Result<Self> {
        match Self::load() {
            Ok(config) => Ok(config),
            Err(e) => {
                tracing::debug!("using default configuration: {}", e);
                let config = Self::default();
                if let Err(e) = config.save() {
                    tracing::warn!("could not write default configuration: {}", e);
                }
                Ok(config)
            }
        }
    }

    /// Load configuration from the default config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path()?;
        Self::load_from_file(&config_path)
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use loupe_core::Config;
    /// use std::path::Path;
    ///
    /// let config = Config::load_from_file(Path::new("loupe.toml"))?;
    /// # Ok::<(), loupe_core::Error>(())
    /// ```
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default config file.
    pub fn save(&self) -> Result<()> {
        let config_path = Self::default_config_path()?;
        self.save_to_file(&config_path)
    }

    /// Save configuration to a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the file cannot
    /// be written.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.validate()?;

        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::config(format!("Failed to create config directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| Error::config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration values.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_core::Config;
    ///
    /// let mut config = Config::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.app.log_level = "loud".to_string();
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        if !LOG_LEVELS.contains(&self.app.log_level.as_str()) {
            return Err(Error::validation(
                "app.log_level",
                "Log level must be one of: error, warn, info, debug, trace",
            ));
        }

        if let Some(root) = &self.app.vault_root {
            if root.as_os_str().is_empty() {
                return Err(Error::validation(
                    "app.vault_root",
                    "Vault root must not be empty",
                ));
            }
        }

        if self.plugins.plugin_settings.keys().any(|k| k.trim().is_empty()) {
            return Err(Error::validation(
                "plugins.plugin_settings",
                "Plugin section names must not be empty",
            ));
        }

        Ok(())
    }

    /// The log level as a tracing level.
    pub fn log_level(&self) -> tracing::Level {
        self.app.log_level.parse().unwrap_or(tracing::Level::INFO)
    }

    /// Copy every plugin section into a plugin context.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_core::Config;
    /// use loupe_plugin_api::PluginContext;
    ///
    /// let mut config = Config::default();
    /// config
    ///     .plugins
    ///     .plugin_settings
    ///     .insert("canvas_preview".into(), serde_json::json!({ "settle_delay_ms": 80 }));
    ///
    /// let mut ctx = PluginContext::new();
    /// config.apply_to(&mut ctx);
    /// let section: serde_json::Value = ctx.get_config("canvas_preview").unwrap();
    /// assert_eq!(section["settle_delay_ms"], 80);
    /// ```
    pub fn apply_to(&self, ctx: &mut PluginContext) {
        for (section, value) in &self.plugins.plugin_settings {
            ctx.set_config(section, value);
        }
    }

    /// Get the default configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn default_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the configuration directory.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("loupe"))
            .ok_or_else(|| Error::config("Could not determine config directory"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.app.log_level, "info");
        assert_eq!(config.log_level(), tracing::Level::INFO);
        assert!(config.plugins.plugin_settings.is_empty());
    }

    #[test]
    fn test_config_validation_errors() {
        let mut config = Config::default();
        config.app.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        config = Config::default();
        config.app.vault_root = Some(PathBuf::new());
        assert!(config.validate().is_err());

        config = Config::default();
        config
            .plugins
            .plugin_settings
            .insert(" ".to_string(), serde_json::json!({}));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[app]\nvault_root = \"/notes\"\n").unwrap();
        assert_eq!(config.app.vault_root, Some(PathBuf::from("/notes")));
        assert_eq!(config.app.log_level, "info");
    }

    #[test]
    fn test_config_file_operations() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.app.log_level = "debug".to_string();
        config.plugins.plugin_settings.insert(
            "canvas_preview".to_string(),
            serde_json::json!({ "autosave_delay_ms": 500, "panel_region": "left" }),
        );

        assert!(config.save_to_file(&config_path).is_ok());
        assert!(config_path.exists());

        let loaded = Config::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.app.log_level, "debug");
        assert_eq!(loaded.log_level(), tracing::Level::DEBUG);
        assert_eq!(
            loaded.plugins.plugin_settings["canvas_preview"]["autosave_delay_ms"],
            500
        );
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        std::fs::write(&config_path, "[app]\nlog_level = \"loud\"\n").unwrap();

        let err = Config::load_from_file(&config_path).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_apply_to_context() {
        let mut config = Config::default();
        config
            .plugins
            .plugin_settings
            .insert("section".to_string(), serde_json::json!({ "value": 1 }));

        let mut ctx = PluginContext::new();
        config.apply_to(&mut ctx);

        let section: serde_json::Value = ctx.get_config("section").unwrap();
        assert_eq!(section["value"], 1);
    }
}
