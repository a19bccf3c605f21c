//! Core plugin trait and types for the Loupe plugin system.
//!
//! This module defines the main [`Plugin`] trait that all plugins must implement,
//! along with the metadata and command descriptors a plugin exposes to the host.

use crate::{CanvasSurface, PluginContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Plugin metadata information
///
/// Contains basic information about a plugin that is displayed
/// by the host and used for compatibility checks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    /// Plugin name (must be unique)
    pub name: String,
    /// Plugin version (semantic versioning)
    pub version: String,
    /// Brief description of the plugin's functionality
    pub description: String,
    /// Plugin author(s)
    pub author: String,
    /// Minimum Loupe core version required
    #[serde(default)]
    pub min_core_version: Option<String>,
}

impl PluginInfo {
    /// Create a new PluginInfo with minimal required fields
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::PluginInfo;
    ///
    /// let info = PluginInfo::new(
    ///     "my-plugin",
    ///     "1.0.0",
    ///     "A sample plugin",
    ///     "Plugin Author"
    /// );
    /// assert_eq!(info.name, "my-plugin");
    /// ```
    pub fn new(name: &str, version: &str, description: &str, author: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            description: description.to_string(),
            author: author.to_string(),
            min_core_version: None,
        }
    }

    /// Set the minimum required core version
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::PluginInfo;
    ///
    /// let info = PluginInfo::new("my-plugin", "1.0.0", "A plugin", "Author")
    ///     .with_min_core_version("0.1.0");
    /// ```
    pub fn with_min_core_version<S: Into<String>>(mut self, version: S) -> Self {
        self.min_core_version = Some(version.into());
        self
    }
}

/// A user-invocable command contributed by a plugin.
///
/// Commands take no arguments. The host lists them in its menus and calls
/// [`Plugin::run_command`] with the command id when one is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandInfo {
    /// Stable identifier, e.g. `open-note-preview`
    pub id: String,
    /// Human-readable name shown in menus
    pub name: String,
}

impl CommandInfo {
    /// Create a new command descriptor.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::CommandInfo;
    ///
    /// let command = CommandInfo::new("open-note-preview", "Open note preview panel");
    /// assert_eq!(command.id, "open-note-preview");
    /// ```
    pub fn new<S: Into<String>>(id: S, name: S) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The main trait that all Loupe plugins must implement.
///
/// This trait defines the lifecycle methods, the commands a plugin offers,
/// and the hooks through which the host announces canvas surfaces.
///
/// # Example
///
/// ```rust
/// use loupe_plugin_api::{Plugin, PluginInfo, PluginContext};
///
/// struct MyPlugin {
///     ready: bool,
/// }
///
/// impl Plugin for MyPlugin {
///     fn info(&self) -> PluginInfo {
///         PluginInfo::new(
///             "my-plugin",
///             "1.0.0",
///             "A simple example plugin",
///             "Plugin Developer"
///         )
///     }
///
///     fn initialize(&mut self, _ctx: &mut PluginContext) -> anyhow::Result<()> {
///         self.ready = true;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Returns metadata information about this plugin.
    fn info(&self) -> PluginInfo;

    /// Initialize the plugin.
    ///
    /// Called once when the plugin is first loaded. Use this method
    /// to read settings from the context and register commands.
    ///
    /// # Arguments
    ///
    /// * `ctx` - Plugin context providing access to configuration and events
    ///
    /// # Errors
    ///
    /// Return an error if initialization fails. The plugin will be marked
    /// as failed and will not be activated.
    fn initialize(&mut self, ctx: &mut PluginContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Shutdown the plugin.
    ///
    /// Called when the application is shutting down. Plugins holding unsaved
    /// user data must persist it before returning.
    async fn shutdown(&mut self, ctx: &mut PluginContext) -> Result<()> {
        let _ = ctx;
        Ok(())
    }

    /// Commands this plugin contributes to the host's menus.
    fn commands(&self) -> Vec<CommandInfo> {
        Vec::new()
    }

    /// Run one of the commands returned by [`Plugin::commands`].
    ///
    /// # Errors
    ///
    /// The default implementation knows no commands and always fails.
    async fn run_command(&self, command_id: &str) -> Result<()> {
        Err(anyhow::anyhow!("unknown command: {command_id}"))
    }

    /// Called when a canvas surface becomes active in the workspace.
    ///
    /// Hosts call this both for surfaces open at startup and for surfaces
    /// activated later, possibly more than once for the same surface.
    fn surface_activated(&self, surface: Arc<dyn CanvasSurface>) {
        let _ = surface;
    }

    /// Called when a canvas surface is torn down.
    async fn surface_closed(&self, surface_id: Uuid) {
        let _ = surface_id;
    }
}
