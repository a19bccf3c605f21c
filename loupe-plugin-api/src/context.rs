//! Plugin context module providing configuration and services to plugins.
//!
//! The [`PluginContext`] is the interface through which plugins interact with
//! the Loupe host. It carries the per-plugin configuration sections, the
//! command registry and the event channel.

use crate::{CommandInfo, EventSender};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Context object providing plugins access to host services.
///
/// # Example
///
/// ```rust
/// use loupe_plugin_api::{Event, EventType, PluginContext};
///
/// fn my_plugin_function(ctx: &mut PluginContext) -> anyhow::Result<()> {
///     let delay: u64 = ctx.get_config("my_plugin.delay_ms").unwrap_or(50);
///     ctx.set_config("my_plugin.delay_ms", delay);
///
///     ctx.events().emit(Event::new(EventType::Custom, "configured"));
///     Ok(())
/// }
/// ```
pub struct PluginContext {
    /// Plugin configuration sections, keyed by section name
    config: HashMap<String, serde_json::Value>,
    /// Commands registered by plugins
    commands: Vec<CommandInfo>,
    /// Broadcast channel shared by every plugin and the host
    events: EventSender,
}

impl PluginContext {
    /// Create a new plugin context.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::PluginContext;
    ///
    /// let ctx = PluginContext::new();
    /// assert!(ctx.commands().is_empty());
    /// ```
    pub fn new() -> Self {
        Self {
            config: HashMap::new(),
            commands: Vec::new(),
            events: EventSender::new(),
        }
    }

    /// The event channel shared with the host.
    ///
    /// Plugins clone the sender into long-lived components so those can
    /// publish without holding the context.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }

    /// Register a command so the host can list it.
    ///
    /// Registering a command id twice replaces the earlier entry.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::{CommandInfo, PluginContext};
    ///
    /// let mut ctx = PluginContext::new();
    /// ctx.register_command(CommandInfo::new("open-note-preview", "Open note preview panel"));
    /// ctx.register_command(CommandInfo::new("open-note-preview", "Open preview"));
    /// assert_eq!(ctx.commands().len(), 1);
    /// assert_eq!(ctx.commands()[0].name, "Open preview");
    /// ```
    pub fn register_command(&mut self, command: CommandInfo) {
        if let Some(existing) = self.commands.iter_mut().find(|c| c.id == command.id) {
            *existing = command;
        } else {
            self.commands.push(command);
        }
    }

    /// All registered commands, in registration order.
    pub fn commands(&self) -> &[CommandInfo] {
        &self.commands
    }

    /// Get a configuration value.
    ///
    /// Returns the configuration value if it exists and can be deserialized
    /// to the requested type.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::PluginContext;
    ///
    /// let ctx = PluginContext::new();
    /// let delay: Option<u64> = ctx.get_config("canvas_preview.settle_delay_ms");
    /// assert!(delay.is_none());
    /// ```
    pub fn get_config<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        let value = self.config.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(section = key, "ignoring malformed config section: {}", e);
                None
            }
        }
    }

    /// Set a configuration value.
    ///
    /// # Example
    ///
    /// ```rust
    /// use loupe_plugin_api::PluginContext;
    ///
    /// let mut ctx = PluginContext::new();
    /// ctx.set_config("ui.font_size", 14.0f32);
    /// assert_eq!(ctx.get_config::<f32>("ui.font_size"), Some(14.0));
    /// ```
    pub fn set_config<T: Serialize>(&mut self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.config.insert(key.to_string(), json_value);
        }
    }
}

impl Default for PluginContext {
    fn default() -> Self {
        Self::new()
    }
}
