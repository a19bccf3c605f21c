//! # Loupe Plugin API
//!
//! This crate defines the contracts shared between the Loupe host and its
//! plugins. It covers the plugin lifecycle, the context handed to plugins,
//! the event channel, and the services a plugin consumes from its host:
//!
//! - **Panels**: [`PanelHost`] finds, creates, reveals and mounts side panels
//! - **Canvas**: [`CanvasSurface`] and [`Canvas`] expose the canvas selection
//!   and its click stream
//! - **Storage**: [`Storage`] reads and writes text resources
//! - **Rendering**: [`Renderer`] turns text into a [`RenderedDocument`]
//!
//! ## Example Plugin
//!
//! ```rust
//! use loupe_plugin_api::{CommandInfo, Plugin, PluginContext, PluginInfo};
//!
//! struct MyPlugin;
//!
//! impl Plugin for MyPlugin {
//!     fn info(&self) -> PluginInfo {
//!         PluginInfo::new(
//!             "My Plugin",
//!             "0.1.0",
//!             "A sample plugin",
//!             "Plugin Author",
//!         )
//!     }
//!
//!     fn initialize(&mut self, ctx: &mut PluginContext) -> anyhow::Result<()> {
//!         ctx.register_command(CommandInfo::new("say-hello", "Say hello"));
//!         Ok(())
//!     }
//! }
//! ```

pub mod canvas;
pub mod context;
pub mod event;
pub mod panel;
pub mod plugin;
pub mod resource;
pub mod service;
pub mod surface;

#[cfg(feature = "testing")]
pub mod testing;

pub use canvas::{Canvas, CanvasError, CanvasSurface, ClickEvent, Node, NodeId, NodeKind};
pub use context::PluginContext;
pub use event::{Event, EventSender, EventType};
pub use panel::{PanelError, PanelHandle, PanelHost, PanelKind, PanelRegion};
pub use plugin::{CommandInfo, Plugin, PluginInfo};
pub use resource::ResourceRef;
pub use service::{LoadError, RenderError, Renderer, SaveError, Storage};
pub use surface::{Block, Placeholder, PreviewContent, RenderedDocument};

/// Result type used throughout the plugin API
pub type Result<T> = std::result::Result<T, anyhow::Error>;
