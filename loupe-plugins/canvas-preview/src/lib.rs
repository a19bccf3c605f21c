//! # Loupe Canvas Preview Plugin
//!
//! Shows the note selected on a canvas in a side panel, and lets it be
//! edited in place.
//!
//! ## Features
//!
//! - Follows canvas clicks and previews a single selected file node
//! - One reusable preview panel, created on demand
//! - Preview and edit modes sharing one text buffer
//! - Debounced autosave, with a flush before every switch away
//! - Stale render results are discarded when the selection moves on
//!
//! ## Example
//!
//! ```rust
//! use loupe_canvas_preview::{CanvasPreviewPlugin, MarkdownRenderer, PreviewSession};
//! use loupe_plugin_api::testing::{MemoryPanelHost, MemoryStorage};
//! use loupe_plugin_api::{Plugin, PluginContext};
//! use std::sync::Arc;
//!
//! let mut plugin = CanvasPreviewPlugin::new(
//!     Arc::new(MemoryStorage::new()),
//!     Arc::new(MarkdownRenderer::new()),
//!     Arc::new(MemoryPanelHost::<PreviewSession>::new()),
//! );
//! let mut ctx = PluginContext::new();
//! plugin.initialize(&mut ctx)?;
//! assert_eq!(plugin.info().name, "canvas-preview");
//! assert_eq!(ctx.commands()[0].id, "open-note-preview");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod controller;
pub mod markdown;
pub mod session;
pub mod status;
pub mod timer;
pub mod view;
pub mod watcher;

pub use controller::{preview_panel_kind, PanelController};
pub use markdown::MarkdownRenderer;
pub use session::{PreviewSession, SessionSnapshot};
pub use status::{Mode, SaveStatus};
pub use timer::DebounceTimer;
pub use view::PreviewPanelView;
pub use watcher::{SelectionSink, SelectionSnapshot, SelectionWatcher};

use async_trait::async_trait;
use loupe_plugin_api::{
    CanvasSurface, CommandInfo, EventSender, PanelHost, PanelRegion, Plugin, PluginContext,
    PluginInfo, Renderer, Result, Storage,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Identifier of the preview panel kind.
pub const VIEW_TYPE: &str = "canvas-note-preview";
/// Command that opens the preview panel.
pub const COMMAND_ID: &str = "open-note-preview";
pub const COMMAND_NAME: &str = "Open note preview panel";
/// Configuration section read by the plugin.
pub const CONFIG_SECTION: &str = "canvas_preview";

/// Configuration for the canvas preview plugin
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewSettings {
    /// Wait after a click before reading the selection, in milliseconds
    pub settle_delay_ms: u64,
    /// Quiet period before an edit is saved, in milliseconds
    pub autosave_delay_ms: u64,
    /// Interval between checks for a lazily created canvas, in milliseconds
    pub attach_retry_ms: u64,
    /// Give up waiting for a canvas after this long; wait forever if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attach_timeout_ms: Option<u64>,
    /// Where a new preview panel is docked
    pub panel_region: PanelRegion,
}

impl Default for PreviewSettings {
    fn default() -> Self {
        Self {
            settle_delay_ms: 50,
            autosave_delay_ms: 2000,
            attach_retry_ms: 100,
            attach_timeout_ms: None,
            panel_region: PanelRegion::Right,
        }
    }
}

impl PreviewSettings {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    pub fn attach_retry(&self) -> Duration {
        Duration::from_millis(self.attach_retry_ms)
    }

    pub fn attach_timeout(&self) -> Option<Duration> {
        self.attach_timeout_ms.map(Duration::from_millis)
    }

    /// Reject settings the plugin cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.settle_delay_ms == 0 {
            anyhow::bail!("settle_delay_ms must be greater than zero");
        }
        if self.autosave_delay_ms == 0 {
            anyhow::bail!("autosave_delay_ms must be greater than zero");
        }
        if self.attach_retry_ms == 0 {
            anyhow::bail!("attach_retry_ms must be greater than zero");
        }
        if let Some(timeout) = self.attach_timeout_ms {
            if timeout < self.attach_retry_ms {
                anyhow::bail!(
                    "attach_timeout_ms ({}) is shorter than attach_retry_ms ({})",
                    timeout,
                    self.attach_retry_ms
                );
            }
        }
        Ok(())
    }
}

/// The canvas preview plugin
pub struct CanvasPreviewPlugin {
    settings: PreviewSettings,
    storage: Arc<dyn Storage>,
    renderer: Arc<dyn Renderer>,
    host: Arc<dyn PanelHost<PreviewSession>>,
    events: Option<EventSender>,
    controller: Option<PanelController>,
    watchers: parking_lot::Mutex<Vec<SelectionWatcher>>,
}

impl CanvasPreviewPlugin {
    pub fn new(
        storage: Arc<dyn Storage>,
        renderer: Arc<dyn Renderer>,
        host: Arc<dyn PanelHost<PreviewSession>>,
    ) -> Self {
        Self {
            settings: PreviewSettings::default(),
            storage,
            renderer,
            host,
            events: None,
            controller: None,
            watchers: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn settings(&self) -> &PreviewSettings {
        &self.settings
    }

    /// The panel controller, once initialized.
    pub fn controller(&self) -> Option<&PanelController> {
        self.controller.as_ref()
    }

    /// Surfaces currently watched.
    pub fn watcher_count(&self) -> usize {
        self.watchers.lock().len()
    }

    /// Stop every watcher and close the preview session, flushing unsaved
    /// changes.
    pub async fn close_all(&self) {
        let watchers: Vec<SelectionWatcher> = std::mem::take(&mut *self.watchers.lock());
        for watcher in watchers {
            watcher.detach().await;
        }
        if let Some(controller) = &self.controller {
            if let Some(session) = controller.current_session().await {
                session.close().await;
            }
        }
    }
}

#[async_trait]
impl Plugin for CanvasPreviewPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo::new(
            "canvas-preview",
            env!("CARGO_PKG_VERSION"),
            "Preview and edit the note selected on a canvas",
            "Loupe Team",
        )
        .with_min_core_version("0.1.0")
    }

    fn initialize(&mut self, ctx: &mut PluginContext) -> Result<()> {
        // Load configuration from context
        if let Some(settings) = ctx.get_config::<PreviewSettings>(CONFIG_SECTION) {
            self.settings = settings;
        } else {
            ctx.set_config(CONFIG_SECTION, &self.settings);
        }
        self.settings.validate()?;

        let events = ctx.events();
        self.controller = Some(PanelController::new(
            Arc::clone(&self.host),
            Arc::clone(&self.storage),
            Arc::clone(&self.renderer),
            self.settings.clone(),
            events.clone(),
        ));
        self.events = Some(events);
        ctx.register_command(CommandInfo::new(COMMAND_ID, COMMAND_NAME));

        tracing::info!(
            settle_ms = self.settings.settle_delay_ms,
            autosave_ms = self.settings.autosave_delay_ms,
            "Canvas preview plugin initialized"
        );
        Ok(())
    }

    async fn shutdown(&mut self, _ctx: &mut PluginContext) -> Result<()> {
        self.close_all().await;
        tracing::info!("Canvas preview plugin shut down");
        Ok(())
    }

    fn commands(&self) -> Vec<CommandInfo> {
        vec![CommandInfo::new(COMMAND_ID, COMMAND_NAME)]
    }

    async fn run_command(&self, command_id: &str) -> Result<()> {
        if command_id != COMMAND_ID {
            anyhow::bail!("unknown command: {command_id}");
        }
        let controller = self
            .controller
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("canvas preview plugin is not initialized"))?;
        controller.activate().await?;
        Ok(())
    }

    fn surface_activated(&self, surface: Arc<dyn CanvasSurface>) {
        let (Some(controller), Some(events)) = (&self.controller, &self.events) else {
            tracing::warn!("canvas surface activated before initialization");
            return;
        };

        let mut watchers = self.watchers.lock();
        watchers.retain(SelectionWatcher::is_active);
        let surface_id = surface.surface_id();
        if watchers.iter().any(|w| w.surface_id() == surface_id) {
            return;
        }

        let sink: Arc<dyn SelectionSink> = Arc::new(controller.clone());
        watchers.push(SelectionWatcher::attach(
            surface,
            &self.settings,
            sink,
            events.clone(),
        ));
    }

    async fn surface_closed(&self, surface_id: Uuid) {
        let watcher = {
            let mut watchers = self.watchers.lock();
            watchers
                .iter()
                .position(|w| w.surface_id() == surface_id)
                .map(|index| watchers.remove(index))
        };
        if let Some(watcher) = watcher {
            watcher.detach().await;
        }
    }
}
