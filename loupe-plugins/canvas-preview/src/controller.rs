//! # Preview panel controller
//!
//! Finds or creates the single preview panel, keeps a handle to it, and
//! routes selected files into the session mounted there.

use crate::session::PreviewSession;
use crate::watcher::SelectionSink;
use crate::{PreviewSettings, VIEW_TYPE};
use async_trait::async_trait;
use loupe_plugin_api::{
    Event, EventSender, EventType, PanelError, PanelHandle, PanelHost, PanelKind, Renderer,
    ResourceRef, Storage,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

/// Kind of the panel hosting the preview.
pub fn preview_panel_kind() -> PanelKind {
    PanelKind::new(VIEW_TYPE, "Note preview")
}

struct ControllerInner {
    host: Arc<dyn PanelHost<PreviewSession>>,
    storage: Arc<dyn Storage>,
    renderer: Arc<dyn Renderer>,
    settings: PreviewSettings,
    events: EventSender,
    /// Last resolved panel; revalidated before every use
    panel: Mutex<Option<PanelHandle>>,
}

/// Owner of the preview panel's lifecycle.
///
/// Cloning is cheap; clones share the cached panel.
#[derive(Clone)]
pub struct PanelController {
    inner: Arc<ControllerInner>,
}

impl PanelController {
    pub fn new(
        host: Arc<dyn PanelHost<PreviewSession>>,
        storage: Arc<dyn Storage>,
        renderer: Arc<dyn Renderer>,
        settings: PreviewSettings,
        events: EventSender,
    ) -> Self {
        Self {
            inner: Arc::new(ControllerInner {
                host,
                storage,
                renderer,
                settings,
                events,
                panel: Mutex::new(None),
            }),
        }
    }

    /// Reveal the preview panel, creating it in the configured region if
    /// none exists. An existing panel is reused; a second one is never made.
    pub async fn activate(&self) -> Result<PanelHandle, PanelError> {
        let mut cached = self.inner.panel.lock().await;
        let handle = self.find_or_create().await?;
        self.inner.host.reveal(&handle).await?;
        *cached = Some(handle.clone());
        Ok(handle)
    }

    /// Bind `resource` to the preview panel's session, activating the panel
    /// first when it is missing.
    pub async fn show_resource(&self, resource: ResourceRef) -> Result<(), PanelError> {
        let session = self.resolve_session().await?;
        session.set_file(Some(resource)).await;
        Ok(())
    }

    /// Session of the cached panel, if the panel is still alive.
    pub async fn current_session(&self) -> Option<PreviewSession> {
        let handle = self.inner.panel.lock().await.clone()?;
        self.live_session(&handle).await
    }

    async fn resolve_session(&self) -> Result<PreviewSession, PanelError> {
        let cached = self.inner.panel.lock().await.clone();
        if let Some(handle) = cached {
            if let Some(session) = self.live_session(&handle).await {
                return Ok(session);
            }
            debug!(panel = %handle, "cached preview panel is gone");
        }

        let handle = self.activate().await?;
        self.inner
            .host
            .view(&handle)
            .await
            .ok_or(PanelError::NotMounted(handle.id()))
    }

    async fn live_session(&self, handle: &PanelHandle) -> Option<PreviewSession> {
        self.inner
            .host
            .view(handle)
            .await
            .filter(|session| !session.is_closed())
    }

    async fn find_or_create(&self) -> Result<PanelHandle, PanelError> {
        let kind = preview_panel_kind();
        let existing = self.inner.host.find_existing_panels(&kind).await;
        if let Some(handle) = existing.into_iter().next() {
            if self.live_session(&handle).await.is_none() {
                self.mount_new_session(&handle).await?;
            }
            debug!(panel = %handle, "reusing preview panel");
            return Ok(handle);
        }

        let region = self.inner.settings.panel_region;
        let handle = self.inner.host.create_panel(&kind, region).await?;
        self.mount_new_session(&handle).await?;
        info!(panel = %handle, region = region.display_name(), "created preview panel");
        self.inner.events.emit(
            Event::new(EventType::PanelOpened, handle.id().to_string())
                .with_meta("kind", kind.id()),
        );
        Ok(handle)
    }

    async fn mount_new_session(&self, handle: &PanelHandle) -> Result<(), PanelError> {
        let session = PreviewSession::new(
            Arc::clone(&self.inner.storage),
            Arc::clone(&self.inner.renderer),
            &self.inner.settings,
            self.inner.events.clone(),
        );
        self.inner.host.mount(handle, session).await
    }
}

#[async_trait]
impl SelectionSink for PanelController {
    async fn file_selected(&self, resource: ResourceRef) {
        if let Err(e) = self.show_resource(resource.clone()).await {
            error!(resource = %resource, "failed to show resource in preview panel: {}", e);
        }
    }
}
