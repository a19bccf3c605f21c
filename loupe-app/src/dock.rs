//! Panel host backed by the application's side panels.
//!
//! Panels live in a flat list in creation order. The app draws every
//! visible panel each frame in the region it was created for.

use async_trait::async_trait;
use loupe_canvas_preview::PreviewSession;
use loupe_plugin_api::{PanelError, PanelHandle, PanelHost, PanelKind, PanelRegion};
use parking_lot::Mutex;

struct DockPanel {
    handle: PanelHandle,
    region: PanelRegion,
    view: Option<PreviewSession>,
    visible: bool,
}

/// The app's [`PanelHost`].
#[derive(Default)]
pub struct DockHost {
    panels: Mutex<Vec<DockPanel>>,
}

impl DockHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible panels with their region and mounted session.
    pub fn visible_panels(&self) -> Vec<(PanelHandle, PanelRegion, Option<PreviewSession>)> {
        self.panels
            .lock()
            .iter()
            .filter(|p| p.visible)
            .map(|p| (p.handle.clone(), p.region, p.view.clone()))
            .collect()
    }

    /// Destroy a panel, returning its session so the caller can close it.
    pub fn close(&self, panel: &PanelHandle) -> Option<PreviewSession> {
        let mut panels = self.panels.lock();
        let index = panels.iter().position(|p| p.handle == *panel)?;
        let record = panels.remove(index);
        tracing::debug!(panel = %record.handle, "panel closed");
        record.view
    }

    pub fn len(&self) -> usize {
        self.panels.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PanelHost<PreviewSession> for DockHost {
    async fn find_existing_panels(&self, kind: &PanelKind) -> Vec<PanelHandle> {
        self.panels
            .lock()
            .iter()
            .filter(|p| p.handle.kind() == kind)
            .map(|p| p.handle.clone())
            .collect()
    }

    async fn create_panel(
        &self,
        kind: &PanelKind,
        region: PanelRegion,
    ) -> Result<PanelHandle, PanelError> {
        let handle = PanelHandle::new(kind.clone());
        self.panels.lock().push(DockPanel {
            handle: handle.clone(),
            region,
            view: None,
            visible: false,
        });
        tracing::debug!(panel = %handle, region = region.display_name(), "panel created");
        Ok(handle)
    }

    async fn reveal(&self, panel: &PanelHandle) -> Result<(), PanelError> {
        let mut panels = self.panels.lock();
        let record = panels
            .iter_mut()
            .find(|p| p.handle == *panel)
            .ok_or(PanelError::Gone(panel.id()))?;
        record.visible = true;
        Ok(())
    }

    async fn mount(&self, panel: &PanelHandle, view: PreviewSession) -> Result<(), PanelError> {
        let mut panels = self.panels.lock();
        let record = panels
            .iter_mut()
            .find(|p| p.handle == *panel)
            .ok_or(PanelError::Gone(panel.id()))?;
        record.view = Some(view);
        Ok(())
    }

    async fn view(&self, panel: &PanelHandle) -> Option<PreviewSession> {
        self.panels
            .lock()
            .iter()
            .find(|p| p.handle == *panel)
            .and_then(|p| p.view.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loupe_canvas_preview::{preview_panel_kind, MarkdownRenderer, PreviewSettings};
    use loupe_core::VaultStorage;
    use loupe_plugin_api::EventSender;
    use std::sync::Arc;

    fn session() -> PreviewSession {
        PreviewSession::new(
            Arc::new(VaultStorage::new(std::env::temp_dir())),
            Arc::new(MarkdownRenderer::new()),
            &PreviewSettings::default(),
            EventSender::new(),
        )
    }

    #[tokio::test]
    async fn test_panels_become_visible_on_reveal() {
        let dock = DockHost::new();
        let kind = preview_panel_kind();

        let handle = dock.create_panel(&kind, PanelRegion::Right).await.unwrap();
        assert!(dock.visible_panels().is_empty());
        assert_eq!(dock.len(), 1);

        dock.mount(&handle, session()).await.unwrap();
        dock.reveal(&handle).await.unwrap();
        let visible = dock.visible_panels();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].1, PanelRegion::Right);
        assert!(visible[0].2.is_some());
        assert_eq!(dock.find_existing_panels(&kind).await, vec![handle]);
    }

    #[tokio::test]
    async fn test_closed_panel_is_gone() {
        let dock = DockHost::new();
        let kind = preview_panel_kind();
        let handle = dock.create_panel(&kind, PanelRegion::Left).await.unwrap();
        dock.mount(&handle, session()).await.unwrap();

        assert!(dock.close(&handle).is_some());
        assert!(dock.is_empty());
        assert!(dock.view(&handle).await.is_none());
        assert!(matches!(
            dock.reveal(&handle).await,
            Err(PanelError::Gone(id)) if id == handle.id()
        ));
        assert!(dock.find_existing_panels(&kind).await.is_empty());
    }
}
