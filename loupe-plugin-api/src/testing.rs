//! In-memory collaborators for tests.
//!
//! Enabled with the `testing` feature. Every fake records what was asked of
//! it and supports failure injection, so plugin tests can drive the full
//! selection, panel, storage and render path without a GUI or a filesystem.

use crate::{
    Canvas, CanvasSurface, ClickEvent, LoadError, Node, PanelError, PanelHandle, PanelHost,
    PanelKind, PanelRegion, RenderError, RenderedDocument, Renderer, ResourceRef, SaveError,
    Storage,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Default)]
struct StorageState {
    files: HashMap<String, String>,
    writes: Vec<(String, String)>,
    write_attempts: usize,
    fail_writes: bool,
    unreadable: HashSet<String>,
    read_delay: Option<Duration>,
    write_delay: Option<Duration>,
}

/// Storage backed by a map, with a log of successful writes.
#[derive(Default)]
pub struct MemoryStorage {
    state: Mutex<StorageState>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`MemoryStorage::insert`].
    pub fn with_file(self, path: &str, text: &str) -> Self {
        self.insert(path, text);
        self
    }

    pub fn insert(&self, path: &str, text: &str) {
        self.state
            .lock()
            .files
            .insert(path.to_string(), text.to_string());
    }

    /// Current stored text of `path`.
    pub fn contents(&self, path: &str) -> Option<String> {
        self.state.lock().files.get(path).cloned()
    }

    /// Successful writes as `(path, text)`, oldest first.
    pub fn writes(&self) -> Vec<(String, String)> {
        self.state.lock().writes.clone()
    }

    pub fn write_count(&self) -> usize {
        self.state.lock().writes.len()
    }

    /// Writes started, including failed ones.
    pub fn write_attempts(&self) -> usize {
        self.state.lock().write_attempts
    }

    /// Make every following write fail until reset.
    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().fail_writes = fail;
    }

    /// Make reads of `path` fail even if it exists.
    pub fn make_unreadable(&self, path: &str) {
        self.state.lock().unreadable.insert(path.to_string());
    }

    pub fn set_read_delay(&self, delay: Duration) {
        self.state.lock().read_delay = Some(delay);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.state.lock().write_delay = Some(delay);
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, resource: &ResourceRef) -> Result<String, LoadError> {
        let delay = self.state.lock().read_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        if state.unreadable.contains(resource.path()) {
            return Err(LoadError::Backend {
                path: resource.path().to_string(),
                message: "unreadable".to_string(),
            });
        }
        state
            .files
            .get(resource.path())
            .cloned()
            .ok_or_else(|| LoadError::NotFound {
                path: resource.path().to_string(),
            })
    }

    async fn write(&self, resource: &ResourceRef, text: &str) -> Result<(), SaveError> {
        let delay = {
            let mut state = self.state.lock();
            state.write_attempts += 1;
            state.write_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        if state.fail_writes {
            return Err(SaveError::Backend {
                path: resource.path().to_string(),
                message: "injected write failure".to_string(),
            });
        }
        state
            .files
            .insert(resource.path().to_string(), text.to_string());
        state
            .writes
            .push((resource.path().to_string(), text.to_string()));
        Ok(())
    }
}

/// Wraps a renderer and delays rendering of selected resources.
pub struct SlowRenderer {
    inner: Arc<dyn Renderer>,
    delays: Mutex<HashMap<String, Duration>>,
    calls: Mutex<Vec<String>>,
}

impl SlowRenderer {
    pub fn new(inner: Arc<dyn Renderer>) -> Self {
        Self {
            inner,
            delays: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Delay every render of `path` by `delay`.
    pub fn delay(&self, path: &str, delay: Duration) {
        self.delays.lock().insert(path.to_string(), delay);
    }

    /// Paths rendered so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Renderer for SlowRenderer {
    async fn render(
        &self,
        text: &str,
        target: &mut RenderedDocument,
        source: &ResourceRef,
    ) -> Result<(), RenderError> {
        self.calls.lock().push(source.path().to_string());
        let delay = self.delays.lock().get(source.path()).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.render(text, target, source).await
    }
}

/// Renderer that always fails.
#[derive(Debug, Default)]
pub struct FailingRenderer;

#[async_trait]
impl Renderer for FailingRenderer {
    async fn render(
        &self,
        _text: &str,
        _target: &mut RenderedDocument,
        source: &ResourceRef,
    ) -> Result<(), RenderError> {
        Err(RenderError::Malformed {
            path: source.path().to_string(),
            message: "injected render failure".to_string(),
        })
    }
}

struct MemoryPanel<V> {
    handle: PanelHandle,
    region: PanelRegion,
    view: Option<V>,
}

struct HostState<V> {
    panels: Vec<MemoryPanel<V>>,
    created: usize,
    revealed: Vec<Uuid>,
    fail_create: bool,
}

/// Panel host that keeps panels in a list.
pub struct MemoryPanelHost<V> {
    state: Mutex<HostState<V>>,
}

impl<V: Clone> MemoryPanelHost<V> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HostState {
                panels: Vec::new(),
                created: 0,
                revealed: Vec::new(),
                fail_create: false,
            }),
        }
    }

    /// Add an empty panel as if restored from a saved layout.
    pub fn insert_panel(&self, kind: &PanelKind, region: PanelRegion) -> PanelHandle {
        let handle = PanelHandle::new(kind.clone());
        self.state.lock().panels.push(MemoryPanel {
            handle: handle.clone(),
            region,
            view: None,
        });
        handle
    }

    /// Destroy a panel as if the user closed it, returning its view.
    pub fn destroy(&self, panel: &PanelHandle) -> Option<V> {
        let mut state = self.state.lock();
        let index = state.panels.iter().position(|p| p.handle == *panel)?;
        state.panels.remove(index).view
    }

    /// Panels created through [`PanelHost::create_panel`].
    pub fn created_count(&self) -> usize {
        self.state.lock().created
    }

    pub fn panel_count(&self) -> usize {
        self.state.lock().panels.len()
    }

    /// Panel ids passed to [`PanelHost::reveal`], oldest first.
    pub fn revealed(&self) -> Vec<Uuid> {
        self.state.lock().revealed.clone()
    }

    pub fn region_of(&self, panel: &PanelHandle) -> Option<PanelRegion> {
        self.state
            .lock()
            .panels
            .iter()
            .find(|p| p.handle == *panel)
            .map(|p| p.region)
    }

    /// Mounted views of every panel, in host order.
    pub fn views(&self) -> Vec<V> {
        self.state
            .lock()
            .panels
            .iter()
            .filter_map(|p| p.view.clone())
            .collect()
    }

    pub fn fail_create(&self, fail: bool) {
        self.state.lock().fail_create = fail;
    }
}

impl<V: Clone> Default for MemoryPanelHost<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<V> PanelHost<V> for MemoryPanelHost<V>
where
    V: Clone + Send + Sync + 'static,
{
    async fn find_existing_panels(&self, kind: &PanelKind) -> Vec<PanelHandle> {
        self.state
            .lock()
            .panels
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
        let mut state = self.state.lock();
        if state.fail_create {
            return Err(PanelError::CreateFailed {
                kind: kind.id().to_string(),
                message: "injected failure".to_string(),
            });
        }
        let handle = PanelHandle::new(kind.clone());
        state.panels.push(MemoryPanel {
            handle: handle.clone(),
            region,
            view: None,
        });
        state.created += 1;
        Ok(handle)
    }

    async fn reveal(&self, panel: &PanelHandle) -> Result<(), PanelError> {
        let mut state = self.state.lock();
        if !state.panels.iter().any(|p| p.handle == *panel) {
            return Err(PanelError::Gone(panel.id()));
        }
        state.revealed.push(panel.id());
        Ok(())
    }

    async fn mount(&self, panel: &PanelHandle, view: V) -> Result<(), PanelError> {
        let mut state = self.state.lock();
        let record = state
            .panels
            .iter_mut()
            .find(|p| p.handle == *panel)
            .ok_or(PanelError::Gone(panel.id()))?;
        record.view = Some(view);
        Ok(())
    }

    async fn view(&self, panel: &PanelHandle) -> Option<V> {
        self.state
            .lock()
            .panels
            .iter()
            .find(|p| p.handle == *panel)
            .and_then(|p| p.view.clone())
    }
}

/// Canvas with a settable selection and a manual click trigger.
#[derive(Default)]
pub struct MemoryCanvas {
    selection: Mutex<Vec<Node>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<ClickEvent>>>,
}

impl MemoryCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_selection(&self, nodes: Vec<Node>) {
        *self.selection.lock() = nodes;
    }

    /// Deliver a click to every live subscriber, returning how many got it.
    pub fn click(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| tx.send(ClickEvent::at(0.0, 0.0)).is_ok());
        listeners.len()
    }

    /// Set the selection, then click.
    pub fn select_and_click(&self, nodes: Vec<Node>) -> usize {
        self.set_selection(nodes);
        self.click()
    }

    /// Subscribers whose receiving end is still alive.
    pub fn subscriber_count(&self) -> usize {
        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| !tx.is_closed());
        listeners.len()
    }

    /// End every click stream, as a torn-down canvas would.
    pub fn close(&self) {
        self.listeners.lock().clear();
    }
}

impl Canvas for MemoryCanvas {
    fn selection(&self) -> Vec<Node> {
        self.selection.lock().clone()
    }

    fn subscribe_clicks(&self) -> mpsc::UnboundedReceiver<ClickEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(tx);
        rx
    }
}

/// Canvas surface whose canvas appears when [`MemorySurface::initialize`]
/// is called.
pub struct MemorySurface {
    id: Uuid,
    canvas: Mutex<Option<Arc<MemoryCanvas>>>,
}

impl MemorySurface {
    /// A surface whose canvas is not initialized yet.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            canvas: Mutex::new(None),
        }
    }

    /// A surface with an initialized canvas.
    pub fn with_canvas(canvas: Arc<MemoryCanvas>) -> Self {
        let surface = Self::new();
        surface.initialize(canvas);
        surface
    }

    pub fn initialize(&self, canvas: Arc<MemoryCanvas>) {
        *self.canvas.lock() = Some(canvas);
    }
}

impl Default for MemorySurface {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasSurface for MemorySurface {
    fn surface_id(&self) -> Uuid {
        self.id
    }

    fn canvas(&self) -> Option<Arc<dyn Canvas>> {
        self.canvas
            .lock()
            .clone()
            .map(|canvas| canvas as Arc<dyn Canvas>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_logs_successful_writes_only() {
        let storage = MemoryStorage::new().with_file("a.md", "one");
        let a = ResourceRef::new("a.md");

        assert_eq!(storage.read(&a).await.unwrap(), "one");
        storage.fail_writes(true);
        assert!(storage.write(&a, "two").await.is_err());
        storage.fail_writes(false);
        storage.write(&a, "three").await.unwrap();

        assert_eq!(storage.write_attempts(), 2);
        assert_eq!(storage.writes(), vec![("a.md".to_string(), "three".to_string())]);
        assert_eq!(storage.contents("a.md").as_deref(), Some("three"));
    }

    #[tokio::test]
    async fn test_memory_storage_read_failures() {
        let storage = MemoryStorage::new().with_file("a.md", "one");
        storage.make_unreadable("a.md");

        assert!(matches!(
            storage.read(&ResourceRef::new("a.md")).await,
            Err(LoadError::Backend { .. })
        ));
        assert!(matches!(
            storage.read(&ResourceRef::new("b.md")).await,
            Err(LoadError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_memory_canvas_drops_closed_subscribers() {
        let canvas = MemoryCanvas::new();
        let rx = canvas.subscribe_clicks();
        let mut kept = canvas.subscribe_clicks();
        assert_eq!(canvas.subscriber_count(), 2);

        drop(rx);
        assert_eq!(canvas.click(), 1);
        assert!(kept.recv().await.is_some());
        assert_eq!(canvas.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_panel_host_destroy() {
        let host: MemoryPanelHost<u32> = MemoryPanelHost::new();
        let kind = PanelKind::new("k", "Kind");
        let panel = host.create_panel(&kind, PanelRegion::Right).await.unwrap();
        host.mount(&panel, 7).await.unwrap();

        assert_eq!(host.view(&panel).await, Some(7));
        assert_eq!(host.destroy(&panel), Some(7));
        assert_eq!(host.view(&panel).await, None);
        assert!(matches!(host.reveal(&panel).await, Err(PanelError::Gone(_))));
    }
}
