//! # Preview session
//!
//! A [`PreviewSession`] is the live state bound to one preview panel: the
//! resource it shows, whether it is in preview or edit mode, the edit
//! buffer, and the buffer's save status. It loads and renders resources,
//! accepts edits, and persists them after a quiet period.
//!
//! ## Concurrency
//!
//! State lives behind a short-held synchronous lock so the GUI thread can
//! read snapshots and deliver edits without waiting. Operations that await
//! storage (`set_file`, `flush`, `toggle_mode`, `close`) take an async
//! operation lock first, so a resource switch that arrives during a save
//! waits for the save to settle before it changes anything.
//!
//! Renders that follow a load run after the operation lock is released.
//! Every render takes a sequence token; a finished render is applied only
//! if its token is still the latest and the session still shows the same
//! resource. Otherwise the result is dropped.

use crate::status::{Mode, SaveStatus};
use crate::timer::DebounceTimer;
use crate::PreviewSettings;
use loupe_plugin_api::{
    Event, EventSender, EventType, Placeholder, PreviewContent, RenderedDocument, Renderer,
    ResourceRef, Storage,
};
use parking_lot::{Mutex, MutexGuard};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Read-only copy of a session's state, for drawing.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub resource: Option<ResourceRef>,
    pub mode: Mode,
    pub save_status: SaveStatus,
    pub buffer: String,
    pub preview: PreviewContent,
    /// Whether the bound resource was read successfully
    pub content_loaded: bool,
    /// Incremented on every successful load; views resync their editor
    /// text when it changes
    pub load_generation: u64,
    /// The editor should take keyboard focus
    pub focus_editor: bool,
}

struct SessionState {
    resource: Option<ResourceRef>,
    mode: Mode,
    save_status: SaveStatus,
    buffer: String,
    /// Bumped on every edit
    revision: u64,
    preview: PreviewContent,
    content_loaded: bool,
    load_generation: u64,
    focus_editor: bool,
    closed: bool,
}

impl SessionState {
    fn new() -> Self {
        Self {
            resource: None,
            mode: Mode::Preview,
            save_status: SaveStatus::Saved,
            buffer: String::new(),
            revision: 0,
            preview: PreviewContent::default(),
            content_loaded: false,
            load_generation: 0,
            focus_editor: false,
            closed: false,
        }
    }
}

struct Inner {
    id: Uuid,
    storage: Arc<dyn Storage>,
    renderer: Arc<dyn Renderer>,
    events: EventSender,
    autosave_delay: Duration,
    state: Mutex<SessionState>,
    op_lock: tokio::sync::Mutex<()>,
    autosave: DebounceTimer,
    render_seq: AtomicU64,
}

/// Handle to the state bound to one preview panel.
///
/// Cloning is cheap; every clone refers to the same session.
#[derive(Clone)]
pub struct PreviewSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for PreviewSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewSession")
            .field("id", &self.inner.id)
            .field("resource", &self.active_resource())
            .finish()
    }
}

impl PreviewSession {
    /// Create an unbound session showing the empty placeholder.
    pub fn new(
        storage: Arc<dyn Storage>,
        renderer: Arc<dyn Renderer>,
        settings: &PreviewSettings,
        events: EventSender,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                id: Uuid::new_v4(),
                storage,
                renderer,
                events,
                autosave_delay: settings.autosave_delay(),
                state: Mutex::new(SessionState::new()),
                op_lock: tokio::sync::Mutex::new(()),
                autosave: DebounceTimer::new(),
                render_seq: AtomicU64::new(0),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.inner.state.lock();
        SessionSnapshot {
            resource: state.resource.clone(),
            mode: state.mode,
            save_status: state.save_status,
            buffer: state.buffer.clone(),
            preview: state.preview.clone(),
            content_loaded: state.content_loaded,
            load_generation: state.load_generation,
            focus_editor: state.focus_editor,
        }
    }

    pub fn active_resource(&self) -> Option<ResourceRef> {
        self.inner.state.lock().resource.clone()
    }

    pub fn mode(&self) -> Mode {
        self.inner.state.lock().mode
    }

    pub fn save_status(&self) -> SaveStatus {
        self.inner.state.lock().save_status
    }

    pub fn buffer(&self) -> String {
        self.inner.state.lock().buffer.clone()
    }

    pub fn preview(&self) -> PreviewContent {
        self.inner.state.lock().preview.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    /// Whether an autosave is scheduled and has not fired yet.
    pub fn has_pending_autosave(&self) -> bool {
        self.inner.autosave.is_pending()
    }

    /// Consume a pending request to focus the editor.
    pub fn take_focus_request(&self) -> bool {
        std::mem::take(&mut self.inner.state.lock().focus_editor)
    }

    /// Bind `resource` to the session, or unbind with `None`.
    ///
    /// Unsaved changes to the current resource are flushed first, along with
    /// any edit that arrives while that write runs. The new
    /// resource is read into the buffer and rendered, and the session enters
    /// preview mode. A read failure shows the load-failure placeholder and
    /// leaves the session refusing edits until another resource is bound.
    pub async fn set_file(&self, resource: Option<ResourceRef>) {
        let op = self.inner.op_lock.lock().await;
        if self.is_closed() {
            return;
        }

        self.inner.autosave.cancel();
        {
            let mut state = self.flush_pending().await;
            if state.content_loaded && state.save_status.is_dirty() {
                warn!(session = %self.inner.id, "switching resource with unsaved changes");
            }
            self.rebind(&mut state, resource.clone());
        }
        // Edits accepted during the flush scheduled a save that is now moot.
        self.inner.autosave.cancel();
        // A render still running for the previous resource must not land.
        self.next_render_token();

        let Some(resource) = resource else {
            self.inner.events.emit(
                Event::new(EventType::ResourceCleared, "")
                    .with_meta("session", self.inner.id.to_string()),
            );
            return;
        };
        self.emit(EventType::ResourceSelected, resource.path(), &resource);
        debug!(session = %self.inner.id, resource = %resource, "loading resource");

        let text = match self.inner.storage.read(&resource).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    session = %self.inner.id,
                    resource = %resource,
                    "failed to load resource: {}",
                    e
                );
                self.inner.state.lock().preview =
                    PreviewContent::Placeholder(Placeholder::LoadFailed);
                self.emit(EventType::LoadFailed, e.to_string(), &resource);
                return;
            }
        };

        {
            let mut state = self.inner.state.lock();
            state.buffer = text.clone();
            state.content_loaded = true;
            state.load_generation += 1;
        }
        self.emit(EventType::ResourceLoaded, resource.path(), &resource);

        let token = self.next_render_token();
        drop(op);
        self.render_and_apply(token, &resource, &text).await;
    }

    /// Switch between preview and edit mode.
    ///
    /// Entering edit mode only changes the visible surface and requests
    /// editor focus. Leaving it flushes the buffer, re-renders it, and then
    /// shows the preview. Does nothing until content has loaded.
    pub async fn toggle_mode(&self) {
        let _op = self.inner.op_lock.lock().await;
        let (mode, resource) = {
            let state = self.inner.state.lock();
            if state.closed || !state.content_loaded {
                return;
            }
            match &state.resource {
                Some(resource) => (state.mode, resource.clone()),
                None => return,
            }
        };

        match mode {
            Mode::Preview => {
                {
                    let mut state = self.inner.state.lock();
                    state.mode = mode.toggled();
                    state.focus_editor = true;
                }
                self.emit(EventType::ModeChanged, mode.toggled().name(), &resource);
            }
            Mode::Edit => {
                self.inner.autosave.cancel();
                if let Err(e) = self.flush_locked().await {
                    warn!(
                        session = %self.inner.id,
                        resource = %resource,
                        "leaving edit mode with unsaved changes: {}",
                        e
                    );
                }
                let text = self.buffer();
                let token = self.next_render_token();
                self.render_and_apply(token, &resource, &text).await;

                {
                    let mut state = self.inner.state.lock();
                    state.mode = mode.toggled();
                    state.focus_editor = false;
                }
                self.emit(EventType::ModeChanged, mode.toggled().name(), &resource);
            }
        }
    }

    /// Record a change to the edit buffer and restart the autosave timer.
    ///
    /// Ignored when nothing is loaded or the session is closed. Never waits
    /// on in-flight operations.
    pub fn on_buffer_edit(&self, text: impl Into<String>) {
        let text = text.into();
        {
            let mut state = self.inner.state.lock();
            if state.closed || state.resource.is_none() || !state.content_loaded {
                return;
            }
            if state.buffer == text {
                return;
            }
            state.buffer = text;
            state.revision += 1;
            // While a write is in flight the status stays Saving; the flush
            // notices the newer revision when it completes.
            if matches!(state.save_status, SaveStatus::Saved | SaveStatus::Error) {
                self.transition(&mut state, SaveStatus::Unsaved);
            }
        }
        self.schedule_autosave();
    }

    /// Persist the buffer now, if it has unsaved changes.
    pub async fn flush(&self) {
        let _op = self.inner.op_lock.lock().await;
        if self.is_closed() {
            return;
        }
        if let Err(e) = self.flush_locked().await {
            debug!(session = %self.inner.id, "flush failed: {}", e);
        }
    }

    /// Ask the host to open the bound resource in its main editor.
    pub fn open_in_editor(&self) {
        let state = self.inner.state.lock();
        if state.closed {
            return;
        }
        if let Some(resource) = &state.resource {
            self.emit(EventType::OpenResourceRequested, resource.path(), resource);
        }
    }

    /// Tear the session down.
    ///
    /// Cancels the autosave timer, persists unsaved changes (including edits
    /// made while that write runs), and turns every later operation into a
    /// no-op.
    pub async fn close(&self) {
        self.inner.autosave.cancel();
        let _op = self.inner.op_lock.lock().await;
        if self.is_closed() {
            return;
        }

        {
            let mut state = self.flush_pending().await;
            if state.content_loaded && state.save_status.is_dirty() {
                error!(session = %self.inner.id, "unsaved changes lost on close");
            }
            // Edits are refused from here on.
            state.closed = true;
        }
        self.inner.autosave.cancel();
        self.next_render_token();
        info!(session = %self.inner.id, "preview session closed");
        self.inner
            .events
            .emit(Event::new(EventType::PanelClosed, self.inner.id.to_string()));
    }

    fn needs_flush(&self) -> bool {
        let state = self.inner.state.lock();
        state.content_loaded
            && matches!(
                state.save_status,
                SaveStatus::Unsaved | SaveStatus::Saving | SaveStatus::Error
            )
    }

    /// Flush until every accepted edit is written, then return the state
    /// lock still held so the caller can rebind or close before another
    /// edit is accepted.
    ///
    /// Edits keep arriving while a write is in flight, so one flush is not
    /// enough. Stops after the first failed write. Caller holds the
    /// operation lock.
    async fn flush_pending(&self) -> MutexGuard<'_, SessionState> {
        let mut failed = false;
        loop {
            if !failed && self.needs_flush() {
                if let Err(e) = self.flush_locked().await {
                    debug!(session = %self.inner.id, "flush failed: {}", e);
                    failed = true;
                }
            }
            let state = self.inner.state.lock();
            if failed || !state.content_loaded || state.save_status != SaveStatus::Unsaved {
                return state;
            }
        }
    }

    /// Bind `resource`, or nothing, to a fresh preview-mode state.
    fn rebind(&self, state: &mut SessionState, resource: Option<ResourceRef>) {
        state.preview = match resource {
            Some(_) => PreviewContent::Document(RenderedDocument::new()),
            None => PreviewContent::Placeholder(Placeholder::Empty),
        };
        state.resource = resource;
        state.mode = Mode::Preview;
        state.buffer.clear();
        state.revision = 0;
        state.content_loaded = false;
        state.focus_editor = false;
        self.reset_status(state);
    }

    /// Write the buffer if it is dirty. Caller holds the operation lock.
    async fn flush_locked(&self) -> Result<(), loupe_plugin_api::SaveError> {
        let (resource, text, revision) = {
            let mut state = self.inner.state.lock();
            let Some(resource) = state.resource.clone() else {
                return Ok(());
            };
            if !state.content_loaded || !state.save_status.is_dirty() {
                return Ok(());
            }
            if !self.transition(&mut state, SaveStatus::Saving) {
                return Ok(());
            }
            (resource, state.buffer.clone(), state.revision)
        };

        let result = self.inner.storage.write(&resource, &text).await;

        let mut state = self.inner.state.lock();
        match result {
            Ok(()) => {
                self.transition(&mut state, SaveStatus::Saved);
                info!(session = %self.inner.id, resource = %resource, "saved");
                if state.revision != revision {
                    self.transition(&mut state, SaveStatus::Unsaved);
                }
                Ok(())
            }
            Err(e) => {
                error!(session = %self.inner.id, resource = %resource, "failed to save: {}", e);
                self.transition(&mut state, SaveStatus::Error);
                Err(e)
            }
        }
    }

    fn schedule_autosave(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.autosave.schedule(self.inner.autosave_delay, async move {
            if let Some(inner) = weak.upgrade() {
                PreviewSession { inner }.flush().await;
            }
        });
    }

    fn next_render_token(&self) -> u64 {
        self.inner.render_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Render `text` into a fresh document and show it if still current.
    async fn render_and_apply(&self, token: u64, resource: &ResourceRef, text: &str) -> bool {
        let mut document = RenderedDocument::new();
        let outcome = self
            .inner
            .renderer
            .render(text, &mut document, resource)
            .await;

        let mut state = self.inner.state.lock();
        let current = self.inner.render_seq.load(Ordering::SeqCst) == token
            && state.resource.as_ref() == Some(resource)
            && !state.closed;
        if !current {
            debug!(
                session = %self.inner.id,
                resource = %resource,
                token,
                "discarding stale render"
            );
            return false;
        }

        match outcome {
            Ok(()) => state.preview = PreviewContent::Document(document),
            Err(e) => {
                warn!(session = %self.inner.id, resource = %resource, "failed to render: {}", e);
                state.preview = PreviewContent::Placeholder(Placeholder::RenderFailed);
                drop(state);
                self.emit(EventType::RenderFailed, e.to_string(), resource);
            }
        }
        true
    }

    /// Move along a valid save status edge, publishing the change.
    fn transition(&self, state: &mut SessionState, next: SaveStatus) -> bool {
        if state.save_status == next {
            return true;
        }
        if !state.save_status.can_transition_to(next) {
            warn!(
                session = %self.inner.id,
                from = ?state.save_status,
                to = ?next,
                "refusing invalid save status transition"
            );
            return false;
        }
        state.save_status = next;
        self.publish_status(state);
        true
    }

    /// Binding a resource starts a new save lifecycle, so this is the one
    /// move to `Saved` that is not an edge of [`SaveStatus`].
    fn reset_status(&self, state: &mut SessionState) {
        if state.save_status != SaveStatus::Saved {
            state.save_status = SaveStatus::Saved;
            self.publish_status(state);
        }
    }

    fn publish_status(&self, state: &SessionState) {
        let mut event = Event::new(EventType::SaveStatusChanged, state.save_status.label())
            .with_meta("session", self.inner.id.to_string());
        if let Some(resource) = &state.resource {
            event.set_metadata("resource", resource.path());
        }
        self.inner.events.emit(event);
    }

    fn emit(&self, event_type: EventType, data: impl Into<String>, resource: &ResourceRef) {
        self.inner.events.emit(
            Event::new(event_type, data)
                .with_meta("session", self.inner.id.to_string())
                .with_meta("resource", resource.path()),
        );
    }
}
