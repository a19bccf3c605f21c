//! # Canvas selection watcher
//!
//! Follows clicks on one canvas surface and reports when the selection has
//! settled on exactly one file node. Canvas surfaces may create their canvas
//! lazily, so attaching polls until the canvas exists.

use crate::PreviewSettings;
use async_trait::async_trait;
use loupe_plugin_api::{Canvas, CanvasSurface, Event, EventSender, EventType, Node, ResourceRef};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Receives settled single-file selections.
#[async_trait]
pub trait SelectionSink: Send + Sync {
    async fn file_selected(&self, resource: ResourceRef);
}

/// The canvas selection at one instant.
#[derive(Debug, Clone)]
pub struct SelectionSnapshot {
    pub nodes: Vec<Node>,
    pub taken_at: Instant,
}

impl SelectionSnapshot {
    pub fn capture(canvas: &dyn Canvas) -> Self {
        Self {
            nodes: canvas.selection(),
            taken_at: Instant::now(),
        }
    }

    /// The selected resource, if exactly one node is selected and it is a
    /// file node.
    pub fn single_file_resource(&self) -> Option<ResourceRef> {
        match self.nodes.as_slice() {
            [node] => node.resource().cloned(),
            _ => None,
        }
    }
}

/// Background task bound to one canvas surface.
///
/// Dropping the watcher stops it; [`SelectionWatcher::detach`] also waits
/// for the task to finish.
pub struct SelectionWatcher {
    surface_id: Uuid,
    events: EventSender,
    task: Option<JoinHandle<()>>,
}

impl SelectionWatcher {
    /// Start watching `surface`. Must be called within a tokio runtime.
    pub fn attach(
        surface: Arc<dyn CanvasSurface>,
        settings: &PreviewSettings,
        sink: Arc<dyn SelectionSink>,
        events: EventSender,
    ) -> Self {
        let surface_id = surface.surface_id();
        let task = tokio::spawn(watch(
            surface,
            WatchTiming {
                settle: settings.settle_delay(),
                retry: settings.attach_retry(),
                timeout: settings.attach_timeout(),
            },
            sink,
            events.clone(),
        ));
        debug!(surface = %surface_id, "selection watcher started");
        Self {
            surface_id,
            events,
            task: Some(task),
        }
    }

    pub fn surface_id(&self) -> Uuid {
        self.surface_id
    }

    /// Whether the watcher is still waiting for the canvas or following it.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop watching and release the click subscription.
    ///
    /// Selections already handed to the sink are not interrupted.
    pub async fn detach(mut self) {
        if let Some(task) = self.task.take() {
            let was_running = !task.is_finished();
            task.abort();
            let _ = task.await;
            if was_running {
                self.events.emit(
                    Event::new(EventType::CanvasDetached, self.surface_id.to_string())
                        .with_meta("reason", "detached"),
                );
            }
        }
        debug!(surface = %self.surface_id, "selection watcher detached");
    }
}

impl Drop for SelectionWatcher {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[derive(Clone, Copy)]
struct WatchTiming {
    settle: Duration,
    retry: Duration,
    timeout: Option<Duration>,
}

async fn watch(
    surface: Arc<dyn CanvasSurface>,
    timing: WatchTiming,
    sink: Arc<dyn SelectionSink>,
    events: EventSender,
) {
    let surface_id = surface.surface_id();
    let Some(canvas) = wait_for_canvas(surface.as_ref(), timing).await else {
        warn!(surface = %surface_id, "canvas never became available, not watching selection");
        return;
    };

    let mut clicks = canvas.subscribe_clicks();
    events.emit(Event::new(EventType::CanvasAttached, surface_id.to_string()));
    debug!(surface = %surface_id, "following canvas clicks");

    let mut evaluations = JoinSet::new();
    loop {
        tokio::select! {
            click = clicks.recv() => {
                let Some(click) = click else { break };
                trace!(surface = %surface_id, x = click.x, y = click.y, "canvas click");
                evaluations.spawn(evaluate_after(
                    Arc::clone(&canvas),
                    Arc::clone(&sink),
                    timing.settle,
                ));
            }
            Some(_) = evaluations.join_next(), if !evaluations.is_empty() => {}
        }
    }

    events.emit(
        Event::new(EventType::CanvasDetached, surface_id.to_string())
            .with_meta("reason", "canvas closed"),
    );
    debug!(surface = %surface_id, "canvas click stream ended");
}

async fn wait_for_canvas(
    surface: &dyn CanvasSurface,
    timing: WatchTiming,
) -> Option<Arc<dyn Canvas>> {
    let started = Instant::now();
    loop {
        if let Some(canvas) = surface.canvas() {
            return Some(canvas);
        }
        if timing.timeout.is_some_and(|timeout| started.elapsed() >= timeout) {
            return None;
        }
        trace!(surface = %surface.surface_id(), "canvas not ready, retrying");
        tokio::time::sleep(timing.retry).await;
    }
}

/// Let the canvas finish updating its selection, then report it.
async fn evaluate_after(canvas: Arc<dyn Canvas>, sink: Arc<dyn SelectionSink>, settle: Duration) {
    tokio::time::sleep(settle).await;
    let snapshot = SelectionSnapshot::capture(canvas.as_ref());
    let Some(resource) = snapshot.single_file_resource() else {
        trace!(selected = snapshot.nodes.len(), "selection is not a single file");
        return;
    };
    debug!(resource = %resource, "file selected on canvas");
    // Hand off so detaching the watcher never cancels a load in progress.
    tokio::spawn(async move { sink.file_selected(resource).await });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_file_resource() {
        let file = Node::file("a", ResourceRef::new("a.md"));
        let snapshot = |nodes: Vec<Node>| SelectionSnapshot {
            nodes,
            taken_at: Instant::now(),
        };

        assert_eq!(
            snapshot(vec![file.clone()]).single_file_resource(),
            Some(ResourceRef::new("a.md"))
        );
        assert_eq!(snapshot(vec![]).single_file_resource(), None);
        assert_eq!(snapshot(vec![Node::text("t")]).single_file_resource(), None);
        assert_eq!(
            snapshot(vec![file.clone(), Node::file("b", ResourceRef::new("b.md"))])
                .single_file_resource(),
            None
        );
    }
}
