//! The canvas board: draws a JSON Canvas file and tracks its selection.
//!
//! The board is a [`CanvasSurface`] that starts empty; its [`Canvas`]
//! appears once the canvas file has been loaded.

use egui::{Align2, Color32, CornerRadius, FontId, Pos2, Rect, Sense, Stroke, StrokeKind, Ui, Vec2};
use loupe_core::{CanvasDocument, NodeGeometry};
use loupe_plugin_api::{Canvas, CanvasError, CanvasSurface, ClickEvent, Node, NodeKind};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

const MARGIN: f32 = 24.0;

#[derive(Debug, Clone)]
struct BoardItem {
    node: Node,
    geometry: NodeGeometry,
    caption: String,
}

impl BoardItem {
    fn contains(&self, x: f32, y: f32) -> bool {
        let g = &self.geometry;
        x >= g.x && x <= g.x + g.width && y >= g.y && y <= g.y + g.height
    }

    fn is_group(&self) -> bool {
        matches!(self.node.kind, NodeKind::Group)
    }
}

/// Initialized canvas state: nodes, selection, and click listeners.
pub struct BoardCanvas {
    items: Vec<BoardItem>,
    selection: Mutex<Vec<Node>>,
    listeners: Mutex<Vec<mpsc::UnboundedSender<ClickEvent>>>,
}

impl BoardCanvas {
    fn new(document: &CanvasDocument) -> Self {
        let items = document
            .nodes()
            .into_iter()
            .map(|(node, geometry, caption)| BoardItem {
                node,
                geometry,
                caption,
            })
            .collect();
        Self {
            items,
            selection: Mutex::new(Vec::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Topmost node under a point; groups only when nothing else is hit.
    fn hit_test(&self, x: f32, y: f32) -> Option<&BoardItem> {
        let mut hits = self.items.iter().rev().filter(|item| item.contains(x, y));
        let first = hits.next()?;
        if !first.is_group() {
            return Some(first);
        }
        hits.find(|item| !item.is_group()).or(Some(first))
    }

    /// Apply a click at canvas coordinates, then notify listeners.
    ///
    /// A plain click selects the node under the pointer or clears the
    /// selection; an additive click toggles that node in the selection.
    fn click(&self, x: f32, y: f32, additive: bool) -> usize {
        {
            let mut selection = self.selection.lock();
            match self.hit_test(x, y) {
                Some(item) if additive => {
                    if let Some(index) = selection.iter().position(|n| n.id == item.node.id) {
                        selection.remove(index);
                    } else {
                        selection.push(item.node.clone());
                    }
                }
                Some(item) => *selection = vec![item.node.clone()],
                None if additive => {}
                None => selection.clear(),
            }
        }

        let mut listeners = self.listeners.lock();
        listeners.retain(|tx| tx.send(ClickEvent::at(x, y)).is_ok());
        listeners.len()
    }

    fn is_selected(&self, node: &Node) -> bool {
        self.selection.lock().iter().any(|n| n.id == node.id)
    }

    fn bounds(&self) -> Option<Rect> {
        self.items
            .iter()
            .map(|item| {
                let g = &item.geometry;
                Rect::from_min_size(Pos2::new(g.x, g.y), Vec2::new(g.width, g.height))
            })
            .reduce(|a, b| a.union(b))
    }
}

impl Canvas for BoardCanvas {
    fn selection(&self) -> Vec<Node> {
        self.selection.lock().clone()
    }

    fn subscribe_clicks(&self) -> mpsc::UnboundedReceiver<ClickEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.listeners.lock().push(tx);
        rx
    }
}

/// The canvas view shown in the central panel.
pub struct CanvasBoard {
    id: Uuid,
    canvas: Mutex<Option<Arc<BoardCanvas>>>,
}

impl CanvasBoard {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            canvas: Mutex::new(None),
        }
    }

    /// Read a canvas file and show it, replacing any previous canvas.
    pub async fn load(&self, path: &Path) -> Result<(), CanvasError> {
        let document = CanvasDocument::load(path)
            .await
            .map_err(|e| CanvasError::Load {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        self.show_document(&document);
        tracing::info!(path = %path.display(), nodes = document.nodes.len(), "canvas loaded");
        Ok(())
    }

    pub fn show_document(&self, document: &CanvasDocument) {
        *self.canvas.lock() = Some(Arc::new(BoardCanvas::new(document)));
    }

    pub fn is_loaded(&self) -> bool {
        self.canvas.lock().is_some()
    }

    /// Click at canvas coordinates. Returns how many listeners were told.
    pub fn click(&self, x: f32, y: f32, additive: bool) -> Result<usize, CanvasError> {
        let canvas = self.canvas.lock().clone().ok_or(CanvasError::NotReady)?;
        Ok(canvas.click(x, y, additive))
    }

    pub fn ui(&self, ui: &mut Ui) {
        let Some(canvas) = self.canvas.lock().clone() else {
            ui.centered_and_justified(|ui| {
                ui.label(egui::RichText::new("No canvas loaded").weak());
            });
            return;
        };

        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click());
        let Some(bounds) = canvas.bounds() else {
            painter.text(
                response.rect.center(),
                Align2::CENTER_CENTER,
                "Empty canvas",
                FontId::proportional(14.0),
                Color32::GRAY,
            );
            return;
        };
        // Canvas coordinates to screen: top-left of the content at the margin.
        let offset = response.rect.min.to_vec2() + Vec2::splat(MARGIN) - bounds.min.to_vec2();

        if response.clicked() {
            if let Some(pointer) = response.interact_pointer_pos() {
                let at = pointer - offset;
                let additive = ui.input(|i| i.modifiers.shift);
                canvas.click(at.x, at.y, additive);
            }
        }

        for item in &canvas.items {
            let g = &item.geometry;
            let rect =
                Rect::from_min_size(Pos2::new(g.x, g.y) + offset, Vec2::new(g.width, g.height));
            let (fill, text_color) = match item.node.kind {
                NodeKind::Group => (
                    Color32::from_rgba_unmultiplied(80, 80, 100, 40),
                    Color32::LIGHT_GRAY,
                ),
                NodeKind::File { .. } => (Color32::from_rgb(45, 55, 75), Color32::WHITE),
                NodeKind::Text => (Color32::from_rgb(50, 50, 55), Color32::LIGHT_GRAY),
                NodeKind::Link => (Color32::from_rgb(40, 60, 55), Color32::LIGHT_BLUE),
            };
            let stroke = if canvas.is_selected(&item.node) {
                Stroke::new(2.0, Color32::from_rgb(128, 64, 192))
            } else {
                Stroke::new(1.0, Color32::DARK_GRAY)
            };
            painter.rect(rect, CornerRadius::same(6), fill, stroke, StrokeKind::Inside);
            painter.text(
                rect.left_top() + Vec2::new(8.0, 6.0),
                Align2::LEFT_TOP,
                &item.caption,
                FontId::proportional(14.0),
                text_color,
            );
        }
    }
}

impl Default for CanvasBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl CanvasSurface for CanvasBoard {
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
    use loupe_plugin_api::ResourceRef;

    const BOARD: &str = r##"{
        "nodes": [
            {"id": "g", "type": "group", "label": "All", "x": 0, "y": 0, "width": 600, "height": 300},
            {"id": "a", "type": "file", "file": "a.md", "x": 10, "y": 10, "width": 100, "height": 50},
            {"id": "b", "type": "file", "file": "b.md", "x": 200, "y": 10, "width": 100, "height": 50},
            {"id": "t", "type": "text", "text": "# Note", "x": 400, "y": 10, "width": 100, "height": 50}
        ]
    }"##;

    fn loaded_board() -> CanvasBoard {
        let board = CanvasBoard::new();
        board.show_document(&CanvasDocument::parse(BOARD).unwrap());
        board
    }

    fn selected_ids(board: &CanvasBoard) -> Vec<String> {
        board
            .canvas()
            .unwrap()
            .selection()
            .into_iter()
            .map(|n| n.id.to_string())
            .collect()
    }

    #[test]
    fn test_canvas_absent_until_loaded() {
        let board = CanvasBoard::new();
        assert!(board.canvas().is_none());
        assert!(matches!(board.click(0.0, 0.0, false), Err(CanvasError::NotReady)));

        board.show_document(&CanvasDocument::parse(BOARD).unwrap());
        assert!(board.is_loaded());
        assert!(board.canvas().is_some());
    }

    #[test]
    fn test_click_prefers_nodes_over_groups() {
        let board = loaded_board();

        board.click(20.0, 20.0, false).unwrap();
        assert_eq!(selected_ids(&board), vec!["a"]);
        assert_eq!(
            board.canvas().unwrap().selection()[0].resource(),
            Some(&ResourceRef::new("a.md"))
        );

        board.click(150.0, 200.0, false).unwrap();
        assert_eq!(selected_ids(&board), vec!["g"]);

        board.click(900.0, 900.0, false).unwrap();
        assert!(selected_ids(&board).is_empty());
    }

    #[test]
    fn test_additive_click_toggles() {
        let board = loaded_board();

        board.click(20.0, 20.0, false).unwrap();
        board.click(210.0, 20.0, true).unwrap();
        assert_eq!(selected_ids(&board), vec!["a", "b"]);

        board.click(20.0, 20.0, true).unwrap();
        assert_eq!(selected_ids(&board), vec!["b"]);

        board.click(900.0, 900.0, true).unwrap();
        assert_eq!(selected_ids(&board), vec!["b"]);
    }

    #[tokio::test]
    async fn test_clicks_reach_subscribers() {
        let board = loaded_board();
        let canvas = board.canvas().unwrap();
        let mut clicks = canvas.subscribe_clicks();

        assert_eq!(board.click(410.0, 20.0, false).unwrap(), 1);
        let click = clicks.recv().await.unwrap();
        assert_eq!((click.x, click.y), (410.0, 20.0));

        drop(clicks);
        assert_eq!(board.click(410.0, 20.0, false).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_load_reports_missing_file() {
        let board = CanvasBoard::new();
        let dir = tempfile::tempdir().unwrap();

        let err = board.load(&dir.path().join("missing.canvas")).await.unwrap_err();
        assert!(matches!(err, CanvasError::Load { .. }));
        assert!(!board.is_loaded());

        let path = dir.path().join("board.canvas");
        std::fs::write(&path, BOARD).unwrap();
        board.load(&path).await.unwrap();
        assert!(board.is_loaded());
    }
}
