//! Main application structure for Loupe.
//!
//! Hosts the canvas board in the central panel and every preview panel the
//! plugin opens in the docked side panels. All async work runs on the tokio
//! runtime owned by `main`; the GUI thread only spawns onto it.

use crate::board::CanvasBoard;
use crate::dock::DockHost;
use crate::AppArgs;
use eframe::egui;
use loupe_canvas_preview::{CanvasPreviewPlugin, PreviewPanelView, COMMAND_ID, COMMAND_NAME};
use loupe_core::Config;
use loupe_plugin_api::{CanvasSurface, Event, EventType, PanelHandle, PanelRegion, Plugin};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Main Loupe application state
pub struct LoupeApp {
    runtime: Arc<Runtime>,
    plugin: Arc<CanvasPreviewPlugin>,
    dock: Arc<DockHost>,
    board: Arc<CanvasBoard>,
    events: broadcast::Receiver<Event>,
    /// Drawn panels, keyed by panel id
    views: HashMap<Uuid, PreviewPanelView>,
    /// Last notable event, shown in the top bar
    status_line: String,
    canvas_name: String,
}

impl LoupeApp {
    /// Create the application and start loading the canvas.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        args: &AppArgs,
        config: &Config,
        runtime: Arc<Runtime>,
        plugin: Arc<CanvasPreviewPlugin>,
        dock: Arc<DockHost>,
        events: broadcast::Receiver<Event>,
    ) -> Self {
        setup_visuals(&cc.egui_ctx);

        let board = Arc::new(CanvasBoard::new());
        {
            // Watchers are spawned onto the runtime.
            let _guard = runtime.enter();
            plugin.surface_activated(board.clone() as Arc<dyn CanvasSurface>);
        }

        let canvas_path = args
            .canvas
            .clone()
            .or_else(|| config.app.default_canvas.clone());
        let canvas_name = canvas_path
            .as_ref()
            .and_then(|p| p.file_stem())
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "No canvas".to_string());

        if let Some(path) = canvas_path {
            let board = Arc::clone(&board);
            let repaint = cc.egui_ctx.clone();
            runtime.spawn(async move {
                if let Err(e) = board.load(&path).await {
                    tracing::error!("Failed to load canvas: {}", e);
                }
                repaint.request_repaint();
            });
        } else {
            tracing::warn!("No canvas given; pass --canvas or set app.default_canvas");
        }

        Self {
            runtime,
            plugin,
            dock,
            board,
            events,
            views: HashMap::new(),
            status_line: String::new(),
            canvas_name,
        }
    }

    fn open_preview_panel(&self) {
        let plugin = Arc::clone(&self.plugin);
        self.runtime.spawn(async move {
            if let Err(e) = plugin.run_command(COMMAND_ID).await {
                tracing::error!("Failed to open preview panel: {}", e);
            }
        });
    }

    /// Drain pending events into the status line.
    fn process_events(&mut self) {
        loop {
            match self.events.try_recv() {
                Ok(event) => self.handle_event(&event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} events", skipped);
                }
                Err(_) => break,
            }
        }
    }

    fn handle_event(&mut self, event: &Event) {
        match event.event_type() {
            EventType::OpenResourceRequested => {
                tracing::info!(resource = event.data(), "Open in editor requested");
                self.status_line = format!("Open requested: {}", event.data());
            }
            EventType::LoadFailed | EventType::RenderFailed => {
                let description = event.event_type().description();
                self.status_line = format!("{}: {}", description, event.data());
            }
            EventType::SaveStatusChanged => {
                if let Some(resource) = event.get_metadata("resource") {
                    self.status_line = format!("{}: {}", resource, event.data());
                }
            }
            _ => {}
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.menu_button("View", |ui| {
                    if ui.button(COMMAND_NAME).clicked() {
                        self.open_preview_panel();
                    }
                });
                ui.separator();
                ui.label(&self.canvas_name);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(egui::RichText::new(&self.status_line).weak());
                });
            });
        });
    }

    fn render_panels(&mut self, ctx: &egui::Context) {
        let visible = self.dock.visible_panels();
        self.views.retain(|id, _| visible.iter().any(|(h, _, _)| h.id() == *id));

        let mut closed: Vec<PanelHandle> = Vec::new();
        for (handle, region, session) in visible {
            let Some(session) = session else { continue };
            let runtime = self.runtime.handle().clone();
            let view = self
                .views
                .entry(handle.id())
                .or_insert_with(|| PreviewPanelView::new(session.clone(), runtime.clone()));
            if view.session().id() != session.id() {
                *view = PreviewPanelView::new(session, runtime);
            }

            let id = egui::Id::new(handle.id());
            let mut draw = |ui: &mut egui::Ui| {
                ui.horizontal(|ui| {
                    ui.label(egui::RichText::new(handle.kind().display_name()).small().weak());
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.small_button("✕").on_hover_text("Close panel").clicked() {
                            closed.push(handle.clone());
                        }
                    });
                });
                view.ui(ui);
            };
            match region {
                PanelRegion::Left => {
                    egui::SidePanel::left(id)
                        .resizable(true)
                        .default_width(360.0)
                        .show(ctx, |ui| draw(ui));
                }
                PanelRegion::Right => {
                    egui::SidePanel::right(id)
                        .resizable(true)
                        .default_width(360.0)
                        .show(ctx, |ui| draw(ui));
                }
                PanelRegion::Bottom => {
                    egui::TopBottomPanel::bottom(id)
                        .resizable(true)
                        .default_height(240.0)
                        .show(ctx, |ui| draw(ui));
                }
                PanelRegion::Floating => {
                    egui::Window::new(handle.kind().display_name())
                        .id(id)
                        .default_size([360.0, 480.0])
                        .show(ctx, |ui| draw(ui));
                }
            }
        }

        for handle in closed {
            self.views.remove(&handle.id());
            if let Some(session) = self.dock.close(&handle) {
                self.runtime.spawn(async move { session.close().await });
            }
        }
    }
}

impl eframe::App for LoupeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.process_events();
        self.render_top_bar(ctx);
        self.render_panels(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            self.board.ui(ui);
        });

        // Async work finishes off the GUI thread.
        ctx.request_repaint_after(Duration::from_millis(100));
    }
}

/// Setup visual theme for the application
fn setup_visuals(ctx: &egui::Context) {
    let mut visuals = egui::Visuals::dark();

    // Accent color (purple/violet theme)
    visuals.selection.bg_fill = egui::Color32::from_rgb(128, 64, 192);
    visuals.hyperlink_color = egui::Color32::from_rgb(160, 100, 220);

    ctx.set_visuals(visuals);
}
