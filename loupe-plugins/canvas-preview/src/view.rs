//! egui drawing of a preview panel.

use crate::session::{PreviewSession, SessionSnapshot};
use crate::status::{Mode, SaveStatus};
use egui::{Color32, RichText, Ui};
use loupe_plugin_api::{Block, PreviewContent};
use tokio::runtime::Handle;

/// Draws one [`PreviewSession`] and forwards user input to it.
///
/// Session operations that wait on storage are spawned on `runtime`, so
/// drawing never blocks.
pub struct PreviewPanelView {
    session: PreviewSession,
    runtime: Handle,
    /// Local copy of the buffer that the text editor edits in place
    editor_text: String,
    synced_generation: Option<u64>,
}

impl PreviewPanelView {
    pub fn new(session: PreviewSession, runtime: Handle) -> Self {
        Self {
            session,
            runtime,
            editor_text: String::new(),
            synced_generation: None,
        }
    }

    pub fn session(&self) -> &PreviewSession {
        &self.session
    }

    pub fn ui(&mut self, ui: &mut Ui) {
        let snapshot = self.session.snapshot();
        if self.synced_generation != Some(snapshot.load_generation) {
            self.editor_text = snapshot.buffer.clone();
            self.synced_generation = Some(snapshot.load_generation);
        }

        self.header(ui, &snapshot);
        ui.separator();

        match snapshot.mode {
            Mode::Edit if snapshot.content_loaded => self.editor(ui),
            _ => preview(ui, &snapshot.preview),
        }
    }

    fn header(&self, ui: &mut Ui, snapshot: &SessionSnapshot) {
        ui.horizontal(|ui| {
            let title = snapshot
                .resource
                .as_ref()
                .map(|r| r.display_name().to_string())
                .unwrap_or_else(|| "Note preview".to_string());
            ui.heading(title);

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let toggle = ui.add_enabled(
                    snapshot.content_loaded,
                    egui::Button::new(snapshot.mode.toggle_label()),
                );
                if toggle.clicked() {
                    let session = self.session.clone();
                    self.runtime.spawn(async move { session.toggle_mode().await });
                }

                if ui
                    .add_enabled(snapshot.resource.is_some(), egui::Button::new("Open"))
                    .on_hover_text("Open in the main editor")
                    .clicked()
                {
                    self.session.open_in_editor();
                }

                if snapshot.resource.is_some() {
                    let status = snapshot.save_status;
                    ui.colored_label(status_color(status), status.label());
                }
            });
        });
    }

    fn editor(&mut self, ui: &mut Ui) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            let response = ui.add_sized(
                ui.available_size(),
                egui::TextEdit::multiline(&mut self.editor_text)
                    .font(egui::TextStyle::Monospace)
                    .desired_width(f32::INFINITY),
            );
            if self.session.take_focus_request() {
                response.request_focus();
            }
            if response.changed() {
                self.session.on_buffer_edit(self.editor_text.clone());
            }
        });
    }
}

fn preview(ui: &mut Ui, content: &PreviewContent) {
    match content {
        PreviewContent::Placeholder(placeholder) => {
            ui.centered_and_justified(|ui| {
                ui.label(RichText::new(placeholder.message()).weak().italics());
            });
        }
        PreviewContent::Document(document) => {
            egui::ScrollArea::vertical().show(ui, |ui| {
                for block in document.blocks() {
                    block_ui(ui, block);
                }
            });
        }
    }
}

fn block_ui(ui: &mut Ui, block: &Block) {
    match block {
        Block::Heading { level, text } => {
            let size = match level {
                1 => 24.0,
                2 => 20.0,
                3 => 17.0,
                _ => 15.0,
            };
            ui.add_space(4.0);
            ui.label(RichText::new(text).size(size).strong());
        }
        Block::Paragraph(text) => {
            ui.label(text);
        }
        Block::Code { code, .. } => {
            egui::Frame::group(ui.style()).show(ui, |ui| {
                ui.label(RichText::new(code).monospace());
            });
        }
        Block::ListItem {
            depth,
            ordinal,
            text,
        } => {
            ui.horizontal_wrapped(|ui| {
                ui.add_space(16.0 * *depth as f32);
                let marker = match ordinal {
                    Some(n) => format!("{n}."),
                    None => "•".to_string(),
                };
                ui.label(marker);
                ui.label(text);
            });
        }
        Block::Task {
            depth,
            checked,
            text,
        } => {
            ui.horizontal_wrapped(|ui| {
                ui.add_space(16.0 * *depth as f32);
                ui.label(if *checked { "☑" } else { "☐" });
                ui.label(text);
            });
        }
        Block::Quote(text) => {
            ui.horizontal_wrapped(|ui| {
                ui.label(RichText::new("▍").weak());
                ui.label(RichText::new(text).italics());
            });
        }
        Block::TableRow { header, cells } => {
            ui.horizontal_wrapped(|ui| {
                for cell in cells {
                    let text = RichText::new(cell);
                    ui.label(if *header { text.strong() } else { text });
                    ui.separator();
                }
            });
        }
        Block::Rule => {
            ui.separator();
        }
    }
}

fn status_color(status: SaveStatus) -> Color32 {
    match status {
        SaveStatus::Saved => Color32::from_rgb(90, 170, 90),
        SaveStatus::Saving => Color32::from_rgb(120, 150, 220),
        SaveStatus::Unsaved => Color32::from_rgb(255, 165, 0),
        SaveStatus::Error => Color32::from_rgb(220, 80, 80),
    }
}
