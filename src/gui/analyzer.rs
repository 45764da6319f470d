//! Image analyzer view.
//!
//! Shows the open image at 1:1 scale inside a scroll area, turns pointer
//! drags into selections, and displays the resulting profile plot.

use eframe::egui::{self, pos2, Color32, Rect, Sense, Stroke, TextureHandle, Vec2};
use image::DynamicImage;
use std::path::{Path, PathBuf};

use super::coords::{image_rect_to_widget, widget_to_image};
use super::render::{self, to_color_image, update_texture};
use super::state::{StatusMessage, SAVE_CANCELLED};
use crate::analysis::selection::SelectionState;
use crate::analysis::session::LoadedImage;
use crate::analysis::{charts, AnalyzerSession};
use crate::config::{AnalyzerConfig, ChartConfig};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Selection outline color.
const SELECTION_STROKE: Stroke = Stroke {
    width: 2.0,
    color: Color32::RED,
};

pub struct AnalyzerPanel {
    session: AnalyzerSession,
    chart_config: ChartConfig,
    image_texture: Option<TextureHandle>,
    plot_texture: Option<TextureHandle>,
    image_dirty: bool,
    plot_dirty: bool,
}

impl AnalyzerPanel {
    pub fn new(analyzer: &AnalyzerConfig, chart_config: ChartConfig) -> Self {
        Self {
            session: AnalyzerSession::new(analyzer.default_mode, analyzer.default_axis),
            chart_config,
            image_texture: None,
            plot_texture: None,
            image_dirty: false,
            plot_dirty: false,
        }
    }

    /// Hands an in-memory image (e.g. a camera frame) to the analyzer.
    pub fn load_image(&mut self, image: DynamicImage, label: &str) -> StatusMessage {
        match self.session.load_image(image, label) {
            Ok(()) => {
                self.mark_image_changed();
                StatusMessage::success(format!("Loaded {} into the analyzer", label))
            }
            Err(e) => StatusMessage::error(format!("{:#}", e)),
        }
    }

    fn mark_image_changed(&mut self) {
        self.image_dirty = true;
        self.plot_dirty = true;
    }

    /// Renders the view. Returns a status message when something happened.
    pub fn show(&mut self, ui: &mut egui::Ui) -> Option<StatusMessage> {
        self.sync_textures(ui.ctx());
        let mut status = None;

        let mut mode = self.session.mode();
        let mut axis = self.session.axis();
        let actions = render::render_analyzer_controls(
            ui,
            &mut mode,
            &mut axis,
            self.session.profiles().is_some(),
        );

        if mode != self.session.mode() {
            status = Some(self.apply_toggle(|s| s.set_mode(mode), format!("Mode: {}", mode)));
        }
        if axis != self.session.axis() {
            status = Some(self.apply_toggle(|s| s.set_axis(axis), format!("Direction: {}", axis)));
        }
        if actions.open {
            status = Some(self.handle_open());
        }
        if actions.save_csv {
            status = Some(self.handle_save_csv());
        }
        if actions.save_plot {
            status = Some(self.handle_save_plot());
        }

        if let Some(loaded) = self.session.image() {
            let (width, height) = loaded.dimensions();
            ui.label(format!("{} ({}x{})", loaded.source, width, height));
        }
        ui.separator();

        let plot_height = if self.plot_texture.is_some() {
            self.chart_config.height as f32 + 80.0
        } else {
            0.0
        };
        let image_height = (ui.available_height() - plot_height).max(120.0);

        egui::ScrollArea::both()
            .id_salt("analyzer_image")
            .max_height(image_height)
            .drag_to_scroll(false)
            .show(ui, |ui| {
                if let Some(s) = self.render_image(ui) {
                    status = Some(s);
                }
            });

        if let Some(texture) = &self.plot_texture {
            ui.separator();
            let size = texture.size_vec2();
            let scale = (ui.available_width() / size.x).min(1.0);
            ui.image((texture.id(), size * scale));
            render::render_stats(ui, &self.session.stats());
        }

        if self.plot_dirty {
            self.refresh_plot(ui.ctx());
        }
        if self.image_dirty || self.plot_dirty {
            ui.ctx().request_repaint();
        }

        status
    }

    fn apply_toggle(
        &mut self,
        change: impl FnOnce(&mut AnalyzerSession) -> anyhow::Result<()>,
        message: String,
    ) -> StatusMessage {
        match change(&mut self.session) {
            Ok(()) => {
                self.plot_dirty = true;
                StatusMessage::info(message)
            }
            Err(e) => StatusMessage::error(format!("Failed to update profile: {:#}", e)),
        }
    }

    /// Draws the image and handles the selection drag. Returns a status on release.
    fn render_image(&mut self, ui: &mut egui::Ui) -> Option<StatusMessage> {
        let (Some(texture), Some(loaded)) = (&self.image_texture, self.session.image()) else {
            ui.label("No image loaded.");
            return None;
        };

        let image_size = loaded.dimensions();
        let size = Vec2::new(image_size.0 as f32, image_size.1 as f32);
        let (response, painter) = ui.allocate_painter(size, Sense::drag());
        let image_rect = response.rect;
        painter.image(
            texture.id(),
            image_rect,
            Rect::from_min_max(pos2(0.0, 0.0), pos2(1.0, 1.0)),
            Color32::WHITE,
        );

        let pointer = response
            .interact_pointer_pos()
            .or_else(|| ui.ctx().pointer_latest_pos())
            .map(|pos| widget_to_image(pos, image_rect, image_size));

        let mut status = None;
        if response.drag_started() {
            if let Some((x, y)) = pointer {
                self.session.pointer_pressed(x, y);
            }
        }
        if response.dragged() {
            if let Some((x, y)) = pointer {
                self.session.pointer_moved(x, y);
            }
        }
        if response.drag_stopped() {
            let end = pointer.or_else(|| self.session.selector().current_corner());
            if let Some((x, y)) = end {
                status = Some(self.handle_release(x, y));
            }
        }

        let outline = match self.session.selector().state() {
            SelectionState::Idle => None,
            SelectionState::Dragging { .. } => self.session.selector().live_rect(),
            SelectionState::Finalized(bbox) => Some((
                (bbox.x1 as f32, bbox.y1 as f32),
                (bbox.x2 as f32, bbox.y2 as f32),
            )),
        };
        if let Some((a, b)) = outline {
            painter.rect_stroke(
                image_rect_to_widget(a, b, image_rect, image_size),
                0.0,
                SELECTION_STROKE,
            );
        }

        status
    }

    fn handle_release(&mut self, x: f32, y: f32) -> StatusMessage {
        match self.session.pointer_released(x, y) {
            Ok(true) => {
                self.plot_dirty = true;
                match self.session.selection() {
                    Some(bbox) => StatusMessage::info(format!("Selected {}", bbox)),
                    None => StatusMessage::info("Selection updated"),
                }
            }
            Ok(false) => StatusMessage::warning("Selection has zero area; ignored"),
            Err(e) => StatusMessage::error(format!("Profile extraction failed: {:#}", e)),
        }
    }

    fn handle_open(&mut self) -> StatusMessage {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Open Image")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .set_directory(self.dialog_dir())
            .pick_file()
        else {
            return StatusMessage::info("Open cancelled: no image chosen");
        };

        match self.session.open_image(&path) {
            Ok(()) => {
                self.mark_image_changed();
                StatusMessage::success(format!("Opened {}", path.display()))
            }
            Err(e) => StatusMessage::error(format!("{:#}", e)),
        }
    }

    fn handle_save_csv(&mut self) -> StatusMessage {
        if self.session.table().is_none() {
            return StatusMessage::warning("No profile data to save");
        }

        let Some(path) = rfd::FileDialog::new()
            .set_title("Save Profile Data")
            .add_filter("CSV", &["csv"])
            .set_directory(self.dialog_dir())
            .set_file_name("profile.csv")
            .save_file()
        else {
            return StatusMessage::warning(SAVE_CANCELLED);
        };

        match self.session.save_csv(&path) {
            Ok(()) => StatusMessage::success(format!("Saved {}", path.display())),
            Err(e) => StatusMessage::error(format!("{:#}", e)),
        }
    }

    fn handle_save_plot(&mut self) -> StatusMessage {
        if self.session.profiles().is_none() {
            return StatusMessage::warning("No profile to plot");
        }

        let Some(path) = rfd::FileDialog::new()
            .set_title("Save Plot Image")
            .add_filter("PNG", &["png"])
            .add_filter("JPEG", &["jpg", "jpeg"])
            .set_directory(self.dialog_dir())
            .set_file_name("profile.png")
            .save_file()
        else {
            return StatusMessage::warning(SAVE_CANCELLED);
        };

        match self.session.save_chart(&path, &self.chart_config) {
            Ok(()) => StatusMessage::success(format!("Saved {}", path.display())),
            Err(e) => StatusMessage::error(format!("{:#}", e)),
        }
    }

    /// Dialogs start next to the open image, or in Documents.
    fn dialog_dir(&self) -> PathBuf {
        self.session
            .image()
            .and_then(LoadedImage::directory)
            .map(Path::to_path_buf)
            .unwrap_or_else(crate::paths::get_documents_dir)
    }

    fn sync_textures(&mut self, ctx: &egui::Context) {
        if !self.image_dirty {
            return;
        }
        self.image_dirty = false;

        match self.session.image() {
            Some(loaded) => {
                let image = to_color_image(&loaded.image.to_rgb8());
                update_texture(ctx, &mut self.image_texture, "analyzer_image", image);
            }
            None => self.image_texture = None,
        }
    }

    fn refresh_plot(&mut self, ctx: &egui::Context) {
        self.plot_dirty = false;

        let Some(set) = self.session.profiles() else {
            self.plot_texture = None;
            return;
        };

        match charts::render_profile_chart(set, &self.chart_config) {
            Ok(chart) => {
                update_texture(ctx, &mut self.plot_texture, "profile_plot", to_color_image(&chart));
                ctx.request_repaint();
            }
            Err(e) => {
                log::error!("Failed to render profile plot: {:#}", e);
                self.plot_texture = None;
            }
        }
    }
}
