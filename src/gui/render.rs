//! GUI rendering functions.
//!
//! Control bars return what was clicked; the caller performs the action.

use eframe::egui::{self, Color32, ColorImage, RichText, TextureHandle, TextureOptions};
use image::RgbImage;

use super::state::{StatusMessage, View};
use crate::analysis::{Axis, ChannelMode, ProfileStats};
use crate::camera::CaptureState;

/// Buttons clicked in the analyzer control bar.
#[derive(Debug, Default)]
pub struct AnalyzerActions {
    pub open: bool,
    pub save_csv: bool,
    pub save_plot: bool,
}

/// Buttons clicked in the camera control bar.
#[derive(Debug, Default)]
pub struct CameraActions {
    pub start: bool,
    pub stop: bool,
    pub capture_still: bool,
    pub save_image: bool,
    pub send_to_analyzer: bool,
}

/// Render the view selector.
pub fn render_view_tabs(ui: &mut egui::Ui, view: &mut View) {
    ui.horizontal(|ui| {
        for candidate in [View::Analyzer, View::Camera] {
            ui.selectable_value(view, candidate, RichText::new(candidate.title()).size(15.0));
        }
    });
}

/// Render the status line.
pub fn render_status_bar(ui: &mut egui::Ui, status: &StatusMessage) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(status.status_text()).color(status.level.color()));
    });
}

/// Render the analyzer toolbar: open, direction/mode toggles, save buttons.
pub fn render_analyzer_controls(
    ui: &mut egui::Ui,
    mode: &mut ChannelMode,
    axis: &mut Axis,
    has_profile: bool,
) -> AnalyzerActions {
    let mut actions = AnalyzerActions::default();

    ui.horizontal(|ui| {
        if ui.button("📂 Open Image").clicked() {
            actions.open = true;
        }

        ui.separator();
        ui.label("Direction:");
        ui.radio_value(axis, Axis::Horizontal, "Horizontal");
        ui.radio_value(axis, Axis::Vertical, "Vertical");

        ui.separator();
        ui.label("Mode:");
        ui.radio_value(mode, ChannelMode::Grayscale, "Grayscale");
        ui.radio_value(mode, ChannelMode::Rgb, "RGB");

        ui.separator();
        ui.add_enabled_ui(has_profile, |ui| {
            if ui.button("💾 Save CSV").clicked() {
                actions.save_csv = true;
            }
            if ui.button("📊 Save Plot Image").clicked() {
                actions.save_plot = true;
            }
        });
    });

    actions
}

/// Render per-profile statistics as a grid.
pub fn render_stats(ui: &mut egui::Ui, stats: &[ProfileStats]) {
    if stats.is_empty() {
        return;
    }

    egui::Grid::new("profile_stats")
        .striped(true)
        .spacing([16.0, 4.0])
        .show(ui, |ui| {
            for header in ["Profile", "Samples", "Mean", "Min", "Max", "Std Dev", "Peak at"] {
                ui.label(RichText::new(header).strong());
            }
            ui.end_row();

            for s in stats {
                ui.label(&s.name);
                ui.label(s.count.to_string());
                ui.label(format!("{:.2}", s.mean));
                ui.label(format!("{:.2}", s.min));
                ui.label(format!("{:.2}", s.max));
                ui.label(format!("{:.2}", s.std_dev));
                ui.label(s.peak_index.to_string());
                ui.end_row();
            }
        });
}

/// Render the camera toolbar.
pub fn render_camera_controls(
    ui: &mut egui::Ui,
    state: CaptureState,
    has_frame: bool,
) -> CameraActions {
    let mut actions = CameraActions::default();
    let stopped = state == CaptureState::Stopped;
    let running = matches!(state, CaptureState::Starting | CaptureState::Streaming);

    ui.horizontal(|ui| {
        ui.add_enabled_ui(stopped, |ui| {
            if ui.button(RichText::new("▶ Start").size(15.0)).clicked() {
                actions.start = true;
            }
        });
        ui.add_enabled_ui(running, |ui| {
            if ui.button(RichText::new("◼ Stop").size(15.0)).clicked() {
                actions.stop = true;
            }
        });
        ui.add_enabled_ui(stopped, |ui| {
            if ui.button("📷 Capture Still").clicked() {
                actions.capture_still = true;
            }
        });

        ui.separator();

        // Save stays clickable so that an empty save can be refused with a status
        if ui.button("💾 Save Image").clicked() {
            actions.save_image = true;
        }
        ui.add_enabled_ui(has_frame, |ui| {
            if ui.button("🔍 Send to Analyzer").clicked() {
                actions.send_to_analyzer = true;
            }
        });
    });

    actions
}

/// Render the camera state line: state, source and frame counters.
pub fn render_camera_info(
    ui: &mut egui::Ui,
    state: CaptureState,
    source: Option<&str>,
    frames: u64,
    dropped: u64,
) {
    let color = match state {
        CaptureState::Stopped => Color32::GRAY,
        CaptureState::Starting | CaptureState::Stopping => Color32::from_rgb(200, 150, 0),
        CaptureState::Streaming => Color32::from_rgb(0, 120, 200),
    };

    ui.horizontal(|ui| {
        ui.label("State:");
        ui.label(RichText::new(state.description()).color(color));
        if let Some(source) = source {
            ui.separator();
            ui.label(source);
        }
        ui.separator();
        ui.label(format!("Frames: {}", frames));
        ui.label(format!("Dropped: {}", dropped));
    });
}

/// Converts an RGB image to an egui image.
pub fn to_color_image(image: &RgbImage) -> ColorImage {
    let size = [image.width() as usize, image.height() as usize];
    ColorImage::from_rgb(size, image.as_raw())
}

/// Uploads `image` into `slot`, reusing the texture when one exists.
pub fn update_texture(
    ctx: &egui::Context,
    slot: &mut Option<TextureHandle>,
    name: &str,
    image: ColorImage,
) {
    match slot {
        Some(texture) => texture.set(image, TextureOptions::LINEAR),
        None => *slot = Some(ctx.load_texture(name, image, TextureOptions::LINEAR)),
    }
}
