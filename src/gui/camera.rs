//! Camera view: live preview, still capture and frame export.

use std::time::Duration;

use eframe::egui::{self, TextureHandle};

use super::coords::fit_size;
use super::render::{self, to_color_image, update_texture};
use super::state::{StatusMessage, SAVE_CANCELLED};
use crate::camera::{CapturePipeline, Frame, PipelineEvent};
use crate::config::CameraConfig;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// What the camera view asks the application to do.
#[derive(Default)]
pub struct CameraResponse {
    pub status: Option<StatusMessage>,
    /// Frame the user wants analyzed
    pub send_to_analyzer: Option<Frame>,
}

pub struct CameraPanel {
    pipeline: CapturePipeline,
    preview: Option<TextureHandle>,
    poll_interval: Duration,
}

impl CameraPanel {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            pipeline: CapturePipeline::from_config(config),
            preview: None,
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }

    /// Drains pipeline events. Call every frame, whichever view is visible.
    ///
    /// Returns the status messages raised, most recent last.
    pub fn poll(&mut self, ctx: &egui::Context) -> Vec<StatusMessage> {
        let mut messages = Vec::new();
        let mut failed = false;

        for event in self.pipeline.poll() {
            match event {
                PipelineEvent::Started { source } => {
                    messages.push(StatusMessage::success(format!("Streaming from {}", source)));
                }
                PipelineEvent::NewFrame => self.refresh_preview(ctx),
                PipelineEvent::Error(msg) => {
                    failed = true;
                    messages.push(StatusMessage::error(format!("Camera error: {}", msg)));
                }
                PipelineEvent::Stopped => {
                    if !failed {
                        messages.push(StatusMessage::info(format!(
                            "Camera stopped ({} frames, {} dropped)",
                            self.pipeline.frames_received(),
                            self.pipeline.frames_dropped()
                        )));
                    }
                }
            }
        }

        if !self.pipeline.is_stopped() {
            ctx.request_repaint_after(self.poll_interval);
        }

        messages
    }

    pub fn show(&mut self, ui: &mut egui::Ui) -> CameraResponse {
        let mut response = CameraResponse::default();

        let actions = render::render_camera_controls(
            ui,
            self.pipeline.state(),
            self.pipeline.latest_frame().is_some(),
        );

        if actions.start {
            response.status = Some(self.handle_start());
            ui.ctx().request_repaint();
        }
        if actions.stop && self.pipeline.stop() {
            response.status = Some(StatusMessage::info("Stopping camera..."));
            ui.ctx().request_repaint();
        }
        if actions.capture_still {
            response.status = Some(self.handle_capture_still(ui.ctx()));
        }
        if actions.save_image {
            response.status = Some(self.handle_save());
        }
        if actions.send_to_analyzer {
            response.send_to_analyzer = self.pipeline.latest_frame().cloned();
        }

        render::render_camera_info(
            ui,
            self.pipeline.state(),
            self.pipeline.source_name(),
            self.pipeline.frames_received(),
            self.pipeline.frames_dropped(),
        );
        ui.separator();

        match &self.preview {
            Some(texture) => {
                let size = fit_size(
                    (texture.size()[0] as u32, texture.size()[1] as u32),
                    ui.available_size(),
                );
                ui.centered_and_justified(|ui| {
                    ui.image((texture.id(), size));
                });
            }
            None => {
                ui.centered_and_justified(|ui| {
                    ui.label("No frame yet. Press Start or Capture Still.");
                });
            }
        }

        response
    }

    fn handle_start(&mut self) -> StatusMessage {
        match self.pipeline.start() {
            Ok(true) => StatusMessage::info("Starting camera..."),
            Ok(false) => StatusMessage::info("Camera is already running"),
            Err(e) => StatusMessage::error(format!("Failed to start camera: {:#}", e)),
        }
    }

    fn handle_capture_still(&mut self, ctx: &egui::Context) -> StatusMessage {
        match self.pipeline.capture_still() {
            Ok(frame) => {
                let (w, h) = frame.dimensions();
                let message = StatusMessage::success(format!("Captured still {}x{}", w, h));
                self.refresh_preview(ctx);
                message
            }
            Err(e) => StatusMessage::error(format!("Capture failed: {:#}", e)),
        }
    }

    /// Exports the retained frame. Refused with a status when there is none
    /// or when the dialog is dismissed.
    fn handle_save(&mut self) -> StatusMessage {
        if self.pipeline.latest_frame().is_none() {
            return StatusMessage::error("No image data to save!");
        }

        let default_name = format!(
            "capture_{}.png",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let Some(path) = rfd::FileDialog::new()
            .set_title("Save Image")
            .add_filter("Images", IMAGE_EXTENSIONS)
            .set_directory(crate::paths::get_captures_dir())
            .set_file_name(default_name)
            .save_file()
        else {
            return StatusMessage::warning(SAVE_CANCELLED);
        };

        match self.pipeline.save_current_frame(&path) {
            Ok(()) => StatusMessage::success(format!("Image saved to {}", path.display())),
            Err(e) => StatusMessage::error(format!("{:#}", e)),
        }
    }

    fn refresh_preview(&mut self, ctx: &egui::Context) {
        if let Some(frame) = self.pipeline.latest_frame() {
            let image = to_color_image(&frame.image);
            update_texture(ctx, &mut self.preview, "camera_preview", image);
        }
    }
}
