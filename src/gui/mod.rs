//! GUI module for the application.
//!
//! One eframe window with two views: the image analyzer and the camera.
//! Every error from the layers below ends up here as a status message.

pub mod analyzer;
pub mod camera;
pub mod coords;
pub mod render;
pub mod state;

use eframe::egui::{self, Vec2};

use crate::config::AppConfig;

use analyzer::AnalyzerPanel;
use camera::CameraPanel;
use state::{GuiState, View};

/// Main GUI application struct.
pub struct OpticLabApp {
    state: GuiState,
    analyzer: AnalyzerPanel,
    camera: CameraPanel,
}

impl OpticLabApp {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            state: GuiState::default(),
            analyzer: AnalyzerPanel::new(&config.analyzer, config.chart.clone()),
            camera: CameraPanel::new(&config.camera),
        }
    }
}

impl eframe::App for OpticLabApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // The camera keeps streaming while the analyzer is shown
        for message in self.camera.poll(ctx) {
            self.state.set_status(message);
        }

        egui::TopBottomPanel::top("view_tabs").show(ctx, |ui| {
            ui.add_space(4.0);
            render::render_view_tabs(ui, &mut self.state.view);
            ui.add_space(2.0);
        });

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            render::render_status_bar(ui, &self.state.status);
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.state.view {
            View::Analyzer => {
                if let Some(status) = self.analyzer.show(ui) {
                    self.state.set_status(status);
                }
            }
            View::Camera => {
                let response = self.camera.show(ui);
                if let Some(status) = response.status {
                    self.state.set_status(status);
                }
                if let Some(frame) = response.send_to_analyzer {
                    let status = self.analyzer.load_image(frame.to_dynamic(), &frame.label());
                    self.state.set_status(status);
                    self.state.view = View::Analyzer;
                    ctx.request_repaint();
                }
            }
        });
    }
}

/// Run the GUI application.
/// This function blocks until the window is closed.
pub fn run_gui(config: &AppConfig) -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(Vec2::new(config.window.width, config.window.height))
            .with_min_inner_size(Vec2::new(640.0, 480.0))
            .with_title("Optic Lab"),
        ..Default::default()
    };

    log::info!("Starting GUI...");
    let app = OpticLabApp::new(config);

    eframe::run_native(
        "Optic Lab",
        options,
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
