//! GUI application state.
//!
//! Tracks the active view and the status line shown at the bottom of the window.

use chrono::{DateTime, Local};
use eframe::egui::Color32;

/// Which tool is shown in the central panel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Analyzer,
    Camera,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Analyzer => "Image Analyzer",
            Self::Camera => "Camera",
        }
    }
}

/// Severity of a status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl StatusLevel {
    pub fn color(&self) -> Color32 {
        match self {
            Self::Info => Color32::GRAY,
            Self::Success => Color32::from_rgb(0, 150, 0),
            Self::Warning => Color32::from_rgb(200, 150, 0),
            Self::Error => Color32::from_rgb(200, 0, 0),
        }
    }
}

/// Shown when a save dialog is dismissed without picking a file.
pub const SAVE_CANCELLED: &str = "Save cancelled: no destination chosen";

/// One line of user-facing feedback.
#[derive(Clone, Debug)]
pub struct StatusMessage {
    pub text: String,
    pub level: StatusLevel,
    pub at: DateTime<Local>,
}

impl StatusMessage {
    pub fn new(level: StatusLevel, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level,
            at: Local::now(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Info, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Success, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(StatusLevel::Error, text)
    }

    /// Text shown in the status bar, prefixed with the time it was raised.
    pub fn status_text(&self) -> String {
        format!("[{}] {}", self.at.format("%H:%M:%S"), self.text)
    }
}

/// Top-level GUI state.
#[derive(Debug)]
pub struct GuiState {
    pub view: View,
    pub status: StatusMessage,
}

impl Default for GuiState {
    fn default() -> Self {
        Self {
            view: View::Analyzer,
            status: StatusMessage::info("Open an image or start the camera"),
        }
    }
}

impl GuiState {
    /// Replaces the status line and mirrors it to the log.
    pub fn set_status(&mut self, status: StatusMessage) {
        match status.level {
            StatusLevel::Error => log::error!("{}", status.text),
            StatusLevel::Warning => log::warn!("{}", status.text),
            StatusLevel::Info | StatusLevel::Success => log::info!("{}", status.text),
        }
        self.status = status;
    }
}
