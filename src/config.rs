//! Application configuration.
//!
//! Loads settings from config.json at startup. Every field has a default,
//! so a missing or partial file still yields a complete configuration.
//! Toggle state changed in the UI is never written back.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::analysis::{Axis, ChannelMode};

/// Global configuration instance, initialized once at startup.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Complete application configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Log level filter: "error", "warn", "info", "debug" or "trace"
    pub log_level: String,
    pub analyzer: AnalyzerConfig,
    pub camera: CameraConfig,
    pub chart: ChartConfig,
    pub window: WindowConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            analyzer: AnalyzerConfig::default(),
            camera: CameraConfig::default(),
            chart: ChartConfig::default(),
            window: WindowConfig::default(),
        }
    }
}

/// Initial toggle state for the image analyzer.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub default_mode: ChannelMode,
    pub default_axis: Axis,
}

/// Where camera frames come from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraBackend {
    /// Generated test pattern, no hardware needed
    #[default]
    Synthetic,
    /// Real camera (requires the `camera-device` feature)
    Device,
}

/// Camera and capture pipeline settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub backend: CameraBackend,
    /// Index of the camera device to open
    pub device_index: u32,
    /// Live preview resolution (width, height)
    pub preview_size: (u32, u32),
    /// One-shot still resolution (width, height)
    pub still_size: (u32, u32),
    /// Minimum time between frames for sources without their own pacing
    pub frame_interval_ms: u64,
    /// Frames discarded after opening while exposure settles
    pub warmup_frames: u32,
    /// Maximum time to wait for the camera to open (milliseconds)
    pub open_timeout_ms: u64,
    /// How often the UI drains the frame slot (milliseconds)
    pub poll_interval_ms: u64,
    /// How long stop waits for the acquisition thread (milliseconds)
    pub stop_grace_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            backend: CameraBackend::Synthetic,
            device_index: 0,
            preview_size: (640, 480),
            still_size: (1024, 768),
            frame_interval_ms: 33,
            warmup_frames: 3,
            open_timeout_ms: 30_000,
            poll_interval_ms: 20,
            stop_grace_ms: 500,
        }
    }
}

/// Profile plot styling.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// Rendered plot width in pixels
    pub width: u32,
    /// Rendered plot height in pixels
    pub height: u32,
    /// Title font size
    pub title_size: u32,
    /// Axis label font size
    pub label_size: u32,
    /// Background color [R, G, B]
    pub background: [u8; 3],
    /// Grid line color [R, G, B]
    pub grid_color: [u8; 3],
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: 900,
            height: 320,
            title_size: 20,
            label_size: 14,
            background: [255, 255, 255],
            grid_color: [220, 220, 220],
        }
    }
}

/// Initial window geometry.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width: f32,
    pub height: f32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1000.0,
            height: 900.0,
        }
    }
}

impl AppConfig {
    /// Log level as a `log` filter; unknown names fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// Loads configuration from `path`, or returns defaults.
///
/// Problems are returned as a message rather than logged, because this runs
/// before the logger exists (the log level lives in this file).
pub fn load_config_from(path: &Path) -> (AppConfig, Option<String>) {
    if !path.exists() {
        return (
            AppConfig::default(),
            Some(format!("{} not found. Using default config.", path.display())),
        );
    }

    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(config) => (config, None),
            Err(e) => (
                AppConfig::default(),
                Some(format!("Failed to parse {}: {}. Using defaults.", path.display(), e)),
            ),
        },
        Err(e) => (
            AppConfig::default(),
            Some(format!("Failed to read {}: {}. Using defaults.", path.display(), e)),
        ),
    }
}

/// Initializes the global configuration from config.json next to the executable.
///
/// Returns a warning to log once logging is up, if the file could not be used.
pub fn init_config() -> Option<String> {
    let (config, warning) = load_config_from(&crate::paths::get_config_path());
    let _ = CONFIG.set(config);
    warning
}

/// Returns the global configuration, or defaults if `init_config` was never called.
pub fn get_config() -> &'static AppConfig {
    CONFIG.get_or_init(AppConfig::default)
}
