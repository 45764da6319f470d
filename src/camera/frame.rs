//! Captured camera frames.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::path::Path;
use tempfile::NamedTempFile;

/// One frame from a frame source.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Full-resolution pixels, never scaled
    pub image: RgbImage,
    /// 1-based sequence number within one stream or still series
    pub sequence: u64,
    /// When the frame was grabbed
    pub captured_at: DateTime<Local>,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self {
            image,
            sequence,
            captured_at: Local::now(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Short description used as the analyzer's image source label.
    pub fn label(&self) -> String {
        format!(
            "Camera frame #{} ({})",
            self.sequence,
            self.captured_at.format("%H:%M:%S")
        )
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        DynamicImage::ImageRgb8(self.image.clone())
    }

    /// Writes the frame at full resolution; the format follows the extension.
    ///
    /// Encodes into a temporary file next to `path` and renames it into
    /// place, so a failed save leaves no partial image behind.
    pub fn save(&self, path: &Path) -> Result<()> {
        let format = ImageFormat::from_path(path)
            .context(format!("Unsupported image format: {}", path.display()))?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = NamedTempFile::new_in(dir)
            .context(format!("Failed to create temporary file in {}", dir.display()))?;
        self.image
            .write_to(tmp.as_file_mut(), format)
            .context(format!("Failed to encode frame as {:?}", format))?;
        tmp.as_file().sync_all().context("Failed to flush image data")?;
        tmp.persist(path)
            .map_err(|e| anyhow!("Failed to save image to {}: {}", path.display(), e.error))?;

        Ok(())
    }
}
