//! Frame sources.
//!
//! A source owns the camera (or whatever produces frames) from the moment it
//! is opened until it is dropped. The capture pipeline opens sources through
//! a [`SourceFactory`] so that tests can substitute their own.

use anyhow::Result;
use image::{Rgb, RgbImage};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::{CameraBackend, CameraConfig};

/// Something that yields RGB frames. Resources are released on drop.
pub trait FrameSource {
    /// Human-readable name for status messages.
    fn name(&self) -> &str;

    /// Blocks until the next frame is available.
    fn grab(&mut self) -> Result<RgbImage>;
}

/// Opens a frame source at the requested (width, height).
pub type SourceFactory = Arc<dyn Fn((u32, u32)) -> Result<Box<dyn FrameSource>> + Send + Sync>;

/// Moving test pattern, available without any hardware.
pub struct SyntheticSource {
    name: String,
    width: u32,
    height: u32,
    interval: Duration,
    tick: u32,
    last_grab: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(size: (u32, u32), interval: Duration) -> Self {
        Self {
            name: format!("Test pattern {}x{}", size.0, size.1),
            width: size.0.max(1),
            height: size.1.max(1),
            interval,
            tick: 0,
            last_grab: None,
        }
    }

    /// Horizontal gradient scrolling right, vertical green ramp, and a bright
    /// vertical bar sweeping across so profiles visibly change over time.
    fn render(&self) -> RgbImage {
        let (w, h) = (self.width, self.height);
        let bar_width = (w / 16).max(1);
        let shift = self.tick.wrapping_mul(2);
        let bar_x = self.tick.wrapping_mul(4) % w;

        RgbImage::from_fn(w, h, |x, y| {
            let red = ((x.wrapping_add(shift) % w) * 255 / w) as u8;
            let green = (y * 255 / h) as u8;
            let in_bar = x >= bar_x && x < bar_x + bar_width;
            let blue = if in_bar { 255 } else { 64 };
            Rgb([red, green, blue])
        })
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn grab(&mut self) -> Result<RgbImage> {
        if let Some(last) = self.last_grab {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                thread::sleep(self.interval - elapsed);
            }
        }
        self.last_grab = Some(Instant::now());

        let frame = self.render();
        self.tick = self.tick.wrapping_add(1);
        Ok(frame)
    }
}

#[cfg(feature = "camera-device")]
mod device {
    use anyhow::{anyhow, Result};
    use image::RgbImage;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    };
    use nokhwa::Camera;

    use super::FrameSource;

    /// A physical camera opened through nokhwa.
    pub struct DeviceSource {
        camera: Camera,
        name: String,
    }

    impl DeviceSource {
        pub fn open(index: u32, size: (u32, u32)) -> Result<Self> {
            let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(
                CameraFormat::new(Resolution::new(size.0, size.1), FrameFormat::MJPEG, 30),
            ));

            let mut camera = Camera::new(CameraIndex::Index(index), requested)
                .map_err(|e| anyhow!("Camera {} unavailable: {}", index, e))?;
            camera
                .open_stream()
                .map_err(|e| anyhow!("Failed to start camera {}: {}", index, e))?;

            let resolution = camera.resolution();
            let name = format!(
                "{} {}x{}",
                camera.info().human_name(),
                resolution.width(),
                resolution.height()
            );
            log::info!("Opened camera {}: {}", index, name);

            Ok(Self { camera, name })
        }
    }

    impl FrameSource for DeviceSource {
        fn name(&self) -> &str {
            &self.name
        }

        fn grab(&mut self) -> Result<RgbImage> {
            let buffer = self
                .camera
                .frame()
                .map_err(|e| anyhow!("Failed to read frame: {}", e))?;
            let decoded = buffer
                .decode_image::<RgbFormat>()
                .map_err(|e| anyhow!("Failed to decode frame: {}", e))?;

            // nokhwa links its own `image` version; move the raw bytes across
            let (width, height) = (decoded.width(), decoded.height());
            RgbImage::from_raw(width, height, decoded.into_raw())
                .ok_or_else(|| anyhow!("Frame buffer does not match {}x{}", width, height))
        }
    }

    impl Drop for DeviceSource {
        fn drop(&mut self) {
            if let Err(e) = self.camera.stop_stream() {
                log::warn!("Failed to release camera {}: {}", self.name, e);
            } else {
                log::debug!("Released camera {}", self.name);
            }
        }
    }
}

/// Opens the source selected by `config` at `size`.
pub fn open_source(config: &CameraConfig, size: (u32, u32)) -> Result<Box<dyn FrameSource>> {
    match config.backend {
        CameraBackend::Synthetic => Ok(Box::new(SyntheticSource::new(
            size,
            Duration::from_millis(config.frame_interval_ms),
        ))),
        CameraBackend::Device => open_device(config.device_index, size),
    }
}

#[cfg(feature = "camera-device")]
fn open_device(index: u32, size: (u32, u32)) -> Result<Box<dyn FrameSource>> {
    Ok(Box::new(device::DeviceSource::open(index, size)?))
}

#[cfg(not(feature = "camera-device"))]
fn open_device(index: u32, _size: (u32, u32)) -> Result<Box<dyn FrameSource>> {
    anyhow::bail!(
        "Camera {} unavailable: built without the camera-device feature",
        index
    )
}

/// Factory that opens sources according to `config`.
pub fn source_factory(config: CameraConfig) -> SourceFactory {
    Arc::new(move |size| open_source(&config, size))
}
