//! Camera capture.
//!
//! This module provides:
//! - Frame sources (synthetic test pattern, physical camera behind the
//!   `camera-device` feature)
//! - The one-slot drop-oldest buffer between acquisition and display
//! - The live capture pipeline with still capture and frame export

pub mod frame;
pub mod pipeline;
pub mod slot;
pub mod source;

pub use frame::Frame;
pub use pipeline::{CapturePipeline, CaptureState, PipelineEvent};
