//! Image analysis: region selection, profile extraction and export.
//!
//! This module provides:
//! - Pointer-driven bounding box selection
//! - Grayscale and per-channel intensity profiles along either axis
//! - Row-oriented CSV export
//! - Summary statistics and plot rendering
//! - The analyzer session tying these together

pub mod charts;
pub mod export;
pub mod profile;
pub mod selection;
pub mod session;
pub mod statistics;

pub use profile::{Axis, ChannelMode};
pub use session::AnalyzerSession;
pub use statistics::ProfileStats;
