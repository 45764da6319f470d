//! Analyzer session: the image currently open plus everything derived from it.
//!
//! Pointer events go to the region selector; a finalized selection is turned
//! into profiles and an export table in one step, so the table always
//! matches the profiles on screen.

use anyhow::{bail, Context, Result};
use image::{DynamicImage, GenericImageView};
use std::path::{Path, PathBuf};

use super::charts;
use super::export::ExportTable;
use super::profile::{extract_profiles, Axis, ChannelMode, ProfileSet};
use super::selection::{BoundingBox, RegionSelector};
use super::statistics::{profile_set_stats, ProfileStats};
use crate::config::ChartConfig;

/// An image held by the session, with where it came from.
#[derive(Clone, Debug)]
pub struct LoadedImage {
    pub image: DynamicImage,
    /// File path, or a label such as "Camera frame #12"
    pub source: String,
    pub path: Option<PathBuf>,
}

impl LoadedImage {
    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Directory the image was opened from; `None` for in-memory images.
    pub fn directory(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
    }
}

/// State of the image analyzer view.
#[derive(Debug, Default)]
pub struct AnalyzerSession {
    image: Option<LoadedImage>,
    selector: RegionSelector,
    mode: ChannelMode,
    axis: Axis,
    profiles: Option<ProfileSet>,
    table: Option<ExportTable>,
}

impl AnalyzerSession {
    pub fn new(mode: ChannelMode, axis: Axis) -> Self {
        Self {
            mode,
            axis,
            ..Self::default()
        }
    }

    pub fn image(&self) -> Option<&LoadedImage> {
        self.image.as_ref()
    }

    pub fn selector(&self) -> &RegionSelector {
        &self.selector
    }

    pub fn mode(&self) -> ChannelMode {
        self.mode
    }

    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn profiles(&self) -> Option<&ProfileSet> {
        self.profiles.as_ref()
    }

    pub fn table(&self) -> Option<&ExportTable> {
        self.table.as_ref()
    }

    pub fn selection(&self) -> Option<BoundingBox> {
        self.selector.finalized()
    }

    /// Summary statistics for the current profiles, empty if there are none.
    pub fn stats(&self) -> Vec<ProfileStats> {
        self.profiles.as_ref().map(profile_set_stats).unwrap_or_default()
    }

    /// Decodes the image at `path` and makes it current.
    ///
    /// On failure the previous image, selection and profiles are kept.
    pub fn open_image(&mut self, path: &Path) -> Result<()> {
        let image = image::open(path)
            .context(format!("Failed to open image: {}", path.display()))?;
        if image.width() == 0 || image.height() == 0 {
            bail!("Image has no pixels: {}", path.display());
        }

        log::info!(
            "Opened {} ({}x{}, {:?})",
            path.display(),
            image.width(),
            image.height(),
            image.color()
        );
        self.replace_image(LoadedImage {
            image,
            source: path.display().to_string(),
            path: Some(path.to_path_buf()),
        });
        Ok(())
    }

    /// Makes an in-memory image current, e.g. a captured camera frame.
    pub fn load_image(&mut self, image: DynamicImage, label: &str) -> Result<()> {
        if image.width() == 0 || image.height() == 0 {
            bail!("Image has no pixels: {}", label);
        }

        log::info!("Loaded {} ({}x{})", label, image.width(), image.height());
        self.replace_image(LoadedImage {
            image,
            source: label.to_string(),
            path: None,
        });
        Ok(())
    }

    fn replace_image(&mut self, loaded: LoadedImage) {
        self.image = Some(loaded);
        self.selector.reset();
        self.profiles = None;
        self.table = None;
    }

    /// Pointer went down over the image, in image pixel coordinates.
    pub fn pointer_pressed(&mut self, x: f32, y: f32) {
        if self.image.is_some() {
            self.selector.press(x, y);
        }
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.selector.drag(x, y);
    }

    /// Pointer came up. Returns `Ok(true)` when a new selection was profiled.
    ///
    /// A zero-area release returns `Ok(false)` and leaves the current
    /// profiles and table untouched. If profiling fails the previous
    /// selection is restored along with them.
    pub fn pointer_released(&mut self, x: f32, y: f32) -> Result<bool> {
        let Some((width, height)) = self.image.as_ref().map(LoadedImage::dimensions) else {
            return Ok(false);
        };

        let previous = self.selector.clone();
        let Some(bbox) = self.selector.release(x, y, width, height) else {
            log::debug!("Selection rejected: zero area after clamping");
            return Ok(false);
        };

        match self.profile(bbox, self.mode, self.axis) {
            Ok(result) => {
                self.commit(result);
                Ok(true)
            }
            Err(e) => {
                self.selector = previous;
                Err(e)
            }
        }
    }

    /// Changes the channel mode, re-profiling the current selection.
    ///
    /// The mode only changes if re-profiling succeeds.
    pub fn set_mode(&mut self, mode: ChannelMode) -> Result<()> {
        if self.mode == mode {
            return Ok(());
        }
        self.reprofile(mode, self.axis)?;
        self.mode = mode;
        Ok(())
    }

    /// Changes the profile axis, re-profiling the current selection.
    pub fn set_axis(&mut self, axis: Axis) -> Result<()> {
        if self.axis == axis {
            return Ok(());
        }
        self.reprofile(self.mode, axis)?;
        self.axis = axis;
        Ok(())
    }

    fn reprofile(&mut self, mode: ChannelMode, axis: Axis) -> Result<()> {
        if let Some(bbox) = self.selector.finalized() {
            let result = self.profile(bbox, mode, axis)?;
            self.commit(result);
        }
        Ok(())
    }

    /// Extracts profiles for `bbox` and builds their table without touching the session.
    fn profile(
        &self,
        bbox: BoundingBox,
        mode: ChannelMode,
        axis: Axis,
    ) -> Result<(ProfileSet, ExportTable)> {
        let Some(loaded) = self.image.as_ref() else {
            bail!("No image loaded");
        };

        let set = extract_profiles(&loaded.image, &bbox, mode, axis)?;
        let table = ExportTable::from_columns(&set.columns())?;
        Ok((set, table))
    }

    fn commit(&mut self, (set, table): (ProfileSet, ExportTable)) {
        log::info!(
            "Profiled {} ({}, {}): {} samples",
            set.region,
            set.mode,
            set.axis,
            set.len()
        );
        self.profiles = Some(set);
        self.table = Some(table);
    }

    /// Writes the current table as CSV. Refused when nothing has been profiled.
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let Some(table) = self.table.as_ref().filter(|t| !t.is_empty()) else {
            bail!("No profile data to save. Select a region first.");
        };
        table.write_csv(path)?;
        log::info!("Profile data saved: {} ({} rows)", path.display(), table.len());
        Ok(())
    }

    /// Renders the current plot and writes it to `path`.
    pub fn save_chart(&self, path: &Path, config: &ChartConfig) -> Result<()> {
        let Some(set) = self.profiles.as_ref() else {
            bail!("No profile to plot. Select a region first.");
        };
        charts::save_profile_chart(set, config, path)?;
        log::info!("Plot saved: {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};
    use tempfile::tempdir;

    fn gray_4x2() -> DynamicImage {
        let rows = [[10u8, 20, 30, 40], [50, 60, 70, 80]];
        DynamicImage::ImageLuma8(GrayImage::from_fn(4, 2, |x, y| {
            Luma([rows[y as usize][x as usize]])
        }))
    }

    fn session_with_4x2() -> AnalyzerSession {
        let mut session = AnalyzerSession::default();
        session.load_image(gray_4x2(), "test").unwrap();
        session
    }

    fn drag(session: &mut AnalyzerSession, from: (f32, f32), to: (f32, f32)) -> Result<bool> {
        session.pointer_pressed(from.0, from.1);
        session.pointer_moved(to.0, to.1);
        session.pointer_released(to.0, to.1)
    }

    #[test]
    fn test_full_drag_produces_csv() {
        let mut session = session_with_4x2();
        assert!(drag(&mut session, (0.0, 0.0), (4.0, 2.0)).unwrap());

        let dir = tempdir().unwrap();
        let path = dir.path().join("profile.csv");
        session.save_csv(&path).unwrap();

        let csv = std::fs::read_to_string(&path).unwrap();
        assert_eq!(csv, "Index,Intensity\n0,30\n1,40\n2,50\n3,60\n");
    }

    #[test]
    fn test_reverse_drag_same_profile() {
        let mut forward = session_with_4x2();
        drag(&mut forward, (0.0, 0.0), (4.0, 2.0)).unwrap();
        let mut backward = session_with_4x2();
        drag(&mut backward, (4.0, 2.0), (0.0, 0.0)).unwrap();

        assert_eq!(forward.profiles(), backward.profiles());
    }

    #[test]
    fn test_zero_area_release_keeps_table() {
        let mut session = session_with_4x2();
        drag(&mut session, (0.0, 0.0), (4.0, 2.0)).unwrap();
        let before = session.table().cloned();

        assert!(!drag(&mut session, (1.0, 1.0), (1.0, 1.0)).unwrap());
        assert_eq!(session.table().cloned(), before);
        assert_eq!(
            session.selection(),
            Some(BoundingBox { x1: 0, y1: 0, x2: 4, y2: 2 })
        );
    }

    #[test]
    fn test_axis_toggle_reprofiles_selection() {
        let mut session = session_with_4x2();
        drag(&mut session, (0.0, 0.0), (4.0, 2.0)).unwrap();

        session.set_axis(Axis::Vertical).unwrap();
        let set = session.profiles().unwrap();
        assert_eq!(set.axis, Axis::Vertical);
        assert_eq!(set.profiles[0].samples, vec![25.0, 65.0]);
        assert_eq!(session.table().unwrap().len(), 2);
    }

    #[test]
    fn test_mode_toggle_rebuilds_table() {
        let mut session = session_with_4x2();
        drag(&mut session, (0.0, 0.0), (4.0, 2.0)).unwrap();

        session.set_mode(ChannelMode::Rgb).unwrap();
        let table = session.table().unwrap();
        assert_eq!(table.header, vec!["Index", "Red", "Green", "Blue"]);
        assert_eq!(table.rows[0].values, vec![30.0, 30.0, 30.0]);
    }

    #[test]
    fn test_failed_reprofile_keeps_mode_and_profiles() {
        let mut session = session_with_4x2();
        drag(&mut session, (0.0, 0.0), (4.0, 2.0)).unwrap();
        let before = session.profiles().cloned();

        // Swap in a smaller image behind the selector so the box no longer fits
        session.image = Some(LoadedImage {
            image: DynamicImage::ImageLuma8(GrayImage::new(2, 1)),
            source: "small".to_string(),
            path: None,
        });

        assert!(session.set_mode(ChannelMode::Rgb).is_err());
        assert_eq!(session.mode(), ChannelMode::Grayscale);
        assert!(session.set_axis(Axis::Vertical).is_err());
        assert_eq!(session.axis(), Axis::Horizontal);
        assert_eq!(session.profiles().cloned(), before);
        assert_eq!(
            session.selection(),
            Some(BoundingBox { x1: 0, y1: 0, x2: 4, y2: 2 })
        );
    }

    #[test]
    fn test_image_directory_only_for_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(2, 2, Luma([1])).save(&path).unwrap();

        let mut session = AnalyzerSession::default();
        session.open_image(&path).unwrap();
        assert_eq!(session.image().unwrap().directory(), Some(dir.path()));

        session.load_image(gray_4x2(), "Camera frame #1").unwrap();
        assert_eq!(session.image().unwrap().directory(), None);
    }

    #[test]
    fn test_toggle_without_selection_only_changes_state() {
        let mut session = session_with_4x2();
        session.set_mode(ChannelMode::Rgb).unwrap();
        assert_eq!(session.mode(), ChannelMode::Rgb);
        assert!(session.profiles().is_none());
    }

    #[test]
    fn test_save_csv_refused_without_table() {
        let session = session_with_4x2();
        let dir = tempdir().unwrap();
        let path = dir.path().join("none.csv");

        assert!(session.save_csv(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_image_resets_selection() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(8, 8, Luma([100])).save(&path).unwrap();

        let mut session = session_with_4x2();
        drag(&mut session, (0.0, 0.0), (4.0, 2.0)).unwrap();
        session.open_image(&path).unwrap();

        assert!(session.selection().is_none());
        assert!(session.table().is_none());
        assert_eq!(session.image().unwrap().dimensions(), (8, 8));
    }

    #[test]
    fn test_failed_open_keeps_state() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let mut session = session_with_4x2();
        drag(&mut session, (0.0, 0.0), (4.0, 2.0)).unwrap();

        assert!(session.open_image(&path).is_err());
        assert!(session.table().is_some());
        assert_eq!(session.image().unwrap().source, "test");
    }

    #[test]
    fn test_press_without_image_is_ignored() {
        let mut session = AnalyzerSession::default();
        session.pointer_pressed(1.0, 1.0);
        assert!(!session.pointer_released(3.0, 3.0).unwrap());
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_save_chart_refused_without_profiles() {
        let session = session_with_4x2();
        let dir = tempdir().unwrap();
        let path = dir.path().join("plot.png");

        assert!(session.save_chart(&path, &ChartConfig::default()).is_err());
        assert!(!path.exists());
    }
}
