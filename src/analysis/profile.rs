//! Intensity profile extraction.
//!
//! Crops an image to a bounding box and averages it along one axis,
//! producing one profile per channel.

use anyhow::{bail, Result};
use image::{DynamicImage, GenericImageView};
use serde::{Deserialize, Serialize};

use super::selection::BoundingBox;

/// ITU-R BT.601 luma weights for R, G, B.
const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Which channels to profile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelMode {
    /// Single luma profile named "Intensity"
    #[default]
    Grayscale,
    /// Separate "Red", "Green" and "Blue" profiles
    Rgb,
}

/// Which axis the profile runs along.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    /// One sample per column, averaged over rows
    #[default]
    Horizontal,
    /// One sample per row, averaged over columns
    Vertical,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::Horizontal => write!(f, "Horizontal"),
            Axis::Vertical => write!(f, "Vertical"),
        }
    }
}

impl std::fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelMode::Grayscale => write!(f, "Grayscale"),
            ChannelMode::Rgb => write!(f, "RGB"),
        }
    }
}

/// A named sequence of averaged samples.
#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub name: String,
    pub samples: Vec<f64>,
}

/// All profiles from one extraction. Every profile has the same length.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfileSet {
    pub mode: ChannelMode,
    pub axis: Axis,
    pub region: BoundingBox,
    pub profiles: Vec<Profile>,
}

impl ProfileSet {
    /// Number of samples per profile.
    pub fn len(&self) -> usize {
        self.profiles.first().map_or(0, |p| p.samples.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// (name, samples) pairs in column order, as consumed by the exporter.
    pub fn columns(&self) -> Vec<(&str, &[f64])> {
        self.profiles
            .iter()
            .map(|p| (p.name.as_str(), p.samples.as_slice()))
            .collect()
    }
}

/// Extracts intensity profiles from `image` inside `bbox`.
///
/// The crop is half-open: pixels with `x < x2` and `y < y2` are included.
/// Fails if the box is empty or does not fit inside the image.
pub fn extract_profiles(
    image: &DynamicImage,
    bbox: &BoundingBox,
    mode: ChannelMode,
    axis: Axis,
) -> Result<ProfileSet> {
    let (width, height) = image.dimensions();
    if bbox.x2 <= bbox.x1 || bbox.y2 <= bbox.y1 {
        bail!("Selection {} has zero area", bbox);
    }
    if !bbox.fits_within(width, height) {
        bail!("Selection {} is outside the {}x{} image", bbox, width, height);
    }

    // Only the selected pixels are converted
    let crop = image.crop_imm(bbox.x1, bbox.y1, bbox.width(), bbox.height());

    let profiles = match mode {
        ChannelMode::Grayscale => {
            let samples = if crop.color().has_color() {
                let rgb = crop.to_rgb8();
                average_along(crop.dimensions(), axis, |x, y| luma(rgb.get_pixel(x, y).0))
            } else {
                let gray = crop.to_luma8();
                average_along(crop.dimensions(), axis, |x, y| gray.get_pixel(x, y).0[0] as f64)
            };
            vec![Profile {
                name: "Intensity".to_string(),
                samples,
            }]
        }
        ChannelMode::Rgb => {
            let rgb = crop.to_rgb8();
            ["Red", "Green", "Blue"]
                .iter()
                .enumerate()
                .map(|(channel, name)| Profile {
                    name: name.to_string(),
                    samples: average_along(crop.dimensions(), axis, |x, y| {
                        rgb.get_pixel(x, y).0[channel] as f64
                    }),
                })
                .collect()
        }
    };

    Ok(ProfileSet {
        mode,
        axis,
        region: *bbox,
        profiles,
    })
}

/// BT.601 luma of an 8-bit RGB triple.
pub fn luma(rgb: [u8; 3]) -> f64 {
    rgb.iter()
        .zip(LUMA_WEIGHTS)
        .map(|(&c, w)| c as f64 * w)
        .sum()
}

/// Averages `value(x, y)` over a `width` x `height` crop, collapsing the
/// axis orthogonal to `axis`.
fn average_along((width, height): (u32, u32), axis: Axis, value: impl Fn(u32, u32) -> f64) -> Vec<f64> {
    let (len, span) = match axis {
        Axis::Horizontal => (width, height),
        Axis::Vertical => (height, width),
    };

    let mut sums = vec![0.0f64; len as usize];
    for y in 0..height {
        for x in 0..width {
            let idx = match axis {
                Axis::Horizontal => x,
                Axis::Vertical => y,
            };
            sums[idx as usize] += value(x, y);
        }
    }

    let count = span as f64;
    sums.into_iter().map(|s| s / count).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};

    fn gray_4x2() -> DynamicImage {
        let mut img = GrayImage::new(4, 2);
        for (x, v) in [10u8, 20, 30, 40].iter().enumerate() {
            img.put_pixel(x as u32, 0, Luma([*v]));
        }
        for (x, v) in [50u8, 60, 70, 80].iter().enumerate() {
            img.put_pixel(x as u32, 1, Luma([*v]));
        }
        DynamicImage::ImageLuma8(img)
    }

    fn full(image: &DynamicImage) -> BoundingBox {
        BoundingBox { x1: 0, y1: 0, x2: image.width(), y2: image.height() }
    }

    #[test]
    fn test_grayscale_horizontal_column_means() {
        let img = gray_4x2();
        let set = extract_profiles(&img, &full(&img), ChannelMode::Grayscale, Axis::Horizontal)
            .unwrap();

        assert_eq!(set.profiles.len(), 1);
        assert_eq!(set.profiles[0].name, "Intensity");
        assert_eq!(set.profiles[0].samples, vec![30.0, 40.0, 50.0, 60.0]);
    }

    #[test]
    fn test_grayscale_vertical_row_means() {
        let img = gray_4x2();
        let set = extract_profiles(&img, &full(&img), ChannelMode::Grayscale, Axis::Vertical)
            .unwrap();

        assert_eq!(set.profiles[0].samples, vec![25.0, 65.0]);
    }

    #[test]
    fn test_rgb_two_pixel_region() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([255, 0, 0]));
        img.put_pixel(1, 0, Rgb([0, 255, 0]));
        let img = DynamicImage::ImageRgb8(img);

        let set = extract_profiles(&img, &full(&img), ChannelMode::Rgb, Axis::Horizontal).unwrap();

        assert_eq!(set.profiles[0].samples, vec![255.0, 0.0]);
        assert_eq!(set.profiles[1].samples, vec![0.0, 255.0]);
        assert_eq!(set.profiles[2].samples, vec![0.0, 0.0]);
        let names: Vec<_> = set.profiles.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Red", "Green", "Blue"]);
    }

    #[test]
    fn test_output_length_matches_box() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(37, 23, |x, y| {
            Rgb([(x * 7) as u8, (y * 11) as u8, ((x + y) * 3) as u8])
        }));
        let boxes = [
            BoundingBox { x1: 0, y1: 0, x2: 37, y2: 23 },
            BoundingBox { x1: 5, y1: 3, x2: 6, y2: 4 },
            BoundingBox { x1: 10, y1: 2, x2: 31, y2: 20 },
            BoundingBox { x1: 36, y1: 0, x2: 37, y2: 23 },
        ];

        for bbox in boxes {
            for mode in [ChannelMode::Grayscale, ChannelMode::Rgb] {
                let h = extract_profiles(&img, &bbox, mode, Axis::Horizontal).unwrap();
                let v = extract_profiles(&img, &bbox, mode, Axis::Vertical).unwrap();
                for p in &h.profiles {
                    assert_eq!(p.samples.len(), bbox.width() as usize);
                }
                for p in &v.profiles {
                    assert_eq!(p.samples.len(), bbox.height() as usize);
                }
            }
        }
    }

    #[test]
    fn test_crop_excludes_high_edge() {
        // Column 2 is bright, but the box stops at x2 = 2
        let img = DynamicImage::ImageLuma8(GrayImage::from_fn(3, 1, |x, _| {
            Luma([if x == 2 { 255 } else { 0 }])
        }));
        let bbox = BoundingBox { x1: 0, y1: 0, x2: 2, y2: 1 };
        let set = extract_profiles(&img, &bbox, ChannelMode::Grayscale, Axis::Horizontal).unwrap();
        assert_eq!(set.profiles[0].samples, vec![0.0, 0.0]);
    }

    #[test]
    fn test_interior_box_uses_box_offset() {
        let img = gray_4x2();
        let columns = BoundingBox { x1: 1, y1: 0, x2: 3, y2: 2 };
        let set = extract_profiles(&img, &columns, ChannelMode::Grayscale, Axis::Horizontal)
            .unwrap();
        assert_eq!(set.profiles[0].samples, vec![40.0, 50.0]);

        let lower_row = BoundingBox { x1: 1, y1: 1, x2: 3, y2: 2 };
        let set = extract_profiles(&img, &lower_row, ChannelMode::Rgb, Axis::Vertical).unwrap();
        for p in &set.profiles {
            assert_eq!(p.samples, vec![65.0]);
        }
    }

    #[test]
    fn test_grayscale_of_color_uses_luma() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([255, 0, 0, 10])));
        let bbox = BoundingBox { x1: 0, y1: 0, x2: 1, y2: 1 };
        let set = extract_profiles(&img, &bbox, ChannelMode::Grayscale, Axis::Horizontal).unwrap();
        assert!((set.profiles[0].samples[0] - 76.245).abs() < 1e-9);
    }

    #[test]
    fn test_rgb_mode_on_gray_source_replicates_channels() {
        let img = gray_4x2();
        let set = extract_profiles(&img, &full(&img), ChannelMode::Rgb, Axis::Horizontal).unwrap();
        for p in &set.profiles {
            assert_eq!(p.samples, vec![30.0, 40.0, 50.0, 60.0]);
        }
    }

    #[test]
    fn test_zero_area_box_fails() {
        let img = gray_4x2();
        let bbox = BoundingBox { x1: 2, y1: 0, x2: 2, y2: 2 };
        assert!(extract_profiles(&img, &bbox, ChannelMode::Grayscale, Axis::Horizontal).is_err());
    }

    #[test]
    fn test_box_outside_image_fails() {
        let img = gray_4x2();
        let bbox = BoundingBox { x1: 0, y1: 0, x2: 5, y2: 2 };
        let err = extract_profiles(&img, &bbox, ChannelMode::Rgb, Axis::Vertical).unwrap_err();
        assert!(err.to_string().contains("outside"));
    }

    #[test]
    fn test_extraction_does_not_mutate_source() {
        let img = gray_4x2();
        let before = img.clone();
        let _ = extract_profiles(&img, &full(&img), ChannelMode::Rgb, Axis::Vertical).unwrap();
        assert_eq!(img, before);
    }
}
