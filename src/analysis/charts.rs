//! Profile plot rendering using plotters.
//!
//! Renders into an in-memory RGB buffer so the same picture can be shown in
//! the window and written to disk. Styling comes from the `chart` section
//! of config.json.

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use plotters::prelude::*;
use std::path::Path;

use super::profile::ProfileSet;
use crate::config::ChartConfig;

/// Line color for a profile, by name.
pub fn profile_color(name: &str) -> RGBColor {
    match name {
        "Red" => RGBColor(220, 30, 30),
        "Green" => RGBColor(30, 160, 30),
        "Blue" => RGBColor(30, 60, 220),
        _ => BLACK,
    }
}

/// Y axis range covering all samples with a little headroom.
fn value_range(set: &ProfileSet) -> (f64, f64) {
    let (min, max) = set
        .profiles
        .iter()
        .flat_map(|p| p.samples.iter().copied())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });

    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }

    let range = max - min;
    if range <= f64::EPSILON {
        return ((min - 1.0).max(0.0), max + 1.0);
    }
    ((min - range * 0.05).max(0.0), max + range * 0.05)
}

/// X axis range: sample indices, never collapsed to a single point.
fn index_range(set: &ProfileSet) -> (f64, f64) {
    let last = set.len().saturating_sub(1) as f64;
    (0.0, last.max(1.0))
}

/// Bytes needed for an RGB buffer of `width` x `height`.
fn buffer_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 3
}

/// Renders the profile plot into an RGB image.
pub fn render_profile_chart(set: &ProfileSet, config: &ChartConfig) -> Result<RgbImage> {
    if set.is_empty() {
        bail!("Profile has no samples to plot");
    }

    let (width, height) = (config.width.max(64), config.height.max(64));
    let mut buffer = vec![0u8; buffer_len(width, height)];

    {
        let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();

        let background = RGBColor(
            config.background[0],
            config.background[1],
            config.background[2],
        );
        let grid_color = RGBColor(
            config.grid_color[0],
            config.grid_color[1],
            config.grid_color[2],
        );

        root.fill(&background)
            .context("Failed to fill chart background")?;

        let (x_min, x_max) = index_range(set);
        let (y_min, y_max) = value_range(set);

        let mut chart = ChartBuilder::on(&root)
            .caption(
                format!("Average Intensity ({} Profile)", set.axis),
                ("sans-serif", config.title_size),
            )
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .context("Failed to build profile chart")?;

        chart
            .configure_mesh()
            .x_desc("Pixel Position")
            .y_desc("Avg Intensity (0-255)")
            .label_style(("sans-serif", config.label_size))
            .x_label_formatter(&|x| format!("{:.0}", x))
            .y_label_formatter(&|y| format!("{:.0}", y))
            .light_line_style(grid_color.mix(0.6))
            .bold_line_style(grid_color)
            .draw()
            .context("Failed to draw mesh")?;

        for profile in &set.profiles {
            let color = profile_color(&profile.name);
            chart
                .draw_series(LineSeries::new(
                    profile
                        .samples
                        .iter()
                        .enumerate()
                        .map(|(i, v)| (i as f64, *v)),
                    color.stroke_width(1),
                ))
                .context("Failed to draw profile line")?
                .label(profile.name.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        if set.profiles.len() > 1 {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .label_font(("sans-serif", config.label_size))
                .draw()
                .context("Failed to draw legend")?;
        }

        root.present().context("Failed to render chart")?;
    }

    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| anyhow!("Chart buffer does not match {}x{}", width, height))
}

/// Renders the profile plot and saves it; the format follows the file extension.
pub fn save_profile_chart(set: &ProfileSet, config: &ChartConfig, output_path: &Path) -> Result<()> {
    let chart = render_profile_chart(set, config)?;
    chart
        .save(output_path)
        .context(format!("Failed to save chart: {}", output_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::profile::{Axis, ChannelMode, Profile};
    use crate::analysis::selection::BoundingBox;

    fn set_with(samples: Vec<Vec<f64>>) -> ProfileSet {
        let names = ["Red", "Green", "Blue"];
        ProfileSet {
            mode: ChannelMode::Rgb,
            axis: Axis::Horizontal,
            region: BoundingBox { x1: 0, y1: 0, x2: 1, y2: 1 },
            profiles: samples
                .into_iter()
                .zip(names)
                .map(|(samples, name)| Profile { name: name.to_string(), samples })
                .collect(),
        }
    }

    #[test]
    fn test_value_range_pads_both_ends() {
        let set = set_with(vec![vec![100.0, 200.0], vec![150.0, 120.0]]);
        let (lo, hi) = value_range(&set);
        assert!((lo - 95.0).abs() < 1e-9);
        assert!((hi - 205.0).abs() < 1e-9);
    }

    #[test]
    fn test_value_range_flat_profile() {
        let set = set_with(vec![vec![0.0, 0.0, 0.0]]);
        assert_eq!(value_range(&set), (0.0, 1.0));
    }

    #[test]
    fn test_index_range_single_sample() {
        let set = set_with(vec![vec![42.0]]);
        assert_eq!(index_range(&set), (0.0, 1.0));

        let set = set_with(vec![vec![1.0; 10]]);
        assert_eq!(index_range(&set), (0.0, 9.0));
    }

    #[test]
    fn test_empty_profile_is_not_plotted() {
        let set = set_with(vec![vec![], vec![], vec![]]);
        let err = render_profile_chart(&set, &ChartConfig::default()).unwrap_err();
        assert!(err.to_string().contains("no samples"));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_buffer_len_does_not_wrap_u32() {
        assert_eq!(buffer_len(640, 480), 921_600);
        assert_eq!(buffer_len(70_000, 70_000), 14_700_000_000);
    }

    #[test]
    fn test_profile_colors() {
        let RGBColor(r, g, b) = profile_color("Red");
        assert_eq!((r, g, b), (220, 30, 30));
        let RGBColor(r, g, b) = profile_color("Intensity");
        assert_eq!((r, g, b), (0, 0, 0));
    }
}
