//! Summary statistics for a profile.
//!
//! Calculates mean, min, max, standard deviation and peak position.

use super::profile::ProfileSet;

/// Statistics for one profile.
#[derive(Debug, Clone)]
pub struct ProfileStats {
    /// Profile name ("Intensity", "Red", ...)
    pub name: String,
    /// Number of samples
    pub count: usize,
    /// Arithmetic mean
    pub mean: f64,
    /// Minimum sample
    pub min: f64,
    /// Maximum sample
    pub max: f64,
    /// Standard deviation (population)
    pub std_dev: f64,
    /// Index of the first maximum
    pub peak_index: usize,
}

/// Calculate statistics for every profile in the set, in column order.
pub fn profile_set_stats(set: &ProfileSet) -> Vec<ProfileStats> {
    set.profiles
        .iter()
        .map(|p| calculate_stats(&p.name, &p.samples))
        .collect()
}

/// Calculate statistics for a slice of samples.
pub fn calculate_stats(name: &str, samples: &[f64]) -> ProfileStats {
    if samples.is_empty() {
        return ProfileStats {
            name: name.to_string(),
            count: 0,
            mean: 0.0,
            min: 0.0,
            max: 0.0,
            std_dev: 0.0,
            peak_index: 0,
        };
    }

    let count = samples.len();
    let mean = samples.iter().sum::<f64>() / count as f64;
    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);

    // First occurrence wins on ties
    let (peak_index, max) = samples
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (i, v)| {
            if v > best.1 { (i, v) } else { best }
        });

    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

    ProfileStats {
        name: name.to_string(),
        count,
        mean,
        min,
        max,
        std_dev: variance.sqrt(),
        peak_index,
    }
}
