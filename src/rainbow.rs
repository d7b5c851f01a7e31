// src/rainbow.rs
// Geometric-optics rainbow model: deflection angles of sunlight through a
// spherical droplet for one and two internal reflections, scanned over the
// normalized impact parameter, plus the derived scattering intensity.

use serde::{Deserialize, Serialize};
use thiserror::Error;

fn default_refractive_index_red() -> f64 {
    1.331
}

fn default_refractive_index_purple() -> f64 {
    1.343
}

fn default_resolution() -> usize {
    10_000
}

/// Scan parameters for the two sampled wavelengths.
#[derive(Debug, Clone, Deserialize)]
pub struct RainbowConfig {
    #[serde(default = "default_refractive_index_red")]
    pub refractive_index_red: f64,
    #[serde(default = "default_refractive_index_purple")]
    pub refractive_index_purple: f64,
    /// Number of uniform impact-parameter samples over `[0, 1)`.
    #[serde(default = "default_resolution")]
    pub resolution: usize,
}

impl Default for RainbowConfig {
    fn default() -> Self {
        Self {
            refractive_index_red: default_refractive_index_red(),
            refractive_index_purple: default_refractive_index_purple(),
            resolution: default_resolution(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RainbowError {
    #[error("inverse sine argument {0} lies outside [-1, 1]")]
    AsinDomain(f64),
}

/// `asin` that fails fast instead of returning NaN. The deflection formulas
/// perform no clamping, so out-of-range impact parameters must be rejected
/// here.
fn checked_asin(x: f64) -> Result<f64, RainbowError> {
    if !(-1.0..=1.0).contains(&x) {
        return Err(RainbowError::AsinDomain(x));
    }
    Ok(x.asin())
}

/// Deflection angle in degrees for the single-internal-reflection path:
/// `4*asin(y/n) - 2*asin(y)`.
pub fn deflection_primary(y: f64, n: f64) -> Result<f64, RainbowError> {
    Ok((4.0 * checked_asin(y / n)? - 2.0 * checked_asin(y)?).to_degrees())
}

/// Deflection angle in degrees for the double-internal-reflection path,
/// evaluated on the mirrored branch with `-y` substituted:
/// `pi + 6*asin(-y/n) - 2*asin(-y)`.
pub fn deflection_secondary(y: f64, n: f64) -> Result<f64, RainbowError> {
    Ok((std::f64::consts::PI + 6.0 * checked_asin(-y / n)? - 2.0 * checked_asin(-y)?)
        .to_degrees())
}

/// One full scan: the `y` samples and the four deflection curves, all in
/// degrees and all of equal length.
#[derive(Debug, Clone)]
pub struct RainbowScan {
    pub y: Vec<f64>,
    pub primary_red: Vec<f64>,
    pub primary_purple: Vec<f64>,
    pub secondary_red: Vec<f64>,
    pub secondary_purple: Vec<f64>,
}

impl RainbowScan {
    /// Uniform spacing of the `y` samples.
    pub fn sample_step(&self) -> f64 {
        1.0 / self.y.len() as f64
    }
}

/// Sample the four deflection curves at `y = i / resolution` for
/// `i in 0..resolution`. The `y = 0` boundary sample is tolerated:
/// `asin(0) = 0` is well defined even though the physical domain is the
/// open interval.
pub fn generate_scan(config: &RainbowConfig) -> Result<RainbowScan, RainbowError> {
    let resolution = config.resolution;
    let mut scan = RainbowScan {
        y: Vec::with_capacity(resolution),
        primary_red: Vec::with_capacity(resolution),
        primary_purple: Vec::with_capacity(resolution),
        secondary_red: Vec::with_capacity(resolution),
        secondary_purple: Vec::with_capacity(resolution),
    };
    for i in 0..resolution {
        let y = i as f64 / resolution as f64;
        scan.y.push(y);
        scan.primary_red
            .push(deflection_primary(y, config.refractive_index_red)?);
        scan.primary_purple
            .push(deflection_primary(y, config.refractive_index_purple)?);
        scan.secondary_red
            .push(deflection_secondary(y, config.refractive_index_red)?);
        scan.secondary_purple
            .push(deflection_secondary(y, config.refractive_index_purple)?);
    }
    Ok(scan)
}

fn round4(x: f64) -> f64 {
    (x * 1e4).round() / 1e4
}

/// Scattering intensity from the local slope of the deflection curve:
/// `intensity[i] = dy / (angle[i+1] - angle[i])`, rounded to 4 decimals.
/// Output has one fewer element than the input. A locally flat curve yields
/// `±inf`; that marks the caustic and is left for the reporting layer to
/// interpret rather than treated as fatal.
pub fn derive_intensity(angles: &[f64], dy: f64) -> Vec<f64> {
    angles
        .windows(2)
        .map(|pair| round4(dy / (pair[1] - pair[0])))
        .collect()
}

/// Extrema of one intensity curve and the deflection angle at the intensity
/// maximum (the rainbow angle).
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CurveSummary {
    pub max_intensity: f64,
    pub min_intensity: f64,
    /// Deflection angle at maximum intensity, degrees.
    pub rainbow_angle: f64,
}

/// Reduce an intensity curve to its summary. Non-finite samples mark the
/// caustic itself and are excluded from the extrema scan. Returns `None`
/// when no finite sample exists.
pub fn summarize(angles: &[f64], intensities: &[f64]) -> Option<CurveSummary> {
    let mut best: Option<(usize, f64)> = None;
    let mut min = f64::INFINITY;
    for (i, &value) in intensities.iter().enumerate() {
        if !value.is_finite() {
            continue;
        }
        min = min.min(value);
        if best.map_or(true, |(_, max)| value > max) {
            best = Some((i, value));
        }
    }
    best.map(|(i, max)| CurveSummary {
        max_intensity: max,
        min_intensity: min,
        rainbow_angle: round4(angles[i]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn primary_deflection_matches_the_pinned_value() {
        let angle = deflection_primary(0.5, 1.331).unwrap();
        let expected = (4.0 * (0.5_f64 / 1.331).asin() - 2.0 * 0.5_f64.asin()).to_degrees();
        assert_relative_eq!(angle, expected, epsilon = 1e-9);
        assert_relative_eq!(angle, 28.259800087434066, epsilon = 1e-9);
    }

    #[test]
    fn out_of_range_impact_parameter_is_a_domain_error() {
        assert!(matches!(
            deflection_primary(1.5, 1.331),
            Err(RainbowError::AsinDomain(_))
        ));
        assert!(matches!(
            deflection_secondary(1.5, 1.331),
            Err(RainbowError::AsinDomain(_))
        ));
        // y itself in range but y/n outside: n < y < 1 is impossible for
        // n > 1, so drive it with n < 1.
        assert!(matches!(
            deflection_primary(0.9, 0.8),
            Err(RainbowError::AsinDomain(_))
        ));
    }

    #[test]
    fn secondary_is_the_mirrored_offset_of_the_ascending_terms() {
        // pi + 6*asin(-y/n) - 2*asin(-y) == pi - (6*asin(y/n) - 2*asin(y))
        let n = 1.331;
        for i in 1..100 {
            let y = i as f64 / 100.0;
            let lhs = deflection_secondary(y, n).unwrap();
            let rhs = 180.0 - (6.0 * (y / n).asin() - 2.0 * y.asin()).to_degrees();
            assert_relative_eq!(lhs, rhs, epsilon = 1e-9);
        }
    }

    #[test]
    fn scan_samples_the_unit_interval_uniformly() {
        let config = RainbowConfig {
            resolution: 500,
            ..RainbowConfig::default()
        };
        let scan = generate_scan(&config).unwrap();
        assert_eq!(scan.y.len(), 500);
        assert_eq!(scan.primary_red.len(), 500);
        assert_eq!(scan.primary_purple.len(), 500);
        assert_eq!(scan.secondary_red.len(), 500);
        assert_eq!(scan.secondary_purple.len(), 500);
        assert_eq!(scan.y[0], 0.0);
        assert_relative_eq!(scan.y[499], 499.0 / 500.0, epsilon = 1e-12);
        assert_relative_eq!(scan.sample_step(), 1.0 / 500.0, epsilon = 1e-12);
        // The boundary sample is the straight-through ray.
        assert_eq!(scan.primary_red[0], 0.0);
        assert_relative_eq!(scan.secondary_red[0], 180.0, epsilon = 1e-12);
    }

    #[test]
    fn intensity_has_one_fewer_sample_than_the_angles() {
        let angles = vec![0.0, 1.0, 3.0, 6.0, 10.0];
        let intensity = derive_intensity(&angles, 0.25);
        assert_eq!(intensity.len(), angles.len() - 1);
        assert_relative_eq!(intensity[0], 0.25, epsilon = 1e-12);
    }

    #[test]
    fn intensity_is_rounded_to_four_decimals() {
        let intensity = derive_intensity(&[0.0, 3.0], 1.0);
        assert_eq!(intensity, vec![0.3333]);
    }

    #[test]
    fn flat_deflection_yields_an_infinite_caustic_marker() {
        let intensity = derive_intensity(&[5.0, 5.0, 6.0], 0.1);
        assert!(intensity[0].is_infinite());
        assert!(intensity[1].is_finite());
        // The summary skips the marker instead of propagating it.
        let summary = summarize(&[5.0, 5.0, 6.0], &intensity).unwrap();
        assert_relative_eq!(summary.max_intensity, 0.1, epsilon = 1e-12);
        assert_relative_eq!(summary.rainbow_angle, 5.0, epsilon = 1e-12);
    }

    #[test]
    fn summary_of_all_caustic_markers_is_none() {
        let intensity = derive_intensity(&[1.0, 1.0, 1.0], 0.1);
        assert!(summarize(&[1.0, 1.0, 1.0], &intensity).is_none());
    }

    #[test]
    fn default_scan_recovers_the_known_rainbow_angles() {
        let config = RainbowConfig::default();
        let scan = generate_scan(&config).unwrap();
        let dy = scan.sample_step();

        let primary_red = summarize(
            &scan.primary_red,
            &derive_intensity(&scan.primary_red, dy),
        )
        .unwrap();
        let primary_purple = summarize(
            &scan.primary_purple,
            &derive_intensity(&scan.primary_purple, dy),
        )
        .unwrap();
        let secondary_red = summarize(
            &scan.secondary_red,
            &derive_intensity(&scan.secondary_red, dy),
        )
        .unwrap();
        let secondary_purple = summarize(
            &scan.secondary_purple,
            &derive_intensity(&scan.secondary_purple, dy),
        )
        .unwrap();

        assert_relative_eq!(primary_red.rainbow_angle, 42.3698, epsilon = 1e-3);
        assert_relative_eq!(primary_purple.rainbow_angle, 40.6459, epsilon = 1e-3);
        assert_relative_eq!(secondary_red.rainbow_angle, 50.3651, epsilon = 1e-3);
        assert_relative_eq!(secondary_purple.rainbow_angle, 53.4778, epsilon = 1e-3);
        // Red bends less than purple on the primary bow and more on the
        // secondary bow.
        assert!(primary_red.rainbow_angle > primary_purple.rainbow_angle);
        assert!(secondary_red.rainbow_angle < secondary_purple.rainbow_angle);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: RainbowConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.refractive_index_red, 1.331);
        assert_eq!(config.refractive_index_purple, 1.343);
        assert_eq!(config.resolution, 10_000);
    }
}
