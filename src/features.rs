//! Window feature extraction
//!
//! Computes the fixed-order numeric feature vector the classifier
//! artifact was trained against: per-axis time-domain statistics,
//! DFT-based frequency features, world-frame (orientation-invariant)
//! acceleration statistics, and cross-channel magnitudes. The emission
//! order below is a contract shared with the training pipeline; adding,
//! removing, or reordering entries requires re-validating the artifact.
//!
//! Degenerate windows are handled by omission, not by faulting: an empty
//! channel contributes no entries and alignment zero-fills them.

use crate::buffer::{TimedQuat, TimedVec3, WindowSnapshot};

/// Ordered feature-name -> value mapping, fresh per extraction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureVector {
    entries: Vec<(String, f64)>,
}

impl FeatureVector {
    pub fn push(&mut self, name: impl Into<String>, value: f64) {
        self.entries.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Re-index against the classifier's declared feature order.
    ///
    /// Positions follow `order` exactly; names this window did not
    /// produce are zero-filled, extras are ignored. Mirrors the training
    /// side's re-indexing so positions always line up with the artifact.
    pub fn aligned(&self, order: &[String]) -> Vec<f64> {
        order
            .iter()
            .map(|name| self.get(name).unwrap_or(0.0))
            .collect()
    }
}

// ---------------------------------------------------------------------
// Scalar statistics over one axis
// ---------------------------------------------------------------------

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1 denominator); 0 for fewer than two
/// samples or zero spread.
fn std_dev(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m) * (v - m)).sum();
    (ss / (n - 1) as f64).sqrt()
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn central_moment(values: &[f64], order: i32) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(order)).sum::<f64>() / values.len() as f64
}

/// Population (biased) Fisher-Pearson skewness; 0 on zero spread.
fn skewness(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m2 = central_moment(values, 2);
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    central_moment(values, 3) / m2.powf(1.5)
}

/// Population excess kurtosis (Fisher definition); 0 on zero spread.
fn kurtosis(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m2 = central_moment(values, 2);
    if m2 <= f64::EPSILON {
        return 0.0;
    }
    central_moment(values, 4) / (m2 * m2) - 3.0
}

fn rms(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
}

/// Samples exceeding mean + 2 sigma.
fn peak_count(values: &[f64]) -> f64 {
    let threshold = mean(values) + 2.0 * std_dev(values);
    values.iter().filter(|&&v| v > threshold).count() as f64
}

/// DFT magnitude spectrum, first half (bins 0..n/2, DC included).
///
/// Windows are at most a few hundred samples, so the direct O(n²)
/// transform is cheap enough per extraction.
fn dft_magnitudes(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let half = n / 2;
    let mut out = Vec::with_capacity(half);
    for k in 0..half {
        let mut re = 0.0;
        let mut im = 0.0;
        for (i, &v) in values.iter().enumerate() {
            let angle = -2.0 * std::f64::consts::PI * (k as f64) * (i as f64) / n as f64;
            re += v * angle.cos();
            im += v * angle.sin();
        }
        out.push((re * re + im * im).sqrt());
    }
    out
}

fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

// ---------------------------------------------------------------------
// Window extraction
// ---------------------------------------------------------------------

const ACCEL_AXES: [&str; 3] = ["accel_x", "accel_y", "accel_z"];
const WORLD_AXES: [&str; 3] = ["world_accel_x", "world_accel_y", "world_accel_z"];
const GYRO_AXES: [&str; 3] = ["gyro_x", "gyro_y", "gyro_z"];
const ROT_COMPONENTS: [&str; 4] = ["rot_x", "rot_y", "rot_z", "rot_w"];

/// Rotate each acceleration sample by the orientation sample nearest in
/// time. Both sequences are insertion-ordered by timestamp, so a single
/// forward pass pairs them.
fn world_frame_accel(accel: &[TimedVec3], orientation: &[TimedQuat]) -> Vec<[f64; 3]> {
    if orientation.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(accel.len());
    let mut cursor = 0usize;
    for sample in accel {
        while cursor + 1 < orientation.len()
            && (orientation[cursor + 1].timestamp - sample.timestamp).abs()
                <= (orientation[cursor].timestamp - sample.timestamp).abs()
        {
            cursor += 1;
        }
        out.push(orientation[cursor].q.rotate(sample.v));
    }
    out
}

fn axis_values(samples: &[TimedVec3], axis: usize) -> Vec<f64> {
    samples.iter().map(|s| s.v[axis]).collect()
}

fn magnitudes(samples: &[TimedVec3]) -> Vec<f64> {
    samples
        .iter()
        .map(|s| (s.v[0] * s.v[0] + s.v[1] * s.v[1] + s.v[2] * s.v[2]).sqrt())
        .collect()
}

/// Extract the full fixed-order feature vector from one window snapshot.
pub fn extract_features(snapshot: &WindowSnapshot) -> FeatureVector {
    let mut features = FeatureVector::default();

    // Local-frame acceleration, per axis.
    if !snapshot.accel.is_empty() {
        for (axis, name) in ACCEL_AXES.iter().enumerate() {
            let values = axis_values(&snapshot.accel, axis);
            features.push(format!("{}_mean", name), mean(&values));
            features.push(format!("{}_std", name), std_dev(&values));
            features.push(format!("{}_max", name), max(&values));
            features.push(format!("{}_min", name), min(&values));
            features.push(format!("{}_range", name), max(&values) - min(&values));
            features.push(format!("{}_median", name), median(&values));
            features.push(format!("{}_skew", name), skewness(&values));
            features.push(format!("{}_kurtosis", name), kurtosis(&values));
            features.push(format!("{}_peak_count", name), peak_count(&values));
            if values.len() > 2 {
                let spectrum = dft_magnitudes(&values);
                if !spectrum.is_empty() {
                    features.push(format!("{}_fft_max", name), max(&spectrum));
                    features.push(format!("{}_dominant_freq", name), argmax(&spectrum) as f64);
                    features.push(format!("{}_fft_mean", name), mean(&spectrum));
                }
            }
        }

        // World-frame acceleration (orientation-invariant block).
        let world = world_frame_accel(&snapshot.accel, &snapshot.orientation);
        if !world.is_empty() {
            for (axis, name) in WORLD_AXES.iter().enumerate() {
                let values: Vec<f64> = world.iter().map(|v| v[axis]).collect();
                features.push(format!("{}_mean", name), mean(&values));
                features.push(format!("{}_std", name), std_dev(&values));
                features.push(format!("{}_max", name), max(&values));
                features.push(format!("{}_min", name), min(&values));
                features.push(format!("{}_range", name), max(&values) - min(&values));
                features.push(format!("{}_skew", name), skewness(&values));
                features.push(format!("{}_kurtosis", name), kurtosis(&values));
            }
        }
    }

    // Angular rate, per axis.
    if !snapshot.gyro.is_empty() {
        for (axis, name) in GYRO_AXES.iter().enumerate() {
            let values = axis_values(&snapshot.gyro, axis);
            features.push(format!("{}_mean", name), mean(&values));
            features.push(format!("{}_std", name), std_dev(&values));
            features.push(
                format!("{}_max_abs", name),
                values.iter().map(|v| v.abs()).fold(0.0, f64::max),
            );
            features.push(format!("{}_range", name), max(&values) - min(&values));
            features.push(format!("{}_skew", name), skewness(&values));
            features.push(format!("{}_kurtosis", name), kurtosis(&values));
            features.push(format!("{}_rms", name), rms(&values));
            if values.len() > 2 {
                let spectrum = dft_magnitudes(&values);
                if !spectrum.is_empty() {
                    features.push(format!("{}_fft_max", name), max(&spectrum));
                }
            }
        }
    }

    // Orientation quaternion components.
    if !snapshot.orientation.is_empty() {
        for (idx, name) in ROT_COMPONENTS.iter().enumerate() {
            let values: Vec<f64> = snapshot
                .orientation
                .iter()
                .map(|s| match idx {
                    0 => s.q.x,
                    1 => s.q.y,
                    2 => s.q.z,
                    _ => s.q.w,
                })
                .collect();
            features.push(format!("{}_mean", name), mean(&values));
            features.push(format!("{}_std", name), std_dev(&values));
            features.push(format!("{}_range", name), max(&values) - min(&values));
        }
    }

    // Cross-channel magnitudes.
    if !snapshot.accel.is_empty() {
        let mags = magnitudes(&snapshot.accel);
        features.push("accel_magnitude_mean", mean(&mags));
        features.push("accel_magnitude_max", max(&mags));
        features.push("accel_magnitude_std", std_dev(&mags));
    }
    if !snapshot.gyro.is_empty() {
        let mags = magnitudes(&snapshot.gyro);
        features.push("gyro_magnitude_mean", mean(&mags));
        features.push("gyro_magnitude_max", max(&mags));
        features.push("gyro_magnitude_std", std_dev(&mags));
    }

    features
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spatial::Quaternion;

    fn accel_snapshot(values: &[[f64; 3]]) -> WindowSnapshot {
        WindowSnapshot {
            accel: values
                .iter()
                .enumerate()
                .map(|(i, v)| TimedVec3 { timestamp: i as i64, v: *v })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_basic_statistics() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert!((mean(&values) - 3.0).abs() < 1e-12);
        assert!((std_dev(&values) - 1.5811388300841898).abs() < 1e-9);
        assert!((median(&values) - 3.0).abs() < 1e-12);
        assert!((rms(&[3.0, 4.0]) - (12.5f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_median_even_length_averages() {
        assert!((median(&[1.0, 2.0, 3.0, 4.0]) - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_symmetric_series_has_zero_skew() {
        let values = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert!(skewness(&values).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_degenerates_to_zero() {
        let values = [4.0; 10];
        assert_eq!(std_dev(&values), 0.0);
        assert_eq!(skewness(&values), 0.0);
        assert_eq!(kurtosis(&values), 0.0);
    }

    #[test]
    fn test_peak_count() {
        // One clear outlier above mean + 2 sigma.
        let mut values = vec![0.0; 20];
        values.push(50.0);
        assert_eq!(peak_count(&values), 1.0);
    }

    #[test]
    fn test_dft_dc_bin_of_constant_signal() {
        let spectrum = dft_magnitudes(&[2.0; 8]);
        assert_eq!(spectrum.len(), 4);
        assert!((spectrum[0] - 16.0).abs() < 1e-9, "DC bin = n * mean");
        for &bin in &spectrum[1..] {
            assert!(bin < 1e-9);
        }
    }

    #[test]
    fn test_dft_finds_dominant_frequency() {
        // Pure 2-cycle cosine over 16 samples peaks at bin 2.
        let n = 16;
        let values: Vec<f64> = (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * 2.0 * i as f64 / n as f64).cos())
            .collect();
        let spectrum = dft_magnitudes(&values);
        assert_eq!(argmax(&spectrum), 2);
    }

    #[test]
    fn test_empty_snapshot_yields_empty_vector() {
        let features = extract_features(&WindowSnapshot::default());
        assert!(features.is_empty());
    }

    #[test]
    fn test_emission_order_is_stable() {
        let snapshot = WindowSnapshot {
            accel: (0..8)
                .map(|i| TimedVec3 {
                    timestamp: i,
                    v: [i as f64, 0.5, -(i as f64)],
                })
                .collect(),
            gyro: (0..8)
                .map(|i| TimedVec3 { timestamp: i, v: [0.1, 0.2, 0.3] })
                .collect(),
            orientation: (0..8)
                .map(|i| TimedQuat { timestamp: i, q: Quaternion::identity() })
                .collect(),
        };

        let a = extract_features(&snapshot);
        let b = extract_features(&snapshot);
        let names_a: Vec<&str> = a.names().collect();
        let names_b: Vec<&str> = b.names().collect();
        assert_eq!(names_a, names_b, "extraction order must be deterministic");

        // Spot-check the contract ordering: local accel block first,
        // then world, gyro, rotation, magnitudes.
        assert_eq!(names_a[0], "accel_x_mean");
        let world_pos = names_a.iter().position(|n| *n == "world_accel_x_mean");
        let gyro_pos = names_a.iter().position(|n| *n == "gyro_x_mean");
        let rot_pos = names_a.iter().position(|n| *n == "rot_x_mean");
        let mag_pos = names_a.iter().position(|n| *n == "accel_magnitude_mean");
        assert!(world_pos < gyro_pos && gyro_pos < rot_pos && rot_pos < mag_pos);
        assert_eq!(names_a.last().copied(), Some("gyro_magnitude_std"));
    }

    #[test]
    fn test_world_features_absent_without_orientation() {
        let features = extract_features(&accel_snapshot(&[[1.0, 0.0, 0.0]; 4]));
        assert!(features.get("accel_x_mean").is_some());
        assert!(features.get("world_accel_x_mean").is_none());
    }

    #[test]
    fn test_world_features_use_rotation() {
        // 90° about Z maps local +X onto world +Y.
        let half = std::f64::consts::FRAC_PI_4;
        let q = Quaternion::new(half.cos(), 0.0, 0.0, half.sin());
        let snapshot = WindowSnapshot {
            accel: (0..4)
                .map(|i| TimedVec3 { timestamp: i, v: [10.0, 0.0, 0.0] })
                .collect(),
            gyro: Vec::new(),
            orientation: (0..4).map(|i| TimedQuat { timestamp: i, q }).collect(),
        };
        let features = extract_features(&snapshot);
        assert!(features.get("world_accel_x_mean").unwrap().abs() < 1e-6);
        assert!((features.get("world_accel_y_mean").unwrap() - 10.0).abs() < 1e-6);
    }

    #[test]
    fn test_alignment_zero_fills_and_reorders() {
        let mut features = FeatureVector::default();
        features.push("b", 2.0);
        features.push("a", 1.0);
        let order = vec!["a".to_string(), "missing".to_string(), "b".to_string()];
        assert_eq!(features.aligned(&order), vec![1.0, 0.0, 2.0]);
    }
}
