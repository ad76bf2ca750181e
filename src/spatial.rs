//! Quaternion math and the shared device orientation
//!
//! The quantity transform rotates device-local vectors into a stable
//! world frame, making gesture thresholds orientation-invariant: the same
//! physical motion produces the same world-frame magnitude however the
//! wrist is currently rotated.

use parking_lot::RwLock;
use std::sync::Arc;

/// Norm² below this is treated as a degenerate orientation.
const DEGENERATE_NORM_SQ: f64 = 1e-12;

/// A rotation quaternion (w scalar part, x/y/z vector part).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    /// Identity rotation.
    pub fn identity() -> Self {
        Self { w: 1.0, x: 0.0, y: 0.0, z: 0.0 }
    }

    fn norm_sq(&self) -> f64 {
        self.w * self.w + self.x * self.x + self.y * self.y + self.z * self.z
    }

    /// Unit-norm copy, or None for a degenerate (≈zero) quaternion.
    pub fn normalized(&self) -> Option<Quaternion> {
        let n2 = self.norm_sq();
        if n2 < DEGENERATE_NORM_SQ {
            return None;
        }
        let inv = 1.0 / n2.sqrt();
        Some(Quaternion {
            w: self.w * inv,
            x: self.x * inv,
            y: self.y * inv,
            z: self.z * inv,
        })
    }

    /// Rotate a device-local vector into the world frame: v' = q v q⁻¹.
    ///
    /// Expanded cross-product form (two cross products instead of two
    /// quaternion multiplies). A degenerate orientation is an identity
    /// transform, never a fault.
    pub fn rotate(&self, v: [f64; 3]) -> [f64; 3] {
        let q = match self.normalized() {
            Some(q) => q,
            None => return v,
        };

        // a = 2 (q_vec × v)
        let a = [
            2.0 * (q.y * v[2] - q.z * v[1]),
            2.0 * (q.z * v[0] - q.x * v[2]),
            2.0 * (q.x * v[1] - q.y * v[0]),
        ];

        // v' = v + w·a + q_vec × a
        [
            v[0] + q.w * a[0] + (q.y * a[2] - q.z * a[1]),
            v[1] + q.w * a[1] + (q.z * a[0] - q.x * a[2]),
            v[2] + q.w * a[2] + (q.x * a[1] - q.y * a[0]),
        ]
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Latest-known device orientation, shared read-mostly state.
///
/// Written only by Orientation-channel samples in the ingest loop; read by
/// the reflex detector on every acceleration sample.
#[derive(Debug, Clone)]
pub struct SharedOrientation {
    inner: Arc<RwLock<Quaternion>>,
}

impl SharedOrientation {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Quaternion::identity())),
        }
    }

    pub fn set(&self, q: Quaternion) {
        *self.inner.write() = q;
    }

    pub fn get(&self) -> Quaternion {
        *self.inner.read()
    }
}

impl Default for SharedOrientation {
    fn default() -> Self {
        Self::new()
    }
}
