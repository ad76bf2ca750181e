//! Observable pipeline counters and gauges
//!
//! Diagnostics are off the control path: every counter is a relaxed
//! atomic incremented where the event happens and read only by snapshot.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared counter block, one per pipeline.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Packets evicted from the sample channel to make room for newer ones.
    pub dropped_packets: AtomicU64,
    /// Packets that failed to parse or carried an unknown channel tag.
    pub malformed_packets: AtomicU64,
    /// Predictions overwritten before the gate consumed them.
    pub dropped_predictions: AtomicU64,
    /// Candidate actions suppressed by the arbitrator cooldown.
    pub suppressed_actions: AtomicU64,
    /// Actions actually dispatched to the sink.
    pub dispatched_actions: AtomicU64,
    /// Classifier invocations.
    pub predictions: AtomicU64,
    /// Peak observed world-frame vertical acceleration (milli-units).
    peak_world_z_milli: AtomicU64,
    /// Peak observed world-frame horizontal magnitude (milli-units).
    peak_world_xy_milli: AtomicU64,
    /// Currently settled gesture label, if any.
    gate_state: RwLock<Option<String>>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record world-frame peaks for threshold tuning.
    pub fn observe_world_accel(&self, z: f64, xy_magnitude: f64) {
        let z_milli = (z.max(0.0) * 1000.0) as u64;
        let xy_milli = (xy_magnitude.max(0.0) * 1000.0) as u64;
        self.peak_world_z_milli.fetch_max(z_milli, Ordering::Relaxed);
        self.peak_world_xy_milli.fetch_max(xy_milli, Ordering::Relaxed);
    }

    pub fn set_gate_state(&self, label: Option<String>) {
        *self.gate_state.write() = label;
    }

    pub fn snapshot(&self) -> DiagnosticsReport {
        DiagnosticsReport {
            dropped_packets: self.dropped_packets.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            dropped_predictions: self.dropped_predictions.load(Ordering::Relaxed),
            suppressed_actions: self.suppressed_actions.load(Ordering::Relaxed),
            dispatched_actions: self.dispatched_actions.load(Ordering::Relaxed),
            predictions: self.predictions.load(Ordering::Relaxed),
            peak_world_z: self.peak_world_z_milli.load(Ordering::Relaxed) as f64 / 1000.0,
            peak_world_xy: self.peak_world_xy_milli.load(Ordering::Relaxed) as f64 / 1000.0,
            gate_state: self.gate_state.read().clone(),
        }
    }
}

/// Point-in-time copy of all counters, safe to serialize or log.
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticsReport {
    pub dropped_packets: u64,
    pub malformed_packets: u64,
    pub dropped_predictions: u64,
    pub suppressed_actions: u64,
    pub dispatched_actions: u64,
    pub predictions: u64,
    pub peak_world_z: f64,
    pub peak_world_xy: f64,
    pub gate_state: Option<String>,
}
