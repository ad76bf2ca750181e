//! Windowed sensor buffer
//!
//! Per-channel fixed-capacity rings feeding the feature extractor. The
//! collector side appends continuously; the predictor side takes
//! copy-on-read snapshots so extraction never observes a half-written
//! window. Allocated once at startup, evicts oldest on overflow.

use crate::spatial::Quaternion;
use crate::types::{SamplePayload, SensorSample};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A timestamped 3-vector reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedVec3 {
    pub timestamp: i64,
    pub v: [f64; 3],
}

/// A timestamped orientation reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedQuat {
    pub timestamp: i64,
    pub q: Quaternion,
}

/// Read-consistent copy of the current window, handed to the extractor.
#[derive(Debug, Clone, Default)]
pub struct WindowSnapshot {
    pub accel: Vec<TimedVec3>,
    pub gyro: Vec<TimedVec3>,
    pub orientation: Vec<TimedQuat>,
}

impl WindowSnapshot {
    pub fn is_empty(&self) -> bool {
        self.accel.is_empty() && self.gyro.is_empty() && self.orientation.is_empty()
    }
}

#[derive(Debug)]
struct Inner {
    accel: VecDeque<TimedVec3>,
    gyro: VecDeque<TimedVec3>,
    orientation: VecDeque<TimedQuat>,
    /// Samples appended since the last snapshot; gates extraction stride.
    appended_since_snapshot: usize,
}

/// Fixed-capacity windowed buffer shared between ingest and predictor.
#[derive(Debug)]
pub struct WindowedBuffer {
    capacity: usize,
    /// Total samples (across channels) required before extraction.
    ready_threshold: usize,
    inner: Mutex<Inner>,
}

impl WindowedBuffer {
    /// `capacity` is per channel; extraction unlocks once total buffered
    /// samples reach `capacity * fill_ratio` (not strictly full, so the
    /// first prediction lands early).
    pub fn new(capacity: usize, fill_ratio: f64) -> Self {
        let capacity = capacity.max(1);
        let ready_threshold = ((capacity as f64) * fill_ratio.clamp(0.0, 1.0)).ceil() as usize;
        Self {
            capacity,
            ready_threshold: ready_threshold.max(1),
            inner: Mutex::new(Inner {
                accel: VecDeque::with_capacity(capacity),
                gyro: VecDeque::with_capacity(capacity),
                orientation: VecDeque::with_capacity(capacity),
                appended_since_snapshot: 0,
            }),
        }
    }

    /// Append one sample. Step events are not windowed; they drive the
    /// locomotion path directly.
    pub fn push(&self, sample: &SensorSample) {
        let mut inner = self.inner.lock();
        match sample.payload {
            SamplePayload::Acceleration { x, y, z } => {
                Self::push_ring(
                    &mut inner.accel,
                    TimedVec3 { timestamp: sample.timestamp, v: [x, y, z] },
                    self.capacity,
                );
            }
            SamplePayload::AngularRate { x, y, z } => {
                Self::push_ring(
                    &mut inner.gyro,
                    TimedVec3 { timestamp: sample.timestamp, v: [x, y, z] },
                    self.capacity,
                );
            }
            SamplePayload::Orientation { x, y, z, w } => {
                Self::push_ring(
                    &mut inner.orientation,
                    TimedQuat {
                        timestamp: sample.timestamp,
                        q: Quaternion::new(w, x, y, z),
                    },
                    self.capacity,
                );
            }
            SamplePayload::StepEvent => return,
        }
        inner.appended_since_snapshot += 1;
    }

    fn push_ring<T>(ring: &mut VecDeque<T>, item: T, capacity: usize) {
        if ring.len() == capacity {
            ring.pop_front();
        }
        ring.push_back(item);
    }

    /// True once enough total samples are buffered and at least `stride`
    /// new samples arrived since the previous snapshot.
    pub fn ready_for_extraction(&self, stride: usize) -> bool {
        let inner = self.inner.lock();
        let total = inner.accel.len() + inner.gyro.len() + inner.orientation.len();
        total >= self.ready_threshold && inner.appended_since_snapshot >= stride.max(1)
    }

    /// Copy-on-read snapshot; resets the stride counter.
    pub fn snapshot(&self) -> WindowSnapshot {
        let mut inner = self.inner.lock();
        inner.appended_since_snapshot = 0;
        WindowSnapshot {
            accel: inner.accel.iter().copied().collect(),
            gyro: inner.gyro.iter().copied().collect(),
            orientation: inner.orientation.iter().copied().collect(),
        }
    }

    /// Total buffered samples across channels.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.accel.len() + inner.gyro.len() + inner.orientation.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
