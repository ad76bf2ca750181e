//! Core data types for the gesture pipeline

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

/// Sensor channels the controller understands.
///
/// Everything past the wire boundary dispatches on this enum; unknown
/// channel tags never make it out of the collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorChannel {
    Acceleration,
    AngularRate,
    Orientation,
    StepEvent,
}

/// Per-channel sample payload.
///
/// Acceleration is linear (gravity-removed) in the device frame, m/s².
/// AngularRate is rad/s. Orientation is the device rotation quaternion.
/// StepEvent carries no values; its arrival is the signal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplePayload {
    Acceleration { x: f64, y: f64, z: f64 },
    AngularRate { x: f64, y: f64, z: f64 },
    Orientation { x: f64, y: f64, z: f64, w: f64 },
    StepEvent,
}

impl SamplePayload {
    pub fn channel(&self) -> SensorChannel {
        match self {
            SamplePayload::Acceleration { .. } => SensorChannel::Acceleration,
            SamplePayload::AngularRate { .. } => SensorChannel::AngularRate,
            SamplePayload::Orientation { .. } => SensorChannel::Orientation,
            SamplePayload::StepEvent => SensorChannel::StepEvent,
        }
    }
}

/// One typed sensor reading.
///
/// Timestamp is milliseconds, monotonic within a session: taken from the
/// packet when the emitter provides one, stamped at receipt otherwise.
/// Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSample {
    pub payload: SamplePayload,
    pub timestamp: i64,
}

impl SensorSample {
    pub fn new(payload: SamplePayload, timestamp: i64) -> Self {
        Self { payload, timestamp }
    }

    pub fn channel(&self) -> SensorChannel {
        self.payload.channel()
    }
}

/// One classifier output, consumed by the confidence gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    /// Probability in [0, 1].
    pub confidence: f64,
}

/// Discrete actions the controller can fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Jump,
    Attack,
    Turn,
    WalkOn,
    WalkOff,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Jump => "jump",
            ActionKind::Attack => "attack",
            ActionKind::Turn => "turn",
            ActionKind::WalkOn => "walk-on",
            ActionKind::WalkOff => "walk-off",
        };
        f.write_str(name)
    }
}

/// Which layer proposed an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionSource {
    Reflex,
    Learned,
}

impl fmt::Display for ActionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionSource::Reflex => "reflex",
            ActionSource::Learned => "learned",
        })
    }
}

/// Candidate action flowing into the arbitrator.
///
/// Ephemeral: created by the reflex detector or the confidence gate,
/// consumed and dropped by the dispatch loop. Confidence is diagnostic
/// only (reflex reports observed/threshold and may exceed 1.0).
#[derive(Debug, Clone, Copy)]
pub struct ActionCommand {
    pub kind: ActionKind,
    pub source: ActionSource,
    pub issued_at: Instant,
    pub confidence: f64,
}

impl ActionCommand {
    pub fn new(kind: ActionKind, source: ActionSource, confidence: f64) -> Self {
        Self {
            kind,
            source,
            issued_at: Instant::now(),
            confidence,
        }
    }
}

/// Character facing direction, toggled by a settled Turn gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Facing {
    Left,
    Right,
}

impl Facing {
    pub fn flipped(self) -> Facing {
        match self {
            Facing::Left => Facing::Right,
            Facing::Right => Facing::Left,
        }
    }
}

impl fmt::Display for Facing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Facing::Left => "left",
            Facing::Right => "right",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_channel_mapping() {
        let accel = SamplePayload::Acceleration { x: 1.0, y: 2.0, z: 3.0 };
        assert_eq!(accel.channel(), SensorChannel::Acceleration);
        assert_eq!(SamplePayload::StepEvent.channel(), SensorChannel::StepEvent);
    }

    #[test]
    fn test_facing_flip_is_involution() {
        assert_eq!(Facing::Left.flipped(), Facing::Right);
        assert_eq!(Facing::Right.flipped().flipped(), Facing::Right);
    }

    #[test]
    fn test_action_kind_display() {
        assert_eq!(ActionKind::Jump.to_string(), "jump");
        assert_eq!(ActionKind::WalkOff.to_string(), "walk-off");
    }
}
