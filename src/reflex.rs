//! Reflex layer - fast threshold detection
//!
//! Stateless evaluator over single world-frame acceleration samples. No
//! buffering and no windowing: the candidate is produced inline with
//! sample delivery, which is what keeps the reaction under the 50ms
//! latency contract while the learned path is still accumulating its
//! window.

use crate::config::ReflexConfig;
use crate::spatial::Quaternion;
use crate::types::{ActionCommand, ActionKind, ActionSource};

/// Threshold detector over world-frame acceleration.
#[derive(Debug, Clone)]
pub struct ReflexDetector {
    config: ReflexConfig,
}

/// World-frame components derived from one sample, reused by diagnostics.
#[derive(Debug, Clone, Copy)]
pub struct WorldAccel {
    pub z: f64,
    pub xy_magnitude: f64,
}

impl ReflexDetector {
    pub fn new(config: ReflexConfig) -> Self {
        Self { config }
    }

    /// Transform one device-local acceleration into the world frame.
    pub fn world_components(local: [f64; 3], orientation: &Quaternion) -> WorldAccel {
        let world = orientation.rotate(local);
        WorldAccel {
            z: world[2],
            xy_magnitude: (world[0] * world[0] + world[1] * world[1]).sqrt(),
        }
    }

    /// Evaluate both threshold rules against one sample.
    ///
    /// At most one candidate per sample; a jump-qualifying sample never
    /// also reports an attack. Confidence is observed/threshold (may
    /// exceed 1.0) and is diagnostic only; it does not gate dispatch.
    pub fn detect(&self, local: [f64; 3], orientation: &Quaternion) -> Option<ActionCommand> {
        let world = Self::world_components(local, orientation);

        // Jump: strong upward motion in world Z.
        if world.z > self.config.jump_threshold {
            let confidence = world.z / self.config.jump_threshold;
            return Some(ActionCommand::new(
                ActionKind::Jump,
                ActionSource::Reflex,
                confidence,
            ));
        }

        // Attack: strong horizontal motion with a stable vertical,
        // rejecting attack classification during a simultaneous jump.
        if world.xy_magnitude > self.config.attack_threshold
            && world.z.abs() < self.config.stability_threshold
        {
            let confidence = world.xy_magnitude / self.config.attack_threshold;
            return Some(ActionCommand::new(
                ActionKind::Attack,
                ActionSource::Reflex,
                confidence,
            ));
        }

        None
    }
}
