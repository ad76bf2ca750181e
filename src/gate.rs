//! Confidence gate
//!
//! Stabilizes noisy per-window predictions into a settled gesture state.
//! Predictions below the confidence floor are discarded before entering
//! the ring, treated as "no signal" rather than an explicit label. A label
//! settles only when all N most recent qualifying predictions agree, and
//! the ring is cleared on settlement so one sustained gesture settles
//! exactly once. The cost is a recognition delay of roughly N times the
//! prediction interval; the arbitrator cooldown rate-limits anything
//! that re-settles.

use crate::types::{ActionCommand, ActionKind, ActionSource, Prediction};
use std::collections::VecDeque;

/// Labels the training pipeline emits.
pub const LABEL_JUMP: &str = "jump";
pub const LABEL_PUNCH: &str = "punch";
pub const LABEL_TURN: &str = "turn";
pub const LABEL_WALK: &str = "walk";
pub const LABEL_NOISE: &str = "noise";

/// Consecutive-agreement voting gate.
#[derive(Debug)]
pub struct ConfidenceGate {
    window_size: usize,
    min_confidence: f64,
    ring: VecDeque<String>,
    settled: Option<String>,
}

impl ConfidenceGate {
    pub fn new(window_size: usize, min_confidence: f64) -> Self {
        let window_size = window_size.max(1);
        Self {
            window_size,
            min_confidence,
            ring: VecDeque::with_capacity(window_size),
            settled: None,
        }
    }

    /// Feed one prediction; returns the commands a settlement produces
    /// (usually none, at most a walk-off plus the settled action).
    pub fn observe(&mut self, prediction: &Prediction) -> Vec<ActionCommand> {
        if prediction.confidence < self.min_confidence {
            log::trace!(
                "gate: discarding {} at {:.2} (< {:.2})",
                prediction.label,
                prediction.confidence,
                self.min_confidence
            );
            return Vec::new();
        }

        if self.ring.len() == self.window_size {
            self.ring.pop_front();
        }
        self.ring.push_back(prediction.label.clone());

        // Silent until a full window of evidence agrees unanimously.
        if self.ring.len() < self.window_size {
            return Vec::new();
        }
        let first = &self.ring[0];
        if !self.ring.iter().all(|l| l == first) {
            return Vec::new();
        }

        let label = first.clone();
        let was_walking = self.settled.as_deref() == Some(LABEL_WALK);
        self.settled = Some(label.clone());
        self.ring.clear();

        log::debug!(
            "gate: settled '{}' at {:.2}",
            label,
            prediction.confidence
        );

        let mut commands = Vec::new();
        if was_walking && label != LABEL_WALK {
            commands.push(ActionCommand::new(
                ActionKind::WalkOff,
                ActionSource::Learned,
                prediction.confidence,
            ));
        }
        if let Some(kind) = Self::kind_for(&label) {
            commands.push(ActionCommand::new(
                kind,
                ActionSource::Learned,
                prediction.confidence,
            ));
        }
        commands
    }

    fn kind_for(label: &str) -> Option<ActionKind> {
        match label {
            LABEL_JUMP => Some(ActionKind::Jump),
            LABEL_PUNCH => Some(ActionKind::Attack),
            LABEL_TURN => Some(ActionKind::Turn),
            LABEL_WALK => Some(ActionKind::WalkOn),
            // Noise is a settled absence of gesture, not an action.
            _ => None,
        }
    }

    /// Currently settled label, if any.
    pub fn settled(&self) -> Option<&str> {
        self.settled.as_deref()
    }

    /// Explicit reset of both the ring and the settled state.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.settled = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(label: &str, confidence: f64) -> Prediction {
        Prediction {
            label: label.to_string(),
            confidence,
        }
    }

    fn gate() -> ConfidenceGate {
        ConfidenceGate::new(5, 0.7)
    }

    #[test]
    fn test_silent_until_ring_full() {
        let mut gate = gate();
        for _ in 0..4 {
            assert!(gate.observe(&prediction("jump", 0.9)).is_empty());
        }
        assert_eq!(gate.settled(), None);
    }

    #[test]
    fn test_four_matching_plus_one_other_does_not_settle() {
        let mut gate = gate();
        for _ in 0..4 {
            assert!(gate.observe(&prediction("jump", 0.9)).is_empty());
        }
        assert!(gate.observe(&prediction("walk", 0.9)).is_empty());
        assert_eq!(gate.settled(), None);
    }

    #[test]
    fn test_five_matching_settles_exactly_once() {
        let mut gate = gate();
        let mut commands = Vec::new();
        for _ in 0..5 {
            commands.extend(gate.observe(&prediction("jump", 0.9)));
        }
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].kind, ActionKind::Jump);
        assert_eq!(commands[0].source, ActionSource::Learned);
        assert_eq!(gate.settled(), Some("jump"));
    }

    #[test]
    fn test_sustained_gesture_resettles_after_full_new_window() {
        let mut gate = gate();
        let mut settlements = 0;
        for _ in 0..10 {
            settlements += gate.observe(&prediction("turn", 0.9)).len();
        }
        // Ring clears on settlement, so 10 in a row settles at 5 and 10.
        assert_eq!(settlements, 2);
    }

    #[test]
    fn test_low_confidence_never_enters_ring() {
        let mut gate = gate();
        for _ in 0..4 {
            gate.observe(&prediction("jump", 0.9));
        }
        // A low-confidence frame is no signal, not a vote.
        assert!(gate.observe(&prediction("jump", 0.3)).is_empty());
        assert_eq!(gate.settled(), None);
        // The next qualifying frame completes the window.
        let commands = gate.observe(&prediction("jump", 0.9));
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn test_turn_settlement_maps_to_turn_action() {
        let mut gate = gate();
        let mut commands = Vec::new();
        for _ in 0..5 {
            commands.extend(gate.observe(&prediction("turn", 0.95)));
        }
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].kind, ActionKind::Turn);
    }

    #[test]
    fn test_noise_settles_without_action() {
        let mut gate = gate();
        let mut commands = Vec::new();
        for _ in 0..5 {
            commands.extend(gate.observe(&prediction("noise", 0.9)));
        }
        assert!(commands.is_empty());
        assert_eq!(gate.settled(), Some("noise"));
    }

    #[test]
    fn test_leaving_walk_emits_walk_off() {
        let mut gate = gate();
        for _ in 0..5 {
            gate.observe(&prediction("walk", 0.9));
        }
        assert_eq!(gate.settled(), Some("walk"));

        let mut commands = Vec::new();
        for _ in 0..5 {
            commands.extend(gate.observe(&prediction("punch", 0.9)));
        }
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0].kind, ActionKind::WalkOff);
        assert_eq!(commands[1].kind, ActionKind::Attack);
    }

    #[test]
    fn test_clear_resets_state() {
        let mut gate = gate();
        for _ in 0..5 {
            gate.observe(&prediction("walk", 0.9));
        }
        gate.clear();
        assert_eq!(gate.settled(), None);
        for _ in 0..4 {
            assert!(gate.observe(&prediction("jump", 0.9)).is_empty());
        }
    }
}
