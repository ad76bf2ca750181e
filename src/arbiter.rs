//! Execution arbitrator
//!
//! Both the reflex detector and the confidence gate may propose the same
//! action near-simultaneously; the arbitrator is what keeps that from
//! double-firing. Per action kind it remembers the last dispatch and
//! admits a new command only once the kind's cooldown has elapsed,
//! regardless of which layer proposed it. The reflex layer's lower
//! latency naturally wins races for time-critical actions. Rejection is
//! routine suppression, counted for diagnostics, never an error.

use crate::config::ArbitratorConfig;
use crate::types::{ActionCommand, ActionKind};
use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct ExecutionArbitrator {
    default_cooldown: Duration,
    overrides: HashMap<ActionKind, Duration>,
    last_dispatch: HashMap<ActionKind, Instant>,
    suppressed: u64,
}

impl ExecutionArbitrator {
    pub fn new(config: &ArbitratorConfig) -> Self {
        let mut overrides = HashMap::new();
        for (name, ms) in &config.cooldown_overrides_ms {
            if let Some(kind) = Self::kind_by_name(name) {
                overrides.insert(kind, Duration::from_millis(*ms));
            } else {
                log::warn!("Ignoring cooldown override for unknown action '{}'", name);
            }
        }
        Self {
            default_cooldown: Duration::from_millis(config.cooldown_ms),
            overrides,
            last_dispatch: HashMap::new(),
            suppressed: 0,
        }
    }

    fn kind_by_name(name: &str) -> Option<ActionKind> {
        match name {
            "jump" => Some(ActionKind::Jump),
            "attack" => Some(ActionKind::Attack),
            "turn" => Some(ActionKind::Turn),
            "walk-on" => Some(ActionKind::WalkOn),
            "walk-off" => Some(ActionKind::WalkOff),
            _ => None,
        }
    }

    fn cooldown_for(&self, kind: ActionKind) -> Duration {
        self.overrides
            .get(&kind)
            .copied()
            .unwrap_or(self.default_cooldown)
    }

    /// Admit or suppress one candidate.
    ///
    /// Admission records the command's issue time as the kind's new
    /// last-dispatch mark.
    pub fn admit(&mut self, command: &ActionCommand) -> bool {
        let cooldown = self.cooldown_for(command.kind);
        if let Some(last) = self.last_dispatch.get(&command.kind) {
            if command.issued_at.duration_since(*last) < cooldown {
                self.suppressed += 1;
                log::trace!(
                    "arbiter: suppressed {} from {} (cooldown)",
                    command.kind,
                    command.source
                );
                return false;
            }
        }
        self.last_dispatch.insert(command.kind, command.issued_at);
        true
    }

    /// Total commands suppressed so far.
    pub fn suppressed(&self) -> u64 {
        self.suppressed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ActionSource;

    fn command_at(kind: ActionKind, at: Instant) -> ActionCommand {
        ActionCommand {
            kind,
            source: ActionSource::Reflex,
            issued_at: at,
            confidence: 1.0,
        }
    }

    fn arbiter_with_cooldown(ms: u64) -> ExecutionArbitrator {
        ExecutionArbitrator::new(&ArbitratorConfig {
            cooldown_ms: ms,
            cooldown_overrides_ms: HashMap::new(),
        })
    }

    #[test]
    fn test_same_kind_within_cooldown_dispatches_once() {
        let mut arbiter = arbiter_with_cooldown(300);
        let t0 = Instant::now();
        assert!(arbiter.admit(&command_at(ActionKind::Jump, t0)));
        assert!(!arbiter.admit(&command_at(
            ActionKind::Jump,
            t0 + Duration::from_millis(299)
        )));
        assert_eq!(arbiter.suppressed(), 1);
    }

    #[test]
    fn test_same_kind_after_cooldown_dispatches_twice() {
        let mut arbiter = arbiter_with_cooldown(300);
        let t0 = Instant::now();
        assert!(arbiter.admit(&command_at(ActionKind::Jump, t0)));
        assert!(arbiter.admit(&command_at(
            ActionKind::Jump,
            t0 + Duration::from_millis(301)
        )));
        assert_eq!(arbiter.suppressed(), 0);
    }

    #[test]
    fn test_cooldown_applies_across_sources() {
        let mut arbiter = arbiter_with_cooldown(300);
        let t0 = Instant::now();
        let reflex = command_at(ActionKind::Attack, t0);
        let mut learned = command_at(ActionKind::Attack, t0 + Duration::from_millis(50));
        learned.source = ActionSource::Learned;
        assert!(arbiter.admit(&reflex));
        assert!(
            !arbiter.admit(&learned),
            "cooldown is per kind, not per source"
        );
    }

    #[test]
    fn test_kinds_cool_down_independently() {
        let mut arbiter = arbiter_with_cooldown(300);
        let t0 = Instant::now();
        assert!(arbiter.admit(&command_at(ActionKind::Jump, t0)));
        assert!(arbiter.admit(&command_at(
            ActionKind::Attack,
            t0 + Duration::from_millis(1)
        )));
    }

    #[test]
    fn test_per_kind_override() {
        let mut overrides = HashMap::new();
        overrides.insert("turn".to_string(), 800u64);
        overrides.insert("walk-on".to_string(), 0u64);
        let mut arbiter = ExecutionArbitrator::new(&ArbitratorConfig {
            cooldown_ms: 300,
            cooldown_overrides_ms: overrides,
        });

        let t0 = Instant::now();
        assert!(arbiter.admit(&command_at(ActionKind::Turn, t0)));
        assert!(!arbiter.admit(&command_at(
            ActionKind::Turn,
            t0 + Duration::from_millis(500)
        )));
        assert!(arbiter.admit(&command_at(
            ActionKind::Turn,
            t0 + Duration::from_millis(801)
        )));

        // Zero override disables the cooldown entirely.
        assert!(arbiter.admit(&command_at(ActionKind::WalkOn, t0)));
        assert!(arbiter.admit(&command_at(ActionKind::WalkOn, t0)));
    }
}
