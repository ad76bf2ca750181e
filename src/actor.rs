//! Actor - output sink and walk-fuel locomotion
//!
//! Two independent responsibilities meet here: executing arbitrated
//! action commands against an abstract key sink, and the momentum-style
//! locomotion model. Walking is a continuous state, not a discrete
//! event. It is driven by step-event fuel and a decay ticker, and never
//! competes for arbitration cooldowns.

use crate::config::{ActorConfig, WalkConfig};
use crate::types::{ActionCommand, ActionKind, Facing};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// The two-call output capability. The core never assumes a specific
/// output technology; a real keyboard backend implements this trait.
pub trait ActionSink: Send + Sync {
    fn press(&self, key: &str);
    fn release(&self, key: &str);
}

/// Default sink: logs key traffic. Useful headless and as the stand-in
/// until a platform keyboard backend is wired up.
#[derive(Debug, Default)]
pub struct LogSink;

impl ActionSink for LogSink {
    fn press(&self, key: &str) {
        log::info!("press {}", key);
    }

    fn release(&self, key: &str) {
        log::info!("release {}", key);
    }
}

/// One observed key transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyEvent {
    Press(String),
    Release(String),
}

/// Test sink that records every key transition in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<KeyEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl ActionSink for RecordingSink {
    fn press(&self, key: &str) {
        self.events.lock().push(KeyEvent::Press(key.to_string()));
    }

    fn release(&self, key: &str) {
        self.events.lock().push(KeyEvent::Release(key.to_string()));
    }
}

#[derive(Debug)]
struct LocomotionState {
    fuel_sec: f32,
    walking: bool,
    facing: Facing,
}

/// Walk-fuel state machine.
///
/// Fuel is incremented by step events and walk-on settlements, decayed
/// by the periodic ticker, and read by diagnostics: three timing
/// domains, so every transition happens under one lock. Fuel never goes
/// negative; walking is active exactly while fuel > 0.
pub struct Locomotion {
    config: WalkConfig,
    left_key: String,
    right_key: String,
    state: Mutex<LocomotionState>,
}

impl Locomotion {
    pub fn new(config: WalkConfig, left_key: String, right_key: String) -> Self {
        Self {
            config,
            left_key,
            right_key,
            state: Mutex::new(LocomotionState {
                fuel_sec: 0.0,
                walking: false,
                facing: Facing::Right,
            }),
        }
    }

    fn direction_key(&self, facing: Facing) -> &str {
        match facing {
            Facing::Left => &self.left_key,
            Facing::Right => &self.right_key,
        }
    }

    /// One detected step tops up the tank.
    pub fn add_step_fuel(&self) {
        let mut state = self.state.lock();
        state.fuel_sec =
            (state.fuel_sec + self.config.fuel_per_step_sec).min(self.config.max_fuel_sec);
        log::trace!("fuel +step -> {:.2}s", state.fuel_sec);
    }

    /// A settled walk gesture guarantees at least one step's worth.
    pub fn walk_on(&self) {
        let mut state = self.state.lock();
        state.fuel_sec = state
            .fuel_sec
            .max(self.config.fuel_per_step_sec)
            .min(self.config.max_fuel_sec);
    }

    /// Settling away from walk empties the tank and stops immediately.
    pub fn walk_off(&self, sink: &dyn ActionSink) {
        let mut state = self.state.lock();
        state.fuel_sec = 0.0;
        if state.walking {
            sink.release(self.direction_key(state.facing));
            state.walking = false;
        }
    }

    /// Periodic decay and walk start/stop transitions.
    pub fn tick(&self, elapsed: Duration, sink: &dyn ActionSink) {
        let mut state = self.state.lock();
        state.fuel_sec = (state.fuel_sec - elapsed.as_secs_f32()).max(0.0);

        if state.fuel_sec > 0.0 && !state.walking {
            sink.press(self.direction_key(state.facing));
            state.walking = true;
            log::debug!("walking {} ({:.2}s fuel)", state.facing, state.fuel_sec);
        } else if state.fuel_sec <= 0.0 && state.walking {
            sink.release(self.direction_key(state.facing));
            state.walking = false;
            log::debug!("walking stopped");
        }
    }

    /// Settled Turn gesture: flip facing, swap held keys if mid-walk,
    /// and clamp momentum to the sharp-turn residue.
    pub fn toggle_facing(&self, sink: &dyn ActionSink) -> Facing {
        let mut state = self.state.lock();
        let from = state.facing;
        state.facing = from.flipped();
        if state.walking {
            sink.release(self.direction_key(from));
            sink.press(self.direction_key(state.facing));
        }
        state.fuel_sec = state.fuel_sec.min(self.config.turn_fuel_sec);
        log::debug!("facing {} -> {}", from, state.facing);
        state.facing
    }

    pub fn fuel(&self) -> f32 {
        self.state.lock().fuel_sec
    }

    pub fn facing(&self) -> Facing {
        self.state.lock().facing
    }

    pub fn is_walking(&self) -> bool {
        self.state.lock().walking
    }
}

/// Executes arbitrated commands against the sink.
pub struct Actor {
    sink: Arc<dyn ActionSink>,
    locomotion: Arc<Locomotion>,
    jump_key: String,
    attack_key: String,
    tap: Duration,
}

impl Actor {
    pub fn new(
        config: &ActorConfig,
        sink: Arc<dyn ActionSink>,
        locomotion: Arc<Locomotion>,
    ) -> Self {
        let key = |name: &str, fallback: &str| {
            config
                .keys
                .get(name)
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };
        Self {
            sink,
            locomotion,
            jump_key: key("jump", "z"),
            attack_key: key("attack", "x"),
            tap: Duration::from_millis(config.tap_ms),
        }
    }

    /// Perform one accepted command's side effect.
    pub fn execute(&self, command: &ActionCommand) {
        log::info!(
            "[{}] {} ({:.2})",
            command.source,
            command.kind,
            command.confidence
        );
        match command.kind {
            ActionKind::Jump => self.tap(&self.jump_key),
            ActionKind::Attack => self.tap(&self.attack_key),
            ActionKind::Turn => {
                self.locomotion.toggle_facing(self.sink.as_ref());
            }
            ActionKind::WalkOn => self.locomotion.walk_on(),
            ActionKind::WalkOff => self.locomotion.walk_off(self.sink.as_ref()),
        }
    }

    fn tap(&self, key: &str) {
        self.sink.press(key);
        if !self.tap.is_zero() {
            std::thread::sleep(self.tap);
        }
        self.sink.release(key);
    }
}
