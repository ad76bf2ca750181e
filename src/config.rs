//! Controller configuration
//!
//! Loaded once at startup from a JSON file. Every field has a documented
//! default; unknown keys are ignored so older configs keep working. A
//! missing file falls back to full defaults; an unparseable file is the
//! one fatal configuration error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::ControllerError;

/// Top-level configuration bundle for the whole pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub reflex: ReflexConfig,
    #[serde(default)]
    pub gate: GateConfig,
    #[serde(default)]
    pub arbitrator: ArbitratorConfig,
    #[serde(default)]
    pub buffer: BufferConfig,
    #[serde(default)]
    pub walk: WalkConfig,
    #[serde(default)]
    pub actor: ActorConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// UDP bind address for the sensor stream.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Capacity of the collector -> ingest sample channel.
    #[serde(default = "default_sample_queue")]
    pub sample_queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflexConfig {
    /// World-frame Z acceleration that registers a jump (m/s²).
    #[serde(default = "default_jump_threshold")]
    pub jump_threshold: f64,
    /// World-frame horizontal magnitude that registers an attack (m/s²).
    #[serde(default = "default_attack_threshold")]
    pub attack_threshold: f64,
    /// |world Z| must stay below this during an attack, rejecting
    /// attack classification mid-jump.
    #[serde(default = "default_stability_threshold")]
    pub stability_threshold: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Consecutive agreeing predictions required to settle.
    #[serde(default = "default_gate_window")]
    pub window_size: usize,
    /// Predictions below this confidence never enter the ring.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitratorConfig {
    /// Default per-kind cooldown between dispatches.
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    /// Per-kind overrides, keyed by action name ("jump", "attack", ...).
    #[serde(default)]
    pub cooldown_overrides_ms: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufferConfig {
    /// Per-channel ring capacity in samples.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Fraction of capacity that must be filled before the first
    /// extraction; below 1.0 enables a low-latency first prediction.
    #[serde(default = "default_fill_ratio")]
    pub fill_ratio: f64,
    /// Minimum new samples between extractions.
    #[serde(default = "default_stride")]
    pub stride: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Fuel seconds granted per detected step.
    #[serde(default = "default_fuel_per_step")]
    pub fuel_per_step_sec: f32,
    /// Fuel tank cap in seconds.
    #[serde(default = "default_max_fuel")]
    pub max_fuel_sec: f32,
    /// Decay ticker period.
    #[serde(default = "default_decay_tick_ms")]
    pub decay_tick_ms: u64,
    /// Fuel residue left after a sharp turn.
    #[serde(default = "default_turn_fuel")]
    pub turn_fuel_sec: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorConfig {
    /// How long press-type actions hold their key.
    #[serde(default = "default_tap_ms")]
    pub tap_ms: u64,
    /// Key bound to each discrete action.
    #[serde(default = "default_key_map")]
    pub keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Path to the classifier artifact; empty disables the learned path.
    #[serde(default = "default_model_path")]
    pub model_path: String,
}

fn default_listen_addr() -> String {
    "0.0.0.0:5005".to_string()
}
fn default_sample_queue() -> usize {
    256
}
fn default_jump_threshold() -> f64 {
    15.0
}
fn default_attack_threshold() -> f64 {
    12.0
}
fn default_stability_threshold() -> f64 {
    5.0
}
fn default_gate_window() -> usize {
    5
}
fn default_min_confidence() -> f64 {
    0.7
}
fn default_cooldown_ms() -> u64 {
    300
}
fn default_window_size() -> usize {
    128
}
fn default_fill_ratio() -> f64 {
    0.8
}
fn default_stride() -> usize {
    10
}
fn default_fuel_per_step() -> f32 {
    0.6
}
fn default_max_fuel() -> f32 {
    3.0
}
fn default_decay_tick_ms() -> u64 {
    100
}
fn default_turn_fuel() -> f32 {
    0.2
}
fn default_tap_ms() -> u64 {
    100
}
fn default_model_path() -> String {
    "models/gesture_classifier.json".to_string()
}

fn default_key_map() -> HashMap<String, String> {
    let mut keys = HashMap::new();
    keys.insert("jump".to_string(), "z".to_string());
    keys.insert("attack".to_string(), "x".to_string());
    keys.insert("left".to_string(), "Key.left".to_string());
    keys.insert("right".to_string(), "Key.right".to_string());
    keys
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            sample_queue: default_sample_queue(),
        }
    }
}

impl Default for ReflexConfig {
    fn default() -> Self {
        Self {
            jump_threshold: default_jump_threshold(),
            attack_threshold: default_attack_threshold(),
            stability_threshold: default_stability_threshold(),
        }
    }
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            window_size: default_gate_window(),
            min_confidence: default_min_confidence(),
        }
    }
}

impl Default for ArbitratorConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            cooldown_overrides_ms: HashMap::new(),
        }
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            fill_ratio: default_fill_ratio(),
            stride: default_stride(),
        }
    }
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            fuel_per_step_sec: default_fuel_per_step(),
            max_fuel_sec: default_max_fuel(),
            decay_tick_ms: default_decay_tick_ms(),
            turn_fuel_sec: default_turn_fuel(),
        }
    }
}

impl Default for ActorConfig {
    fn default() -> Self {
        Self {
            tap_ms: default_tap_ms(),
            keys: default_key_map(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: default_model_path(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file is not an error (defaults apply); malformed JSON is
    /// fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControllerError> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ControllerError::Config(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        serde_json::from_str(&raw).map_err(|e| {
            ControllerError::Config(format!("invalid JSON in {}: {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.gate.window_size, 5);
        assert!((config.gate.min_confidence - 0.7).abs() < 1e-9);
        assert_eq!(config.arbitrator.cooldown_ms, 300);
        assert_eq!(config.buffer.window_size, 128);
        assert!((config.reflex.jump_threshold - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{"gate": {"window_size": 3}}"#;
        let config: ControllerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.gate.window_size, 3);
        // Untouched sibling field keeps its default.
        assert!((config.gate.min_confidence - 0.7).abs() < 1e-9);
        assert_eq!(config.arbitrator.cooldown_ms, 300);
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let raw = r#"{"gate": {"window_size": 4, "future_knob": true}, "other": 1}"#;
        let config: ControllerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.gate.window_size, 4);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config =
            ControllerConfig::load("/definitely/not/a/real/config.json").unwrap();
        assert_eq!(config.buffer.window_size, 128);
    }

    #[test]
    fn test_invalid_json_is_fatal() {
        let path = std::env::temp_dir().join("gauntlet-bad-config-test.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ControllerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ControllerError::Config(_)));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_cooldown_overrides_parse() {
        let raw = r#"{"arbitrator": {"cooldown_overrides_ms": {"turn": 800}}}"#;
        let config: ControllerConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(
            config.arbitrator.cooldown_overrides_ms.get("turn").copied(),
            Some(800)
        );
    }
}
