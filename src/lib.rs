//! # Gauntlet - wrist-motion gesture controller
//!
//! Turns a continuous stream of wrist-worn inertial-sensor packets into
//! discrete control actions with sub-second, predictable latency.
//!
//! Two recognition paths run in parallel over the same sensor stream:
//!
//! - a **reflex layer** of world-frame thresholds that reacts to a single
//!   sample (sub-50ms), and
//! - a **learned layer** that extracts features over a sliding window,
//!   runs an injected classifier, and debounces its predictions through a
//!   consecutive-agreement confidence gate.
//!
//! Both layers race by design; the execution arbitrator deduplicates and
//! rate-limits their candidates per action kind before the actor performs
//! the key-press side effect. A separate walk-fuel state machine turns
//! step events into continuous locomotion, decoupled from the discrete
//! action path.

pub mod actor;
pub mod arbiter;
pub mod buffer;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod features;
pub mod gate;
pub mod pipeline;
pub mod predictor;
pub mod reflex;
pub mod spatial;
pub mod types;

pub use actor::{ActionSink, LogSink, RecordingSink};
pub use classifier::{load_classifier, GestureClassifier, LinearGestureModel};
pub use config::ControllerConfig;
pub use diagnostics::DiagnosticsReport;
pub use error::ControllerError;
pub use pipeline::Pipeline;
pub use types::{ActionCommand, ActionKind, ActionSource, Facing, Prediction, SensorSample};
