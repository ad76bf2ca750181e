//! Error taxonomy
//!
//! Only startup-time conditions surface as errors. Runtime data-plane
//! faults (malformed packets, degenerate math, queue overflow, cooldown
//! rejection) are counted in diagnostics and the pipeline keeps running.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    /// Invalid or unreadable configuration; halts startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// Classifier artifact could not be loaded. Callers treat this as
    /// "predictor path disabled", not as a startup failure.
    #[error("classifier artifact error: {0}")]
    Artifact(String),

    /// Sensor socket could not be bound; halts startup.
    #[error("socket error: {0}")]
    Socket(#[from] std::io::Error),
}
