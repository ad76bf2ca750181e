//! Gauntlet binary entry point
//!
//! Loads configuration, wires the pipeline, and runs until SIGINT. The
//! only fatal conditions are an unparseable config file and an
//! unbindable sensor socket; everything else (no classifier artifact,
//! malformed packets, queue pressure) degrades and keeps running.

use anyhow::Result;
use gauntlet::{load_classifier, ControllerConfig, LogSink, Pipeline};
use log::LevelFilter;
use std::sync::Arc;

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());

    log::info!("═══════════════════════════════════════");
    log::info!("  Gauntlet - wrist motion controller");
    log::info!("═══════════════════════════════════════");

    let config = ControllerConfig::load(&config_path)?;
    let classifier = load_classifier(&config.classifier.model_path);

    let pipeline = Pipeline::start(config, classifier, Arc::new(LogSink))?;
    log::info!("Listening on {}; press Ctrl+C to exit", pipeline.local_addr());

    // Block until SIGINT trips the channel.
    let (tx, rx) = crossbeam_channel::bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })?;
    let _ = rx.recv();

    log::info!("Received shutdown signal...");
    let report = pipeline.shutdown();
    log::info!(
        "Session diagnostics: {}",
        serde_json::to_string(&report).unwrap_or_else(|_| "<unavailable>".to_string())
    );
    Ok(())
}
