//! Pipeline assembly
//!
//! Wires the fixed set of long-lived workers together: collector,
//! ingest (with the inline reflex path), predictor, gate, dispatch, and
//! the fuel ticker, all connected by bounded channels and stopped by a
//! single shutdown flag. Network I/O never blocks processing; the
//! reflex and learned paths race by design and meet again only at the
//! arbitrator.

use crate::actor::{ActionSink, Actor, Locomotion};
use crate::arbiter::ExecutionArbitrator;
use crate::buffer::WindowedBuffer;
use crate::classifier::GestureClassifier;
use crate::collector::Collector;
use crate::config::ControllerConfig;
use crate::diagnostics::{Diagnostics, DiagnosticsReport};
use crate::gate::ConfidenceGate;
use crate::predictor::Predictor;
use crate::reflex::ReflexDetector;
use crate::spatial::{Quaternion, SharedOrientation};
use crate::types::{ActionCommand, Facing, SamplePayload};
use crate::error::ControllerError;
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Timeout for every blocking receive, keeping shutdown responsive.
const RECV_TIMEOUT: Duration = Duration::from_millis(50);
/// Candidate-action channel depth; drained by the dispatch loop far
/// faster than either layer produces.
const ACTION_QUEUE: usize = 32;
/// Status line cadence, in decay ticks.
const STATUS_EVERY_TICKS: u32 = 10;

/// A running sensor-to-action pipeline.
pub struct Pipeline {
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
    diagnostics: Arc<Diagnostics>,
    locomotion: Arc<Locomotion>,
    local_addr: SocketAddr,
    learned_path: bool,
}

impl Pipeline {
    /// Bind the sensor socket and spawn all workers.
    ///
    /// `classifier` is the injected external artifact; `None` runs the
    /// deliberate degraded mode where only the reflex path proposes
    /// actions.
    pub fn start(
        config: ControllerConfig,
        classifier: Option<Box<dyn GestureClassifier>>,
        sink: Arc<dyn ActionSink>,
    ) -> Result<Self, ControllerError> {
        let socket = UdpSocket::bind(&config.network.listen_addr)?;
        let local_addr = socket.local_addr()?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let diagnostics = Arc::new(Diagnostics::new());

        let orientation = SharedOrientation::new();
        let buffer = Arc::new(WindowedBuffer::new(
            config.buffer.window_size,
            config.buffer.fill_ratio,
        ));

        let key = |name: &str, fallback: &str| {
            config
                .actor
                .keys
                .get(name)
                .cloned()
                .unwrap_or_else(|| fallback.to_string())
        };
        let locomotion = Arc::new(Locomotion::new(
            config.walk.clone(),
            key("left", "Key.left"),
            key("right", "Key.right"),
        ));
        let actor = Actor::new(&config.actor, sink.clone(), locomotion.clone());

        let (sample_tx, sample_rx) = bounded(config.network.sample_queue.max(1));
        let (action_tx, action_rx) = bounded::<ActionCommand>(ACTION_QUEUE);
        let (prediction_tx, prediction_rx) = bounded(1);

        let mut handles = Vec::new();

        // Collector: socket -> sample channel, drop-oldest.
        {
            let collector = Collector::new(
                socket,
                sample_tx.clone(),
                sample_rx.clone(),
                shutdown.clone(),
                diagnostics.clone(),
            )?;
            handles.push(spawn_worker("collector", move || collector.run()));
        }

        // Ingest: typed dispatch, buffer feed, inline reflex path.
        {
            let shutdown = shutdown.clone();
            let diagnostics = diagnostics.clone();
            let buffer = buffer.clone();
            let locomotion = locomotion.clone();
            let orientation = orientation.clone();
            let reflex = ReflexDetector::new(config.reflex.clone());
            let action_tx = action_tx.clone();
            handles.push(spawn_worker("ingest", move || {
                run_ingest(
                    &shutdown,
                    &sample_rx,
                    &orientation,
                    &buffer,
                    &locomotion,
                    &reflex,
                    &action_tx,
                    &diagnostics,
                )
            }));
        }

        // Predictor: optional, free-running over the shared buffer.
        let learned_path = classifier.is_some();
        if let Some(classifier) = classifier {
            let predictor = Predictor::new(
                buffer,
                classifier,
                config.buffer.stride,
                prediction_tx,
                prediction_rx.clone(),
                shutdown.clone(),
                diagnostics.clone(),
            );
            handles.push(spawn_worker("predictor", move || predictor.run()));
        } else {
            log::warn!("Learned path disabled; reflex layer running alone");
        }

        // Gate: prediction stream -> settled candidates.
        {
            let shutdown = shutdown.clone();
            let diagnostics = diagnostics.clone();
            let mut gate =
                ConfidenceGate::new(config.gate.window_size, config.gate.min_confidence);
            let action_tx = action_tx.clone();
            handles.push(spawn_worker("gate", move || {
                run_gate(
                    &shutdown,
                    &prediction_rx,
                    &mut gate,
                    &action_tx,
                    &diagnostics,
                )
            }));
        }

        // Dispatch: arbitration + actor side effects.
        {
            let shutdown = shutdown.clone();
            let diagnostics = diagnostics.clone();
            let mut arbiter = ExecutionArbitrator::new(&config.arbitrator);
            handles.push(spawn_worker("dispatch", move || {
                run_dispatch(&shutdown, &action_rx, &mut arbiter, &actor, &diagnostics)
            }));
        }

        // Ticker: fuel decay and the periodic status line.
        {
            let shutdown = shutdown.clone();
            let diagnostics = diagnostics.clone();
            let locomotion = locomotion.clone();
            let tick = Duration::from_millis(config.walk.decay_tick_ms.max(1));
            handles.push(spawn_worker("ticker", move || {
                run_ticker(&shutdown, &locomotion, sink.as_ref(), tick, &diagnostics)
            }));
        }

        log::info!(
            "Pipeline up on {} ({} mode)",
            local_addr,
            if learned_path { "hybrid" } else { "reflex-only" }
        );

        Ok(Self {
            shutdown,
            handles,
            diagnostics,
            locomotion,
            local_addr,
            learned_path,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn learned_path_enabled(&self) -> bool {
        self.learned_path
    }

    pub fn diagnostics(&self) -> DiagnosticsReport {
        self.diagnostics.snapshot()
    }

    pub fn fuel(&self) -> f32 {
        self.locomotion.fuel()
    }

    pub fn facing(&self) -> Facing {
        self.locomotion.facing()
    }

    /// Trip the shutdown flag and join every worker.
    pub fn shutdown(mut self) -> DiagnosticsReport {
        log::info!("Shutting down pipeline...");
        self.shutdown.store(true, Ordering::Relaxed);
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("A pipeline worker panicked during shutdown");
            }
        }
        let report = self.diagnostics.snapshot();
        log::info!(
            "Pipeline stopped: {} dispatched, {} suppressed, {} packets dropped, {} malformed",
            report.dispatched_actions,
            report.suppressed_actions,
            report.dropped_packets,
            report.malformed_packets
        );
        report
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // Workers poll this flag; a dropped-without-shutdown pipeline
        // still winds down instead of leaking spinning threads.
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

fn spawn_worker(name: &str, body: impl FnOnce() + Send + 'static) -> JoinHandle<()> {
    std::thread::Builder::new()
        .name(name.to_string())
        .spawn(body)
        .unwrap_or_else(|e| panic!("failed to spawn {} worker: {}", name, e))
}

/// Sample consumer: the latency-critical path. The reflex detector runs
/// inline here as a direct function call, not a separately scheduled
/// stage, so a qualifying sample becomes a candidate command with no
/// extra hops.
#[allow(clippy::too_many_arguments)]
fn run_ingest(
    shutdown: &AtomicBool,
    sample_rx: &Receiver<crate::types::SensorSample>,
    orientation: &SharedOrientation,
    buffer: &WindowedBuffer,
    locomotion: &Locomotion,
    reflex: &ReflexDetector,
    action_tx: &Sender<ActionCommand>,
    diagnostics: &Diagnostics,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let sample = match sample_rx.recv_timeout(RECV_TIMEOUT) {
            Ok(sample) => sample,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        match sample.payload {
            SamplePayload::Orientation { x, y, z, w } => {
                orientation.set(Quaternion::new(w, x, y, z));
                buffer.push(&sample);
            }
            SamplePayload::Acceleration { x, y, z } => {
                buffer.push(&sample);
                let current = orientation.get();
                let world = ReflexDetector::world_components([x, y, z], &current);
                diagnostics.observe_world_accel(world.z, world.xy_magnitude);
                if let Some(command) = reflex.detect([x, y, z], &current) {
                    if action_tx.try_send(command).is_err() {
                        log::trace!("action queue full; reflex candidate dropped");
                    }
                }
            }
            SamplePayload::AngularRate { .. } => {
                buffer.push(&sample);
            }
            SamplePayload::StepEvent => {
                locomotion.add_step_fuel();
            }
        }
    }
    log::debug!("Ingest stopped");
}

fn run_gate(
    shutdown: &AtomicBool,
    prediction_rx: &Receiver<crate::types::Prediction>,
    gate: &mut ConfidenceGate,
    action_tx: &Sender<ActionCommand>,
    diagnostics: &Diagnostics,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let prediction = match prediction_rx.recv_timeout(RECV_TIMEOUT) {
            Ok(prediction) => prediction,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let commands = gate.observe(&prediction);
        diagnostics.set_gate_state(gate.settled().map(str::to_string));
        for command in commands {
            if action_tx.try_send(command).is_err() {
                log::trace!("action queue full; settled candidate dropped");
            }
        }
    }
    log::debug!("Gate stopped");
}

fn run_dispatch(
    shutdown: &AtomicBool,
    action_rx: &Receiver<ActionCommand>,
    arbiter: &mut ExecutionArbitrator,
    actor: &Actor,
    diagnostics: &Diagnostics,
) {
    while !shutdown.load(Ordering::Relaxed) {
        let command = match action_rx.recv_timeout(RECV_TIMEOUT) {
            Ok(command) => command,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if arbiter.admit(&command) {
            actor.execute(&command);
            Diagnostics::count(&diagnostics.dispatched_actions);
        } else {
            Diagnostics::count(&diagnostics.suppressed_actions);
        }
    }
    log::debug!("Dispatch stopped");
}

fn run_ticker(
    shutdown: &AtomicBool,
    locomotion: &Locomotion,
    sink: &dyn ActionSink,
    tick: Duration,
    diagnostics: &Diagnostics,
) {
    let mut last = Instant::now();
    let mut ticks: u32 = 0;
    while !shutdown.load(Ordering::Relaxed) {
        std::thread::sleep(tick);
        let now = Instant::now();
        locomotion.tick(now - last, sink);
        last = now;

        ticks = ticks.wrapping_add(1);
        if ticks % STATUS_EVERY_TICKS == 0 {
            let report = diagnostics.snapshot();
            log::debug!(
                "facing {} | walk {} | fuel {:.1}s | peak z {:.1} xy {:.1} | gate {}",
                locomotion.facing(),
                if locomotion.is_walking() { "on" } else { "off" },
                locomotion.fuel(),
                report.peak_world_z,
                report.peak_world_xy,
                report.gate_state.as_deref().unwrap_or("-")
            );
        }
    }
    log::debug!("Ticker stopped");
}
