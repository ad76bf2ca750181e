//! Sensor packet collector
//!
//! Reads raw UDP datagrams from the watch, parses them into typed
//! `SensorSample`s, and republishes onto a bounded channel with a
//! drop-oldest-on-full policy: stale sensor data is worse than missing
//! data for a real-time controller, so the producer never waits on a slow
//! consumer. Malformed or unrecognized packets are dropped and counted,
//! never propagated.

use crate::diagnostics::Diagnostics;
use crate::types::{SamplePayload, SensorSample};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Deserialize;
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const RECV_TIMEOUT: Duration = Duration::from_millis(50);
const MAX_DATAGRAM: usize = 2048;

/// Wire shape of one sensor datagram.
///
/// Tolerant by construction: any numeric field may be absent (zero, or
/// one for the quaternion scalar) and extra fields are ignored.
#[derive(Debug, Deserialize)]
struct WirePacket {
    sensor: String,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    values: WireValues,
}

#[derive(Debug, Default, Deserialize)]
struct WireValues {
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    z: Option<f64>,
    #[serde(default)]
    w: Option<f64>,
}

/// Parse one datagram into a typed sample.
///
/// `fallback_ts` stamps packets that carry no timestamp. Returns None for
/// anything unparseable or tagged with an unknown channel.
pub fn parse_packet(data: &[u8], fallback_ts: i64) -> Option<SensorSample> {
    let packet: WirePacket = serde_json::from_slice(data).ok()?;
    let v = &packet.values;

    let payload = match packet.sensor.as_str() {
        "linear_acceleration" => SamplePayload::Acceleration {
            x: v.x.unwrap_or(0.0),
            y: v.y.unwrap_or(0.0),
            z: v.z.unwrap_or(0.0),
        },
        "gyroscope" => SamplePayload::AngularRate {
            x: v.x.unwrap_or(0.0),
            y: v.y.unwrap_or(0.0),
            z: v.z.unwrap_or(0.0),
        },
        "rotation_vector" => SamplePayload::Orientation {
            x: v.x.unwrap_or(0.0),
            y: v.y.unwrap_or(0.0),
            z: v.z.unwrap_or(0.0),
            w: v.w.unwrap_or(1.0),
        },
        "step_detector" => SamplePayload::StepEvent,
        _ => return None,
    };

    Some(SensorSample::new(
        payload,
        packet.timestamp.unwrap_or(fallback_ts),
    ))
}

/// Publish with drop-oldest-on-full semantics.
///
/// The publisher holds its own receiver clone; on a full channel it pops
/// one queued sample and retries, so the producer never blocks. Evictions
/// are counted.
pub fn publish_drop_oldest(
    tx: &Sender<SensorSample>,
    rx: &Receiver<SensorSample>,
    sample: SensorSample,
    diagnostics: &Diagnostics,
) {
    match tx.try_send(sample) {
        Ok(()) => {}
        Err(TrySendError::Full(sample)) => {
            if rx.try_recv().is_ok() {
                Diagnostics::count(&diagnostics.dropped_packets);
            }
            if tx.try_send(sample).is_err() {
                // Consumer raced us back to full; favor the newest data
                // next time round.
                Diagnostics::count(&diagnostics.dropped_packets);
            }
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// UDP collector worker.
pub struct Collector {
    socket: UdpSocket,
    tx: Sender<SensorSample>,
    rx: Receiver<SensorSample>,
    shutdown: Arc<AtomicBool>,
    diagnostics: Arc<Diagnostics>,
    clock_origin: Instant,
}

impl Collector {
    pub fn new(
        socket: UdpSocket,
        tx: Sender<SensorSample>,
        rx: Receiver<SensorSample>,
        shutdown: Arc<AtomicBool>,
        diagnostics: Arc<Diagnostics>,
    ) -> std::io::Result<Self> {
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        Ok(Self {
            socket,
            tx,
            rx,
            shutdown,
            diagnostics,
            clock_origin: Instant::now(),
        })
    }

    /// Blocking loop; returns when the shutdown flag trips.
    pub fn run(&self) {
        let mut buf = [0u8; MAX_DATAGRAM];
        log::info!(
            "Collector listening on {}",
            self.socket
                .local_addr()
                .map(|a| a.to_string())
                .unwrap_or_else(|_| "<unknown>".to_string())
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            let len = match self.socket.recv_from(&mut buf) {
                Ok((len, _src)) => len,
                Err(e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    continue;
                }
                Err(e) => {
                    log::warn!("Sensor socket recv error: {}", e);
                    continue;
                }
            };

            let fallback_ts = self.clock_origin.elapsed().as_millis() as i64;
            match parse_packet(&buf[..len], fallback_ts) {
                Some(sample) => {
                    log::trace!("sample {:?}", sample.channel());
                    publish_drop_oldest(&self.tx, &self.rx, sample, &self.diagnostics);
                }
                None => {
                    Diagnostics::count(&self.diagnostics.malformed_packets);
                }
            }
        }

        log::debug!("Collector stopped");
    }
}
