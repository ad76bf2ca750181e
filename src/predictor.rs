//! Predictor worker
//!
//! Free-running loop around the injected classifier: as soon as the
//! windowed buffer has enough new data, snapshot -> extract -> align ->
//! predict -> publish. There is no fixed polling interval: throughput
//! is bounded only by compute cost, because shorter effective latency
//! between gesture and recognition is strictly better. The output
//! channel holds a single prediction; an unread one is replaced, since
//! only the latest matters to the gate.

use crate::buffer::WindowedBuffer;
use crate::classifier::GestureClassifier;
use crate::diagnostics::Diagnostics;
use crate::features::extract_features;
use crate::types::Prediction;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Nap between unready polls so an idle buffer doesn't spin a core.
const IDLE_NAP: Duration = Duration::from_millis(2);

pub struct Predictor {
    buffer: Arc<WindowedBuffer>,
    classifier: Box<dyn GestureClassifier>,
    stride: usize,
    tx: Sender<Prediction>,
    rx: Receiver<Prediction>,
    shutdown: Arc<AtomicBool>,
    diagnostics: Arc<Diagnostics>,
}

impl Predictor {
    pub fn new(
        buffer: Arc<WindowedBuffer>,
        classifier: Box<dyn GestureClassifier>,
        stride: usize,
        tx: Sender<Prediction>,
        rx: Receiver<Prediction>,
        shutdown: Arc<AtomicBool>,
        diagnostics: Arc<Diagnostics>,
    ) -> Self {
        Self {
            buffer,
            classifier,
            stride,
            tx,
            rx,
            shutdown,
            diagnostics,
        }
    }

    /// One extraction/prediction attempt; true if a prediction was
    /// published this cycle.
    pub fn cycle(&self) -> bool {
        if !self.buffer.ready_for_extraction(self.stride) {
            return false;
        }
        let snapshot = self.buffer.snapshot();
        if snapshot.is_empty() {
            return false;
        }

        let features = extract_features(&snapshot);
        if features.is_empty() {
            // Degenerate window: skip the cycle, never fault.
            return false;
        }

        let aligned = features.aligned(self.classifier.feature_names());
        let prediction = self.classifier.predict(&aligned);
        Diagnostics::count(&self.diagnostics.predictions);
        log::trace!(
            "predict {} ({:.2})",
            prediction.label,
            prediction.confidence
        );

        match self.tx.try_send(prediction) {
            Ok(()) => {}
            Err(TrySendError::Full(prediction)) => {
                // Only the latest prediction matters; evict the unread one.
                if self.rx.try_recv().is_ok() {
                    Diagnostics::count(&self.diagnostics.dropped_predictions);
                }
                let _ = self.tx.try_send(prediction);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
        true
    }

    /// Blocking loop; returns when the shutdown flag trips.
    pub fn run(&self) {
        log::info!(
            "Predictor running ({} features expected)",
            self.classifier.feature_names().len()
        );
        while !self.shutdown.load(Ordering::Relaxed) {
            if !self.cycle() {
                std::thread::sleep(IDLE_NAP);
            }
        }
        log::debug!("Predictor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SamplePayload, SensorSample};
    use crossbeam_channel::bounded;

    /// Fixed-output classifier for exercising the loop plumbing.
    struct StubClassifier {
        names: Vec<String>,
        label: &'static str,
    }

    impl GestureClassifier for StubClassifier {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, features: &[f64]) -> Prediction {
            assert_eq!(features.len(), self.names.len());
            Prediction {
                label: self.label.to_string(),
                confidence: 0.9,
            }
        }
    }

    fn predictor_with_buffer(
        buffer: Arc<WindowedBuffer>,
    ) -> (Predictor, Receiver<Prediction>) {
        let (tx, rx) = bounded(1);
        let predictor = Predictor::new(
            buffer,
            Box::new(StubClassifier {
                names: vec!["accel_x_mean".to_string(), "not_produced".to_string()],
                label: "turn",
            }),
            2,
            tx,
            rx.clone(),
            Arc::new(AtomicBool::new(false)),
            Arc::new(Diagnostics::new()),
        );
        (predictor, rx)
    }

    fn fill(buffer: &WindowedBuffer, n: i64) {
        for ts in 0..n {
            buffer.push(&SensorSample::new(
                SamplePayload::Acceleration { x: 1.0, y: 0.0, z: 0.0 },
                ts,
            ));
        }
    }

    #[test]
    fn test_cycle_waits_for_fill() {
        let buffer = Arc::new(WindowedBuffer::new(8, 1.0));
        let (predictor, rx) = predictor_with_buffer(buffer.clone());
        fill(&buffer, 4);
        assert!(!predictor.cycle());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cycle_publishes_prediction() {
        let buffer = Arc::new(WindowedBuffer::new(8, 0.5));
        let (predictor, rx) = predictor_with_buffer(buffer.clone());
        fill(&buffer, 8);
        assert!(predictor.cycle());
        let prediction = rx.try_recv().expect("prediction published");
        assert_eq!(prediction.label, "turn");
    }

    #[test]
    fn test_stride_gates_back_to_back_cycles() {
        let buffer = Arc::new(WindowedBuffer::new(8, 0.5));
        let (predictor, _rx) = predictor_with_buffer(buffer.clone());
        fill(&buffer, 8);
        assert!(predictor.cycle());
        // No new samples since the snapshot: the next cycle idles.
        assert!(!predictor.cycle());
        fill(&buffer, 2);
        assert!(predictor.cycle());
    }

    #[test]
    fn test_unread_prediction_is_replaced() {
        let buffer = Arc::new(WindowedBuffer::new(8, 0.5));
        let (predictor, rx) = predictor_with_buffer(buffer.clone());
        fill(&buffer, 8);
        assert!(predictor.cycle());
        fill(&buffer, 2);
        assert!(predictor.cycle());
        // Both cycles published; only one (the latest) is readable.
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
