//! Classifier wrapper
//!
//! The trained gesture classifier is an external collaborator: the core
//! consumes it only through the narrow `GestureClassifier` contract (a
//! declared feature-name order plus a predict call) and never sees how
//! it was trained. The default artifact is a JSON-serialized scaled
//! linear model exported by the training pipeline. A missing or invalid
//! artifact disables the learned path at startup; the reflex path keeps
//! running alone.

use crate::error::ControllerError;
use crate::types::Prediction;
use serde::Deserialize;
use std::path::Path;

/// Narrow prediction contract the pipeline depends on.
pub trait GestureClassifier: Send {
    /// Feature names in the exact order `predict` expects its vector.
    fn feature_names(&self) -> &[String];

    /// Classify one aligned feature vector.
    fn predict(&self, features: &[f64]) -> Prediction;
}

/// Scaled linear model artifact.
///
/// Wire shape: feature names, class labels, standard-scaler mean/scale,
/// one weight row per class plus intercepts. Confidence is the softmax
/// probability of the winning class.
#[derive(Debug, Clone, Deserialize)]
pub struct LinearGestureModel {
    feature_names: Vec<String>,
    labels: Vec<String>,
    scaler_mean: Vec<f64>,
    scaler_scale: Vec<f64>,
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

impl LinearGestureModel {
    pub fn from_json(raw: &str) -> Result<Self, ControllerError> {
        let model: LinearGestureModel = serde_json::from_str(raw)
            .map_err(|e| ControllerError::Artifact(format!("invalid model JSON: {}", e)))?;
        model.validate()?;
        Ok(model)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControllerError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ControllerError::Artifact(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// An internally inconsistent artifact is a configuration error, not
    /// something to limp along with at runtime.
    fn validate(&self) -> Result<(), ControllerError> {
        let n = self.feature_names.len();
        let k = self.labels.len();
        if n == 0 || k == 0 {
            return Err(ControllerError::Artifact(
                "artifact declares no features or no labels".to_string(),
            ));
        }
        if self.scaler_mean.len() != n || self.scaler_scale.len() != n {
            return Err(ControllerError::Artifact(format!(
                "scaler length {}/{} does not match {} features",
                self.scaler_mean.len(),
                self.scaler_scale.len(),
                n
            )));
        }
        if self.weights.len() != k || self.intercepts.len() != k {
            return Err(ControllerError::Artifact(format!(
                "{} weight rows / {} intercepts for {} labels",
                self.weights.len(),
                self.intercepts.len(),
                k
            )));
        }
        if let Some(row) = self.weights.iter().find(|row| row.len() != n) {
            return Err(ControllerError::Artifact(format!(
                "weight row length {} does not match {} features",
                row.len(),
                n
            )));
        }
        Ok(())
    }
}

impl GestureClassifier for LinearGestureModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict(&self, features: &[f64]) -> Prediction {
        // Standard-scale, guarding zero-variance columns.
        let scaled: Vec<f64> = features
            .iter()
            .zip(self.scaler_mean.iter().zip(self.scaler_scale.iter()))
            .map(|(&x, (&m, &s))| if s.abs() > f64::EPSILON { (x - m) / s } else { 0.0 })
            .collect();

        let decisions: Vec<f64> = self
            .weights
            .iter()
            .zip(self.intercepts.iter())
            .map(|(row, &b)| {
                row.iter().zip(scaled.iter()).map(|(w, x)| w * x).sum::<f64>() + b
            })
            .collect();

        // Softmax with max subtraction for numeric stability.
        let peak = decisions.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let exps: Vec<f64> = decisions.iter().map(|d| (d - peak).exp()).collect();
        let total: f64 = exps.iter().sum();

        let mut best = 0;
        for (i, &e) in exps.iter().enumerate() {
            if e > exps[best] {
                best = i;
            }
        }

        Prediction {
            label: self.labels[best].clone(),
            confidence: if total > 0.0 { exps[best] / total } else { 0.0 },
        }
    }
}

/// Load the configured artifact, mapping failure to a disabled learned
/// path rather than a startup error.
pub fn load_classifier(model_path: &str) -> Option<Box<dyn GestureClassifier>> {
    if model_path.is_empty() {
        log::info!("No classifier artifact configured; learned path disabled");
        return None;
    }
    match LinearGestureModel::load(model_path) {
        Ok(model) => {
            log::info!(
                "Classifier artifact loaded: {} features, {} labels",
                model.feature_names.len(),
                model.labels.len()
            );
            Some(Box::new(model))
        }
        Err(e) => {
            log::warn!("{}; running reflex-only", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_class_artifact() -> &'static str {
        // Two features, two labels; weights chosen so large feature 0
        // means "jump" and large feature 1 means "turn".
        r#"{
            "feature_names": ["accel_z_max", "gyro_z_rms"],
            "labels": ["jump", "turn"],
            "scaler_mean": [0.0, 0.0],
            "scaler_scale": [1.0, 1.0],
            "weights": [[2.0, -1.0], [-1.0, 2.0]],
            "intercepts": [0.0, 0.0]
        }"#
    }

    #[test]
    fn test_predict_picks_dominant_class() {
        let model = LinearGestureModel::from_json(two_class_artifact()).unwrap();
        let p = model.predict(&[3.0, 0.1]);
        assert_eq!(p.label, "jump");
        assert!(p.confidence > 0.5 && p.confidence <= 1.0);

        let p = model.predict(&[0.1, 3.0]);
        assert_eq!(p.label, "turn");
    }

    #[test]
    fn test_feature_name_order_preserved() {
        let model = LinearGestureModel::from_json(two_class_artifact()).unwrap();
        assert_eq!(model.feature_names(), &["accel_z_max", "gyro_z_rms"]);
    }

    #[test]
    fn test_scaler_applied() {
        let raw = r#"{
            "feature_names": ["f"],
            "labels": ["a", "b"],
            "scaler_mean": [10.0],
            "scaler_scale": [2.0],
            "weights": [[1.0], [-1.0]],
            "intercepts": [0.0, 0.0]
        }"#;
        let model = LinearGestureModel::from_json(raw).unwrap();
        // Raw 14 scales to +2 -> class "a"; raw 6 scales to -2 -> "b".
        assert_eq!(model.predict(&[14.0]).label, "a");
        assert_eq!(model.predict(&[6.0]).label, "b");
        // At the scaler mean the decision is a tie; confidence is 0.5.
        assert!((model.predict(&[10.0]).confidence - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let raw = r#"{
            "feature_names": ["a", "b"],
            "labels": ["x"],
            "scaler_mean": [0.0, 0.0],
            "scaler_scale": [1.0, 1.0],
            "weights": [[1.0]],
            "intercepts": [0.0]
        }"#;
        assert!(matches!(
            LinearGestureModel::from_json(raw),
            Err(ControllerError::Artifact(_))
        ));
    }

    #[test]
    fn test_missing_artifact_disables_path() {
        assert!(load_classifier("/no/such/model.json").is_none());
        assert!(load_classifier("").is_none());
    }
}
