//! Trained classifier over the numeric/categorical login features.
//!
//! The model is a logistic regression exported to a small JSON artifact by
//! the offline training job. Inference is a dot product plus a sigmoid, so
//! the output is always a valid probability in [0, 1].

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::ScoringError;
use crate::models::FeaturePayload;

/// Per-feature weights of the exported model.
///
/// Positive weights push toward risk. Field names match the training
/// pipeline's feature order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureWeights {
    pub password_length: f64,
    pub used_special_characters: f64,
    pub login_attempts: f64,
    pub was_capslock_on: f64,
    pub browser_tab_count: f64,
    pub typing_speed_wpm: f64,
}

/// Serialized form of the trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierArtifact {
    pub bias: f64,
    pub weights: FeatureWeights,
}

/// Logistic-regression risk classifier loaded from a JSON artifact
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    artifact: ClassifierArtifact,
}

impl RiskClassifier {
    /// Load a classifier from a JSON artifact on disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScoringError> {
        let contents = std::fs::read_to_string(path)?;
        let artifact: ClassifierArtifact = serde_json::from_str(&contents)?;
        Ok(RiskClassifier { artifact })
    }

    pub fn from_artifact(artifact: ClassifierArtifact) -> Self {
        RiskClassifier { artifact }
    }

    /// Base risk score for a payload, in [0, 1]
    pub fn score(&self, payload: &FeaturePayload) -> f64 {
        let w = &self.artifact.weights;
        let f = normalized_features(payload);

        let z = self.artifact.bias
            + w.password_length * f[0]
            + w.used_special_characters * f[1]
            + w.login_attempts * f[2]
            + w.was_capslock_on * f[3]
            + w.browser_tab_count * f[4]
            + w.typing_speed_wpm * f[5];

        sigmoid(z)
    }
}

/// Scale raw features into [0, 1], matching the training preprocessing
fn normalized_features(payload: &FeaturePayload) -> [f64; 6] {
    [
        (payload.password_length as f64 / 32.0).min(1.0),
        if payload.used_special_characters { 1.0 } else { 0.0 },
        ((payload.login_attempts.saturating_sub(1)) as f64 / 10.0).min(1.0),
        if payload.was_capslock_on { 1.0 } else { 0.0 },
        (payload.browser_tab_count as f64 / 20.0).min(1.0),
        (payload.typing_speed_wpm / 150.0).min(1.0),
    ]
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(attempts: u32, wpm: f64, special: bool) -> FeaturePayload {
        FeaturePayload {
            password_length: 10,
            used_special_characters: special,
            keyboard_language: "EN".to_string(),
            login_attempts: attempts,
            was_capslock_on: false,
            browser_tab_count: 3,
            challenge_sequence: "3-3-3".to_string(),
            timezone: "UTC".to_string(),
            typing_speed_wpm: wpm,
        }
    }

    fn test_artifact() -> ClassifierArtifact {
        ClassifierArtifact {
            bias: -2.0,
            weights: FeatureWeights {
                password_length: -1.0,
                used_special_characters: -1.5,
                login_attempts: 2.5,
                was_capslock_on: 0.5,
                browser_tab_count: 1.0,
                typing_speed_wpm: 2.0,
            },
        }
    }

    #[test]
    fn test_score_is_bounded_probability() {
        let classifier = RiskClassifier::from_artifact(test_artifact());
        for attempts in [1, 3, 8, 50] {
            for wpm in [30.0, 60.0, 150.0] {
                let score = classifier.score(&payload(attempts, wpm, false));
                assert!((0.0..=1.0).contains(&score));
            }
        }
    }

    #[test]
    fn test_riskier_features_raise_score() {
        let classifier = RiskClassifier::from_artifact(test_artifact());
        let calm = classifier.score(&payload(1, 60.0, true));
        let hot = classifier.score(&payload(9, 150.0, false));
        assert!(hot > calm);
    }

    #[test]
    fn test_artifact_json_roundtrip() {
        let artifact = test_artifact();
        let json = serde_json::to_string(&artifact).unwrap();
        let back: ClassifierArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bias, artifact.bias);
        assert_eq!(back.weights.login_attempts, artifact.weights.login_attempts);
    }

    #[test]
    fn test_from_file_missing_artifact_errors() {
        let result = RiskClassifier::from_file("/nonexistent/risk_model.json");
        assert!(matches!(result, Err(ScoringError::Io(_))));
    }

    #[test]
    fn test_from_file_loads_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_model.json");
        std::fs::write(&path, serde_json::to_string(&test_artifact()).unwrap()).unwrap();

        let classifier = RiskClassifier::from_file(&path).unwrap();
        let score = classifier.score(&payload(1, 60.0, true));
        assert!((0.0..=1.0).contains(&score));
    }
}
