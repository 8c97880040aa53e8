//! The scoring pipeline: classifier base, heuristic boosts, clamp, floors,
//! threshold mapping.

use crate::config::ScoringConfig;
use crate::models::{reasons, FeaturePayload, RiskAssessment};

use super::classifier::RiskClassifier;
use super::heuristics::{self, ScoreContext};

/// Base score used when no trained classifier is available.
///
/// Deliberately below the medium threshold: with no model and no fired
/// heuristics an attempt stays low risk.
const HEURISTIC_BASE_SCORE: f64 = 0.15;

/// Maps `(username, FeaturePayload)` to a `RiskAssessment`.
///
/// The classifier supplies the base score; heuristic boosts are added on
/// top, the sum is clamped to [0, 1], and heuristic floors are applied
/// last so no stage can lower another's verdict. When the classifier is
/// missing the pipeline degrades to heuristics-only and tags every
/// assessment with `heuristic_fallback` instead of failing the attempt.
pub struct RiskScorer {
    classifier: Option<RiskClassifier>,
    config: ScoringConfig,
}

impl RiskScorer {
    /// Build a scorer, loading the classifier artifact named in the config.
    ///
    /// A missing or unreadable artifact logs a warning and produces a
    /// heuristics-only scorer; it never propagates as an error.
    pub fn new(config: ScoringConfig) -> Self {
        let classifier = match config.model_path.as_ref() {
            Some(path) => match RiskClassifier::from_file(path) {
                Ok(classifier) => Some(classifier),
                Err(e) => {
                    log::warn!(
                        "Classifier artifact {:?} unavailable ({}), running heuristics-only",
                        path,
                        e
                    );
                    None
                }
            },
            None => None,
        };
        RiskScorer { classifier, config }
    }

    /// Build a scorer with an explicit (or explicitly absent) classifier
    pub fn with_classifier(config: ScoringConfig, classifier: Option<RiskClassifier>) -> Self {
        RiskScorer { classifier, config }
    }

    pub fn has_classifier(&self) -> bool {
        self.classifier.is_some()
    }

    /// Score one payload against the per-user context
    pub fn assess(&self, payload: &FeaturePayload, context: &ScoreContext) -> RiskAssessment {
        let triggers = heuristics::evaluate(
            payload,
            context,
            &self.config.heuristics,
            &self.config.thresholds,
        );

        let base = match &self.classifier {
            Some(classifier) => classifier.score(payload),
            None => HEURISTIC_BASE_SCORE,
        };

        let boost: f64 = triggers.iter().map(|t| t.boost).sum();
        let mut score = (base + boost).clamp(0.0, 1.0);

        // Floors act last: a floor can raise the score, never cap it
        for trigger in &triggers {
            if let Some(floor) = trigger.floor {
                score = score.max(floor.min(1.0));
            }
        }

        let mut reason_codes: Vec<String> =
            triggers.iter().map(|t| t.reason.to_string()).collect();
        if self.classifier.is_none() {
            reason_codes.push(reasons::HEURISTIC_FALLBACK.to_string());
        }

        RiskAssessment {
            risk_score: score,
            risk_level: self.config.thresholds.level_for(score),
            reasons: reason_codes,
        }
    }
}
