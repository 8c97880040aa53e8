//! Risk scoring pipeline.
//!
//! Scoring is an ordered sequence of pure stages: classifier base score,
//! additive heuristic boosts, clamp to [0, 1], heuristic floors, then the
//! threshold mapping to a discrete level. Heuristics can only raise the
//! final score, never lower it.

pub mod classifier;
pub mod heuristics;
pub mod pipeline;

pub use classifier::{ClassifierArtifact, RiskClassifier};
pub use heuristics::ScoreContext;
pub use pipeline::RiskScorer;

use thiserror::Error;

/// Errors raised while loading the classifier artifact
#[derive(Error, Debug)]
pub enum ScoringError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed classifier artifact: {0}")]
    Artifact(#[from] serde_json::Error),
}
