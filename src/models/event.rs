use serde::{Deserialize, Serialize};
use std::fmt;

use super::payload::FeaturePayload;

/// Discrete risk bucket derived from the continuous risk score.
///
/// The derive order matters: `Low < Medium < High`, so level comparisons
/// follow score comparisons under any monotonic threshold mapping.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }

    /// Parse the database/wire representation back into a level
    pub fn parse(s: &str) -> Option<RiskLevel> {
        match s {
            "low" => Some(RiskLevel::Low),
            "medium" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the attempt was granted a session or blocked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Allowed,
    Denied,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Allowed => "allowed",
            Outcome::Denied => "denied",
        }
    }

    pub fn parse(s: &str) -> Option<Outcome> {
        match s {
            "allowed" => Some(Outcome::Allowed),
            "denied" => Some(Outcome::Denied),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of scoring one login attempt. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskAssessment {
    /// Final risk score in [0, 1]
    pub risk_score: f64,
    /// Level derived from the score via the configured thresholds
    pub risk_level: RiskLevel,
    /// One code per triggered heuristic, in trigger order, no duplicates
    pub reasons: Vec<String>,
}

impl RiskAssessment {
    pub fn has_reason(&self, code: &str) -> bool {
        self.reasons.iter().any(|r| r == code)
    }
}

/// A scored login attempt as persisted in the event store.
///
/// Owned exclusively by the store; never mutated after insert. The `id` is a
/// monotonically increasing surrogate key and doubles as the delivery cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginEvent {
    pub id: i64,
    pub username: String,
    /// Unix milliseconds
    pub created_at_ms: i64,
    pub payload: FeaturePayload,
    pub assessment: RiskAssessment,
    pub outcome: Outcome,
}

/// An event about to be recorded; the store assigns `id` on insert.
#[derive(Debug, Clone)]
pub struct NewLoginEvent {
    pub username: String,
    pub created_at_ms: i64,
    pub payload: FeaturePayload,
    pub assessment: RiskAssessment,
    pub outcome: Outcome,
}
