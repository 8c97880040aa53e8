use serde::{Deserialize, Serialize};

use super::event::RiskLevel;

/// Directory entry for a known user.
///
/// The directory itself is owned by an external collaborator; we only store
/// the projection needed for list views plus the password hash used by the
/// credential check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
}

/// Derived per-user risk state, maintained eagerly on each event write.
///
/// Not authoritative: it can always be recomputed from the event history.
/// `last_timezone` powers the new-timezone heuristic on the next attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRiskProfile {
    pub username: String,
    pub last_risk_level: RiskLevel,
    pub last_risk_score: f64,
    pub last_timezone: Option<String>,
    /// Unix milliseconds of the most recent attempt
    pub last_login_at_ms: i64,
}
