//! Monitoring aggregator: derived statistics over the event ledger.
//!
//! Everything here is computed fresh from store queries on demand; there
//! is no separate aggregate table to fall out of sync. Unknown users
//! yield an empty `exists = false` result instead of an error — these
//! reads are UI-facing and non-fatal.

use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::models::{LoginEvent, RiskLevel, UserRecord, UserRiskProfile};
use crate::persistence::{PersistenceError, RiskStore};

/// How many events feed the per-user view
const USER_EVENT_LIMIT: usize = 100;
/// How many trailing scores make up the trend series
const TREND_POINTS: usize = 30;

/// Event counts over a trailing window
#[derive(Debug, Clone, Serialize)]
pub struct GlobalStats {
    pub total_events: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub window_minutes: u32,
}

/// One point of a user's risk trend chart
#[derive(Debug, Clone, Serialize)]
pub struct RiskTrendPoint {
    pub timestamp_ms: i64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
}

/// Per-user monitoring view
#[derive(Debug, Clone, Serialize)]
pub struct UserMonitoring {
    pub username: String,
    pub exists: bool,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub total_logins: u64,
    pub avg_risk_score: f64,
    pub high_risk_count: u64,
    pub medium_risk_count: u64,
    pub low_risk_count: u64,
    /// Oldest-first trailing scores for charting
    pub risk_trend: Vec<RiskTrendPoint>,
    /// Newest-first recent events
    pub events: Vec<LoginEvent>,
}

impl UserMonitoring {
    fn missing(username: &str) -> Self {
        UserMonitoring {
            username: username.to_string(),
            exists: false,
            full_name: None,
            email: None,
            department: None,
            role: None,
            total_logins: 0,
            avg_risk_score: 0.0,
            high_risk_count: 0,
            medium_risk_count: 0,
            low_risk_count: 0,
            risk_trend: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// Directory row joined with the derived risk profile, for list views
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub department: Option<String>,
    pub role: Option<String>,
    pub last_risk_level: Option<RiskLevel>,
    pub last_risk_score: Option<f64>,
    pub last_login_at_ms: Option<i64>,
}

/// Read-path service over the event store
pub struct MonitoringService {
    store: Arc<dyn RiskStore>,
}

impl MonitoringService {
    pub fn new(store: Arc<dyn RiskStore>) -> Self {
        MonitoringService { store }
    }

    /// Event counts per risk level over the trailing window
    pub fn global_stats(&self, window_minutes: u32) -> Result<GlobalStats, PersistenceError> {
        let since_ms = Utc::now().timestamp_millis() - i64::from(window_minutes) * 60_000;
        self.global_stats_since(since_ms, window_minutes)
    }

    fn global_stats_since(
        &self,
        since_ms: i64,
        window_minutes: u32,
    ) -> Result<GlobalStats, PersistenceError> {
        let events = self.store.events_since(since_ms)?;
        let mut stats = GlobalStats {
            total_events: events.len() as u64,
            high: 0,
            medium: 0,
            low: 0,
            window_minutes,
        };
        for event in &events {
            match event.assessment.risk_level {
                RiskLevel::High => stats.high += 1,
                RiskLevel::Medium => stats.medium += 1,
                RiskLevel::Low => stats.low += 1,
            }
        }
        Ok(stats)
    }

    /// Full monitoring view for one user
    pub fn user_monitoring(&self, username: &str) -> Result<UserMonitoring, PersistenceError> {
        let record = match self.store.get_user(username)? {
            Some(record) => record,
            None => return Ok(UserMonitoring::missing(username)),
        };

        let events = self.store.events_for_user(username, USER_EVENT_LIMIT)?;
        let total_logins = self.store.count_events_for_user(username)?;

        let mut high = 0u64;
        let mut medium = 0u64;
        let mut low = 0u64;
        let mut score_sum = 0.0;
        for event in &events {
            score_sum += event.assessment.risk_score;
            match event.assessment.risk_level {
                RiskLevel::High => high += 1,
                RiskLevel::Medium => medium += 1,
                RiskLevel::Low => low += 1,
            }
        }
        let avg_risk_score = if events.is_empty() {
            0.0
        } else {
            score_sum / events.len() as f64
        };

        // Events arrive newest-first; the chart wants oldest-first
        let risk_trend: Vec<RiskTrendPoint> = events
            .iter()
            .take(TREND_POINTS)
            .rev()
            .map(|event| RiskTrendPoint {
                timestamp_ms: event.created_at_ms,
                risk_score: event.assessment.risk_score,
                risk_level: event.assessment.risk_level,
            })
            .collect();

        Ok(UserMonitoring {
            username: record.username,
            exists: true,
            full_name: record.full_name,
            email: record.email,
            department: record.department,
            role: record.role,
            total_logins,
            avg_risk_score,
            high_risk_count: high,
            medium_risk_count: medium,
            low_risk_count: low,
            risk_trend,
            events,
        })
    }

    /// Directory listing personalized with each user's latest risk state
    pub fn list_users(&self) -> Result<Vec<UserSummary>, PersistenceError> {
        let records = self.store.list_users()?;
        let mut profiles: std::collections::HashMap<String, UserRiskProfile> = self
            .store
            .list_profiles()?
            .into_iter()
            .map(|p| (p.username.clone(), p))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let profile = profiles.remove(&record.username);
                join_summary(record, profile)
            })
            .collect())
    }
}

fn join_summary(record: UserRecord, profile: Option<UserRiskProfile>) -> UserSummary {
    UserSummary {
        username: record.username,
        full_name: record.full_name,
        email: record.email,
        department: record.department,
        role: record.role,
        last_risk_level: profile.as_ref().map(|p| p.last_risk_level),
        last_risk_score: profile.as_ref().map(|p| p.last_risk_score),
        last_login_at_ms: profile.as_ref().map(|p| p.last_login_at_ms),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeaturePayload, NewLoginEvent, Outcome, RiskAssessment};
    use crate::persistence::SqliteRiskStore;

    fn payload() -> FeaturePayload {
        FeaturePayload {
            password_length: 12,
            used_special_characters: true,
            keyboard_language: "EN".to_string(),
            login_attempts: 1,
            was_capslock_on: false,
            browser_tab_count: 3,
            challenge_sequence: "3-3".to_string(),
            timezone: "UTC".to_string(),
            typing_speed_wpm: 70.0,
        }
    }

    fn record(store: &dyn RiskStore, user: &str, at_ms: i64, level: RiskLevel, score: f64) {
        store
            .record_event(NewLoginEvent {
                username: user.to_string(),
                created_at_ms: at_ms,
                payload: payload(),
                assessment: RiskAssessment {
                    risk_score: score,
                    risk_level: level,
                    reasons: Vec::new(),
                },
                outcome: Outcome::Allowed,
            })
            .unwrap();
    }

    fn service_with_store() -> (MonitoringService, Arc<SqliteRiskStore>) {
        let store = Arc::new(SqliteRiskStore::in_memory().unwrap());
        (MonitoringService::new(store.clone()), store)
    }

    #[test]
    fn test_global_stats_counts_per_level() {
        let (service, store) = service_with_store();
        let now = Utc::now().timestamp_millis();
        record(store.as_ref(), "alice", now, RiskLevel::Low, 0.1);
        record(store.as_ref(), "bob", now, RiskLevel::Medium, 0.5);
        record(store.as_ref(), "carol", now, RiskLevel::High, 0.9);
        record(store.as_ref(), "dave", now, RiskLevel::High, 0.95);

        let stats = service.global_stats(60).unwrap();
        assert_eq!(stats.total_events, 4);
        assert_eq!(stats.high, 2);
        assert_eq!(stats.medium, 1);
        assert_eq!(stats.low, 1);
        assert_eq!(stats.window_minutes, 60);
    }

    #[test]
    fn test_global_stats_window_excludes_old_events() {
        let (service, store) = service_with_store();
        let now = Utc::now().timestamp_millis();
        record(store.as_ref(), "alice", now - 10 * 60_000, RiskLevel::Low, 0.1);
        record(store.as_ref(), "alice", now, RiskLevel::Low, 0.1);

        let stats = service.global_stats_since(now - 5 * 60_000, 5).unwrap();
        assert_eq!(stats.total_events, 1);
    }

    #[test]
    fn test_unknown_user_monitoring_is_empty_not_error() {
        let (service, _store) = service_with_store();
        let view = service.user_monitoring("ghost").unwrap();
        assert!(!view.exists);
        assert_eq!(view.total_logins, 0);
        assert!(view.events.is_empty());
        assert!(view.risk_trend.is_empty());
    }

    #[test]
    fn test_user_monitoring_aggregates() {
        let (service, store) = service_with_store();
        store
            .upsert_user(
                &UserRecord {
                    username: "alice".to_string(),
                    full_name: Some("Alice Johnson".to_string()),
                    email: None,
                    department: Some("Dev".to_string()),
                    role: Some("Engineer".to_string()),
                },
                "hash",
            )
            .unwrap();
        record(store.as_ref(), "alice", 1000, RiskLevel::Low, 0.2);
        record(store.as_ref(), "alice", 2000, RiskLevel::High, 0.8);

        let view = service.user_monitoring("alice").unwrap();
        assert!(view.exists);
        assert_eq!(view.total_logins, 2);
        assert!((view.avg_risk_score - 0.5).abs() < 1e-9);
        assert_eq!(view.high_risk_count, 1);
        assert_eq!(view.low_risk_count, 1);
        assert_eq!(view.events.len(), 2);
        // Trend is oldest-first, events newest-first
        assert_eq!(view.risk_trend[0].timestamp_ms, 1000);
        assert_eq!(view.events[0].created_at_ms, 2000);
    }

    #[test]
    fn test_list_users_joins_profiles() {
        let (service, store) = service_with_store();
        for name in ["alice", "bob"] {
            store
                .upsert_user(
                    &UserRecord {
                        username: name.to_string(),
                        full_name: None,
                        email: None,
                        department: None,
                        role: None,
                    },
                    "hash",
                )
                .unwrap();
        }
        record(store.as_ref(), "alice", 1000, RiskLevel::Medium, 0.5);

        let users = service.list_users().unwrap();
        assert_eq!(users.len(), 2);
        let alice = users.iter().find(|u| u.username == "alice").unwrap();
        assert_eq!(alice.last_risk_level, Some(RiskLevel::Medium));
        let bob = users.iter().find(|u| u.username == "bob").unwrap();
        assert!(bob.last_risk_level.is_none());
    }
}
