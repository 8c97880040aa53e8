//! The login risk engine: capture output in, decision and audit trail out.
//!
//! One submitted attempt flows through validate → score → decide →
//! record → deliver. Scoring runs before credential verification so
//! failed logins still leave behavioral audit events; a high-risk verdict
//! takes precedence over a bad password in the returned error. Every
//! scored attempt writes exactly one LoginEvent, allowed or denied.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::auth::{self, SessionManager};
use crate::config::Config;
use crate::delivery::{EventBroadcaster, EventFeed, FeedPage};
use crate::models::{
    FeaturePayload, LoginEvent, NewLoginEvent, Outcome, RiskAssessment, UserRecord,
};
use crate::monitoring::{GlobalStats, MonitoringService, UserMonitoring, UserSummary};
use crate::persistence::{PersistenceError, RiskStore, SqliteRiskStore};
use crate::policy::AccessPolicy;
use crate::scoring::{RiskScorer, ScoreContext};

/// A login attempt as submitted by the client
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub payload: FeaturePayload,
}

/// Result of an allowed attempt
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub event_id: i64,
    pub risk_score: f64,
    pub risk_level: crate::models::RiskLevel,
    pub reasons: Vec<String>,
    pub outcome: Outcome,
    /// Bearer credential, present only when the attempt was allowed
    pub session_token: Option<String>,
}

/// Errors surfaced by the engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Rejected before scoring; no event is written
    #[error("Malformed login payload: {0}")]
    InvalidPayload(String),

    /// Credentials failed; the attempt was still scored and recorded
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// The risk decision blocked the attempt; recorded with outcome=denied
    #[error("Login blocked: high risk detected")]
    HighRisk { assessment: RiskAssessment },

    #[error("Session invalid or expired")]
    Unauthorized,

    #[error(transparent)]
    Store(#[from] PersistenceError),
}

// Dash-joined tokens in [1-9], at most ten, or empty
static CHALLENGE_GRAMMAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([1-9](-[1-9]){0,9})?$").expect("valid literal"));

/// Behavioral login risk engine.
///
/// Owns the scoring pipeline, the access policy, the session table, and
/// the delivery fan-out; all reads and writes go through the shared
/// event store.
pub struct LoginRiskEngine {
    store: Arc<dyn RiskStore>,
    scorer: RiskScorer,
    policy: AccessPolicy,
    sessions: SessionManager,
    broadcaster: EventBroadcaster,
    feed: EventFeed,
    monitoring: MonitoringService,
}

impl LoginRiskEngine {
    /// Build an engine over an existing store
    pub fn new(config: &Config, store: Arc<dyn RiskStore>) -> Self {
        LoginRiskEngine {
            scorer: RiskScorer::new(config.scoring.clone()),
            policy: AccessPolicy,
            sessions: SessionManager::new(config.session.ttl_seconds),
            broadcaster: EventBroadcaster::new(config.delivery.broadcast_capacity),
            feed: EventFeed::new(store.clone(), &config.delivery),
            monitoring: MonitoringService::new(store.clone()),
            store,
        }
    }

    /// Build an engine with the SQLite store named in the config
    pub fn from_config(config: &Config) -> Result<Self, PersistenceError> {
        let store = Arc::new(SqliteRiskStore::new(&config.store.db_path)?);
        Ok(Self::new(config, store))
    }

    // =====================
    // Write path
    // =====================

    /// Score, decide, and record one login attempt.
    ///
    /// Returns the allowed response with a session token, or an error for
    /// malformed payloads, high-risk denials, and bad credentials. The
    /// latter two still write an audit event before returning.
    pub fn submit_attempt(&self, request: &LoginRequest) -> Result<LoginResponse, EngineError> {
        validate_request(request)?;

        let context = self.score_context(&request.username)?;
        let assessment = self.scorer.assess(&request.payload, &context);
        let risk_outcome = self.policy.decide(assessment.risk_level);

        let credentials_ok = match self.store.get_password_hash(&request.username)? {
            Some(hash) => auth::verify_password(&request.password, &hash),
            None => false,
        };

        let outcome = if risk_outcome == Outcome::Denied || !credentials_ok {
            Outcome::Denied
        } else {
            Outcome::Allowed
        };

        let event = self.store.record_event(NewLoginEvent {
            username: request.username.clone(),
            created_at_ms: Utc::now().timestamp_millis(),
            payload: request.payload.clone(),
            assessment: assessment.clone(),
            outcome,
        })?;
        self.broadcaster.publish(&event);

        if risk_outcome == Outcome::Denied {
            log::info!(
                "Blocked high-risk login for '{}' (score {:.2})",
                request.username,
                assessment.risk_score
            );
            return Err(EngineError::HighRisk { assessment });
        }
        if !credentials_ok {
            return Err(EngineError::InvalidCredentials);
        }

        let token = self.sessions.issue(&request.username);
        Ok(LoginResponse {
            event_id: event.id,
            risk_score: assessment.risk_score,
            risk_level: assessment.risk_level,
            reasons: assessment.reasons,
            outcome,
            session_token: Some(token),
        })
    }

    /// Score a payload without recording anything (anonymous preview)
    pub fn score_session(&self, payload: &FeaturePayload) -> Result<RiskAssessment, EngineError> {
        validate_payload(payload)?;
        Ok(self.scorer.assess(payload, &ScoreContext::default()))
    }

    /// Register or update a directory user
    pub fn register_user(
        &self,
        record: &UserRecord,
        password: &str,
    ) -> Result<(), EngineError> {
        self.store
            .upsert_user(record, &auth::hash_password(password))?;
        Ok(())
    }

    // =====================
    // Sessions
    // =====================

    /// Resolve a bearer credential to its directory record
    pub fn current_session(&self, token: &str) -> Result<UserRecord, EngineError> {
        let username = self
            .sessions
            .authenticate(token)
            .ok_or(EngineError::Unauthorized)?;
        self.store
            .get_user(&username)?
            .ok_or(EngineError::Unauthorized)
    }

    pub fn logout(&self, token: &str) {
        self.sessions.revoke(token);
    }

    // =====================
    // Read paths
    // =====================

    pub fn recent_events(&self, limit: usize) -> Result<Vec<LoginEvent>, EngineError> {
        Ok(self.store.recent_events(limit)?)
    }

    /// Cursor poll over the event ledger (§ real-time delivery)
    pub fn poll_events(
        &self,
        since: Option<i64>,
        limit: Option<usize>,
    ) -> Result<FeedPage, EngineError> {
        Ok(self.feed.poll(since, limit)?)
    }

    /// Push subscription; lossy superset of the poll feed
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<LoginEvent> {
        self.broadcaster.subscribe()
    }

    pub fn global_stats(&self, window_minutes: u32) -> Result<GlobalStats, EngineError> {
        Ok(self.monitoring.global_stats(window_minutes)?)
    }

    pub fn user_monitoring(&self, username: &str) -> Result<UserMonitoring, EngineError> {
        Ok(self.monitoring.user_monitoring(username)?)
    }

    pub fn list_users(&self) -> Result<Vec<UserSummary>, EngineError> {
        Ok(self.monitoring.list_users()?)
    }

    fn score_context(&self, username: &str) -> Result<ScoreContext, EngineError> {
        let profile = self.store.get_profile(username)?;
        Ok(ScoreContext {
            last_timezone: profile.and_then(|p| p.last_timezone),
        })
    }
}

fn validate_request(request: &LoginRequest) -> Result<(), EngineError> {
    if request.username.trim().is_empty() {
        return Err(EngineError::InvalidPayload("username is empty".to_string()));
    }
    validate_payload(&request.payload)
}

/// Reject structurally broken payloads before scoring
fn validate_payload(payload: &FeaturePayload) -> Result<(), EngineError> {
    if payload.browser_tab_count < 1 {
        return Err(EngineError::InvalidPayload(
            "browser_tab_count must be at least 1".to_string(),
        ));
    }
    if payload.login_attempts < 1 {
        return Err(EngineError::InvalidPayload(
            "login_attempts must be at least 1".to_string(),
        ));
    }
    if payload.keyboard_language.is_empty() {
        return Err(EngineError::InvalidPayload(
            "keyboard_language is empty".to_string(),
        ));
    }
    if payload.timezone.is_empty() {
        return Err(EngineError::InvalidPayload("timezone is empty".to_string()));
    }
    if !CHALLENGE_GRAMMAR.is_match(&payload.challenge_sequence) {
        return Err(EngineError::InvalidPayload(format!(
            "malformed challenge_sequence: {:?}",
            payload.challenge_sequence
        )));
    }
    Ok(())
}
