//! Persistence module for the login event ledger.
//!
//! The event store is the source of truth for audit and monitoring: an
//! append-only record of every scored attempt plus the derived per-user
//! risk profile and the user directory projection.

pub mod sqlite_store;

pub use sqlite_store::SqliteRiskStore;

use crate::models::{LoginEvent, NewLoginEvent, UserRecord, UserRiskProfile};
use thiserror::Error;

/// Errors that can occur during persistence operations
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("Invalid data in database: {0}")]
    InvalidData(String),
}

/// Trait for login risk storage backends.
///
/// Implementations must support concurrent appends without lost writes;
/// id allocation has to be race-free and monotonically increasing since
/// the id doubles as the delivery cursor. Events are immutable once
/// written — only the derived profile changes on subsequent writes.
pub trait RiskStore: Send + Sync {
    // =====================
    // Event ledger
    // =====================

    /// Append a scored attempt and refresh the user's derived profile in
    /// the same transaction. Returns the stored event with its assigned id.
    /// Every call creates a new row; there is no write-time deduplication.
    fn record_event(&self, event: NewLoginEvent) -> Result<LoginEvent, PersistenceError>;

    /// Events with `id > since_id` (all events when `None`), ascending by
    /// id, capped at `limit`. This is the cursor read used by delivery.
    fn events_after(
        &self,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<LoginEvent>, PersistenceError>;

    /// Most recent events across all users, newest first
    fn recent_events(&self, limit: usize) -> Result<Vec<LoginEvent>, PersistenceError>;

    /// Most recent events for one user, newest first
    fn events_for_user(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<LoginEvent>, PersistenceError>;

    /// Total number of recorded attempts for one user
    fn count_events_for_user(&self, username: &str) -> Result<u64, PersistenceError>;

    /// Events with `created_at_ms >= since_ms`, newest first
    fn events_since(&self, since_ms: i64) -> Result<Vec<LoginEvent>, PersistenceError>;

    // =====================
    // Derived risk profiles
    // =====================

    fn get_profile(&self, username: &str) -> Result<Option<UserRiskProfile>, PersistenceError>;

    fn list_profiles(&self) -> Result<Vec<UserRiskProfile>, PersistenceError>;

    // =====================
    // User directory
    // =====================

    fn upsert_user(
        &self,
        record: &UserRecord,
        password_hash: &str,
    ) -> Result<(), PersistenceError>;

    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError>;

    fn get_password_hash(&self, username: &str) -> Result<Option<String>, PersistenceError>;

    fn list_users(&self) -> Result<Vec<UserRecord>, PersistenceError>;

    // =====================
    // Maintenance
    // =====================

    /// Clear all data (useful for testing)
    fn clear_all(&self) -> Result<(), PersistenceError>;
}
