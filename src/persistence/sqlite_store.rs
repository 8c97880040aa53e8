//! SQLite implementation of the RiskStore trait

use super::{PersistenceError, RiskStore};
use crate::models::{
    FeaturePayload, LoginEvent, NewLoginEvent, Outcome, RiskAssessment, RiskLevel, UserRecord,
    UserRiskProfile,
};
use rusqlite::{params, Connection, Row};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed login risk storage.
///
/// All writes go through one connection guarded by a mutex, which combined
/// with AUTOINCREMENT gives race-free monotonic id allocation. The event
/// insert and the profile upsert share a transaction so the derived view
/// never observes a half-applied write.
pub struct SqliteRiskStore {
    conn: Mutex<Connection>,
}

impl SqliteRiskStore {
    /// Create a new store at the specified path, initializing the schema
    /// if the database file does not exist yet.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, PersistenceError> {
        let conn = Connection::open(db_path)?;
        let store = SqliteRiskStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing)
    pub fn in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let store = SqliteRiskStore {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("schema.sql"))?;
        Ok(())
    }

    /// Decode one `login_events` row into a LoginEvent
    fn row_to_event(row: &Row<'_>) -> rusqlite::Result<RawEventRow> {
        Ok(RawEventRow {
            id: row.get(0)?,
            username: row.get(1)?,
            created_at_ms: row.get(2)?,
            risk_score: row.get(3)?,
            risk_level: row.get(4)?,
            reasons: row.get(5)?,
            payload: row.get(6)?,
            outcome: row.get(7)?,
        })
    }

    fn collect_events(rows: Vec<RawEventRow>) -> Result<Vec<LoginEvent>, PersistenceError> {
        rows.into_iter().map(RawEventRow::decode).collect()
    }
}

/// Intermediate row shape: JSON columns are decoded after the statement
/// finishes so serde errors map cleanly onto PersistenceError.
struct RawEventRow {
    id: i64,
    username: String,
    created_at_ms: i64,
    risk_score: f64,
    risk_level: String,
    reasons: String,
    payload: String,
    outcome: String,
}

impl RawEventRow {
    fn decode(self) -> Result<LoginEvent, PersistenceError> {
        let risk_level = RiskLevel::parse(&self.risk_level).ok_or_else(|| {
            PersistenceError::InvalidData(format!("Unknown risk level: {}", self.risk_level))
        })?;
        let outcome = Outcome::parse(&self.outcome).ok_or_else(|| {
            PersistenceError::InvalidData(format!("Unknown outcome: {}", self.outcome))
        })?;
        let reasons: Vec<String> = serde_json::from_str(&self.reasons)?;
        let payload: FeaturePayload = serde_json::from_str(&self.payload)?;

        Ok(LoginEvent {
            id: self.id,
            username: self.username,
            created_at_ms: self.created_at_ms,
            payload,
            assessment: RiskAssessment {
                risk_score: self.risk_score,
                risk_level,
                reasons,
            },
            outcome,
        })
    }
}

const EVENT_COLUMNS: &str =
    "id, username, created_at_ms, risk_score, risk_level, reasons, payload, outcome";

impl RiskStore for SqliteRiskStore {
    fn record_event(&self, event: NewLoginEvent) -> Result<LoginEvent, PersistenceError> {
        let reasons_json = serde_json::to_string(&event.assessment.reasons)?;
        let payload_json = serde_json::to_string(&event.payload)?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO login_events
             (username, created_at_ms, risk_score, risk_level, reasons, payload, outcome)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                event.username,
                event.created_at_ms,
                event.assessment.risk_score,
                event.assessment.risk_level.as_str(),
                reasons_json,
                payload_json,
                event.outcome.as_str(),
            ],
        )?;
        let id = tx.last_insert_rowid();

        tx.execute(
            "INSERT INTO user_risk_profiles
             (username, last_risk_level, last_risk_score, last_timezone, last_login_at_ms)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(username) DO UPDATE SET
                 last_risk_level = excluded.last_risk_level,
                 last_risk_score = excluded.last_risk_score,
                 last_timezone = excluded.last_timezone,
                 last_login_at_ms = excluded.last_login_at_ms",
            params![
                event.username,
                event.assessment.risk_level.as_str(),
                event.assessment.risk_score,
                event.payload.timezone,
                event.created_at_ms,
            ],
        )?;

        tx.commit()?;

        Ok(LoginEvent {
            id,
            username: event.username,
            created_at_ms: event.created_at_ms,
            payload: event.payload,
            assessment: event.assessment,
            outcome: event.outcome,
        })
    }

    fn events_after(
        &self,
        since_id: Option<i64>,
        limit: usize,
    ) -> Result<Vec<LoginEvent>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM login_events WHERE id > ? ORDER BY id ASC LIMIT ?",
            EVENT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![since_id.unwrap_or(0), limit], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        Self::collect_events(rows)
    }

    fn recent_events(&self, limit: usize) -> Result<Vec<LoginEvent>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM login_events ORDER BY id DESC LIMIT ?",
            EVENT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![limit], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        Self::collect_events(rows)
    }

    fn events_for_user(
        &self,
        username: &str,
        limit: usize,
    ) -> Result<Vec<LoginEvent>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM login_events WHERE username = ? ORDER BY id DESC LIMIT ?",
            EVENT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![username, limit], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        Self::collect_events(rows)
    }

    fn count_events_for_user(&self, username: &str) -> Result<u64, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM login_events WHERE username = ?",
            params![username],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn events_since(&self, since_ms: i64) -> Result<Vec<LoginEvent>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM login_events WHERE created_at_ms >= ? ORDER BY id DESC",
            EVENT_COLUMNS
        ))?;

        let rows = stmt
            .query_map(params![since_ms], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        Self::collect_events(rows)
    }

    fn get_profile(&self, username: &str) -> Result<Option<UserRiskProfile>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT username, last_risk_level, last_risk_score, last_timezone, last_login_at_ms
             FROM user_risk_profiles WHERE username = ?",
        )?;

        let result = stmt.query_row(params![username], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
            ))
        });

        match result {
            Ok((username, level_str, score, timezone, at_ms)) => {
                let level = RiskLevel::parse(&level_str).ok_or_else(|| {
                    PersistenceError::InvalidData(format!("Unknown risk level: {}", level_str))
                })?;
                Ok(Some(UserRiskProfile {
                    username,
                    last_risk_level: level,
                    last_risk_score: score,
                    last_timezone: timezone,
                    last_login_at_ms: at_ms,
                }))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_profiles(&self) -> Result<Vec<UserRiskProfile>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT username, last_risk_level, last_risk_score, last_timezone, last_login_at_ms
             FROM user_risk_profiles ORDER BY username ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(username, level_str, score, timezone, at_ms)| {
                let level = RiskLevel::parse(&level_str).ok_or_else(|| {
                    PersistenceError::InvalidData(format!("Unknown risk level: {}", level_str))
                })?;
                Ok(UserRiskProfile {
                    username,
                    last_risk_level: level,
                    last_risk_score: score,
                    last_timezone: timezone,
                    last_login_at_ms: at_ms,
                })
            })
            .collect()
    }

    fn upsert_user(
        &self,
        record: &UserRecord,
        password_hash: &str,
    ) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT OR REPLACE INTO users
             (username, full_name, email, department, role, password_hash)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                record.username,
                record.full_name,
                record.email,
                record.department,
                record.role,
                password_hash,
            ],
        )?;
        Ok(())
    }

    fn get_user(&self, username: &str) -> Result<Option<UserRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT username, full_name, email, department, role FROM users WHERE username = ?",
        )?;

        let result = stmt.query_row(params![username], |row| {
            Ok(UserRecord {
                username: row.get(0)?,
                full_name: row.get(1)?,
                email: row.get(2)?,
                department: row.get(3)?,
                role: row.get(4)?,
            })
        });

        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn get_password_hash(&self, username: &str) -> Result<Option<String>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let result = conn.query_row(
            "SELECT password_hash FROM users WHERE username = ?",
            params![username],
            |row| row.get(0),
        );

        match result {
            Ok(hash) => Ok(Some(hash)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn list_users(&self) -> Result<Vec<UserRecord>, PersistenceError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT username, full_name, email, department, role FROM users ORDER BY username ASC",
        )?;

        let records = stmt
            .query_map([], |row| {
                Ok(UserRecord {
                    username: row.get(0)?,
                    full_name: row.get(1)?,
                    email: row.get(2)?,
                    department: row.get(3)?,
                    role: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    fn clear_all(&self) -> Result<(), PersistenceError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            "DELETE FROM login_events;
             DELETE FROM user_risk_profiles;
             DELETE FROM users;",
        )?;
        Ok(())
    }
}
