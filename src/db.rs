//! Database module for the interview service
//!
//! Persists one row per session. The whole `SessionState` is stored as JSON;
//! `role` and `difficulty` are duplicated into columns for inspection.

mod schema;

pub use schema::*;

use crate::interview::SessionState;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid stored state: {0}")]
    State(#[from] serde_json::Error),
    #[error("Session not found: {0}")]
    SessionNotFound(String),
    #[error("Session {id} is no longer at version {expected}")]
    VersionConflict { id: String, expected: i64 },
    #[error("Database lock poisoned")]
    Poisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::Poisoned)
    }

    fn run_migrations(&self) -> DbResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    // ==================== Session Operations ====================

    /// Create a new session at version 1
    pub fn create_session(&self, id: &str, state: &SessionState) -> DbResult<SessionRecord> {
        let conn = self.conn()?;
        let now = Utc::now();
        let state_json = serde_json::to_string(state)?;

        conn.execute(
            "INSERT INTO sessions (id, role, difficulty, state, version, is_active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, 1, ?5, ?5)",
            params![
                id,
                state.role.label(),
                state.difficulty.label(),
                state_json,
                now.to_rfc3339()
            ],
        )?;

        Ok(SessionRecord {
            id: id.to_string(),
            state: state.clone(),
            version: 1,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get session by ID
    pub fn get_session(&self, id: &str) -> DbResult<SessionRecord> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, state, version, is_active, created_at, updated_at
                 FROM sessions WHERE id = ?1",
                params![id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, bool>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, state_json, version, is_active, created_at, updated_at)) = row else {
            return Err(DbError::SessionNotFound(id.to_string()));
        };
        Ok(SessionRecord {
            id,
            state: serde_json::from_str(&state_json)?,
            version,
            is_active,
            created_at: parse_datetime(&created_at),
            updated_at: parse_datetime(&updated_at),
        })
    }

    /// Replace session state if the row is still at `expected_version`
    ///
    /// Returns the new version.
    pub fn update_session_state(
        &self,
        id: &str,
        state: &SessionState,
        expected_version: i64,
    ) -> DbResult<i64> {
        let conn = self.conn()?;
        let now = Utc::now();
        let state_json = serde_json::to_string(state)?;

        let updated = conn.execute(
            "UPDATE sessions SET state = ?1, version = version + 1, updated_at = ?2
             WHERE id = ?3 AND version = ?4",
            params![state_json, now.to_rfc3339(), id, expected_version],
        )?;

        if updated == 0 {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sessions WHERE id = ?1)",
                params![id],
                |row| row.get(0),
            )?;
            return Err(if exists {
                DbError::VersionConflict {
                    id: id.to_string(),
                    expected: expected_version,
                }
            } else {
                DbError::SessionNotFound(id.to_string())
            });
        }
        Ok(expected_version + 1)
    }

    /// Mark a session inactive (idempotent)
    pub fn deactivate_session(&self, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let now = Utc::now();

        let updated = conn.execute(
            "UPDATE sessions SET is_active = 0, updated_at = ?1 WHERE id = ?2",
            params![now.to_rfc3339(), id],
        )?;

        if updated == 0 {
            return Err(DbError::SessionNotFound(id.to_string()));
        }
        Ok(())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
