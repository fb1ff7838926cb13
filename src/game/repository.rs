use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument, warn};

use super::models::SessionState;
use crate::shared::AppError;

/// Snapshot storage for session aggregates
#[async_trait]
pub trait SessionRepository {
    /// Inserts or replaces the snapshot of a session
    async fn save(&self, state: &SessionState) -> Result<(), AppError>;
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, AppError>;
    async fn find_id_by_code(&self, code: &str) -> Result<Option<String>, AppError>;
    async fn code_exists(&self, code: &str) -> Result<bool, AppError>;
}

/// In-memory implementation of SessionRepository for development and testing
///
/// Snapshots live as long as the process does.
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl Default for InMemorySessionRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock().map(|sessions| sessions.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, SessionState>>, AppError> {
        self.sessions.lock().map_err(|_| {
            warn!("Session store lock poisoned");
            AppError::Internal
        })
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    #[instrument(skip(self, state), fields(session_id = %state.session.id))]
    async fn save(&self, state: &SessionState) -> Result<(), AppError> {
        debug!(seq = state.session.last_event_seq, "Saving session snapshot in memory");
        let mut sessions = self.lock()?;
        sessions.insert(state.session.id.clone(), state.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, AppError> {
        let sessions = self.lock()?;
        let state = sessions.get(session_id).cloned();
        debug!(found = state.is_some(), "Loaded session snapshot from memory");
        Ok(state)
    }

    #[instrument(skip(self))]
    async fn find_id_by_code(&self, code: &str) -> Result<Option<String>, AppError> {
        let sessions = self.lock()?;
        Ok(sessions
            .values()
            .find(|s| s.session.code.eq_ignore_ascii_case(code))
            .map(|s| s.session.id.clone()))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.find_id_by_code(code).await?.is_some())
    }
}

/// PostgreSQL implementation storing each session as a JSON snapshot row
pub struct PostgresSessionRepository {
    pool: PgPool,
}

impl PostgresSessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the snapshot table when it does not exist yet
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS game_sessions (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL UNIQUE,
                snapshot TEXT NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create game_sessions table");
            AppError::DatabaseError(e.to_string())
        })?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    #[instrument(skip(self, state), fields(session_id = %state.session.id))]
    async fn save(&self, state: &SessionState) -> Result<(), AppError> {
        let snapshot = serde_json::to_string(state).map_err(|e| {
            warn!(error = %e, "Failed to serialize session snapshot");
            AppError::Internal
        })?;

        sqlx::query(
            "INSERT INTO game_sessions (id, code, snapshot, updated_at) VALUES ($1, $2, $3, $4)
             ON CONFLICT (id) DO UPDATE SET snapshot = EXCLUDED.snapshot, updated_at = EXCLUDED.updated_at",
        )
        .bind(&state.session.id)
        .bind(&state.session.code)
        .bind(snapshot)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to save session snapshot");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!("Session snapshot saved to database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load(&self, session_id: &str) -> Result<Option<SessionState>, AppError> {
        let row = sqlx::query("SELECT snapshot FROM game_sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to load session snapshot");
                AppError::DatabaseError(e.to_string())
            })?;

        match row {
            Some(row) => {
                let snapshot: String = row.get("snapshot");
                let state = serde_json::from_str(&snapshot).map_err(|e| {
                    warn!(error = %e, "Stored session snapshot is corrupt");
                    AppError::DatabaseError(format!("Corrupt snapshot for {}", session_id))
                })?;
                Ok(Some(state))
            }
            None => Ok(None),
        }
    }

    #[instrument(skip(self))]
    async fn find_id_by_code(&self, code: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT id FROM game_sessions WHERE lower(code) = lower($1)")
            .bind(code)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                warn!(error = %e, "Failed to look up session code");
                AppError::DatabaseError(e.to_string())
            })?;
        Ok(row.map(|row| row.get("id")))
    }

    async fn code_exists(&self, code: &str) -> Result<bool, AppError> {
        Ok(self.find_id_by_code(code).await?.is_some())
    }
}
