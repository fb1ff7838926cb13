use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use super::events::{EventKind, GameEvent};
use crate::shared::AppError;

/// Most events a single feed request returns
pub const MAX_RETURNED_EVENTS: usize = 15;
pub const DEFAULT_LATEST_EVENTS: usize = 10;
/// Events kept per session by the in-memory feed; older ones are dropped first
pub const MAX_RETAINED_EVENTS: usize = 500;

fn latest_limit(limit: Option<usize>) -> usize {
    limit
        .unwrap_or(DEFAULT_LATEST_EVENTS)
        .clamp(1, MAX_RETURNED_EVENTS)
}

/// Durable, pollable log of a session's events
#[async_trait]
pub trait EventFeed {
    async fn append(&self, event: GameEvent) -> Result<(), AppError>;

    /// Events with `seq > after_seq`, oldest first, at most `MAX_RETURNED_EVENTS`
    async fn events_after(&self, session_id: &str, after_seq: u64)
        -> Result<Vec<GameEvent>, AppError>;

    /// The newest `limit` events (clamped to 1..=15, default 10), oldest first
    async fn latest(&self, session_id: &str, limit: Option<usize>)
        -> Result<Vec<GameEvent>, AppError>;
}

#[derive(Default)]
pub struct InMemoryEventFeed {
    events: RwLock<HashMap<String, Vec<GameEvent>>>,
}

impl InMemoryEventFeed {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventFeed for InMemoryEventFeed {
    #[instrument(skip(self, event), fields(session_id = %event.session_id, seq = event.seq))]
    async fn append(&self, event: GameEvent) -> Result<(), AppError> {
        let mut events = self.events.write().await;
        let log = events.entry(event.session_id.clone()).or_default();
        log.push(event);
        if log.len() > MAX_RETAINED_EVENTS {
            let excess = log.len() - MAX_RETAINED_EVENTS;
            log.drain(..excess);
        }
        debug!("Event appended to feed");
        Ok(())
    }

    async fn events_after(
        &self,
        session_id: &str,
        after_seq: u64,
    ) -> Result<Vec<GameEvent>, AppError> {
        let events = self.events.read().await;
        Ok(events
            .get(session_id)
            .map(|log| {
                log.iter()
                    .filter(|e| e.seq > after_seq)
                    .take(MAX_RETURNED_EVENTS)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn latest(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<GameEvent>, AppError> {
        let limit = latest_limit(limit);
        let events = self.events.read().await;
        Ok(events
            .get(session_id)
            .map(|log| log[log.len().saturating_sub(limit)..].to_vec())
            .unwrap_or_default())
    }
}

/// PostgreSQL event log, one row per event keyed by session and seq
pub struct PostgresEventFeed {
    pool: PgPool,
}

impl PostgresEventFeed {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the event table when it does not exist yet
    #[instrument(skip(self))]
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS game_events (
                session_id TEXT NOT NULL,
                seq BIGINT NOT NULL,
                event_type TEXT NOT NULL,
                message TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (session_id, seq)
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create game_events table");
            AppError::DatabaseError(e.to_string())
        })?;
        Ok(())
    }
}

fn event_from_row(row: &PgRow) -> Result<GameEvent, AppError> {
    let event_type: String = row.get("event_type");
    let kind = event_type.parse::<EventKind>().map_err(|_| {
        warn!(event_type = %event_type, "Stored event has an unknown type");
        AppError::DatabaseError(format!("Unknown event type {}", event_type))
    })?;
    let seq: i64 = row.get("seq");

    Ok(GameEvent {
        session_id: row.get("session_id"),
        seq: seq as u64,
        kind,
        message: row.get("message"),
        created_at: row.get("created_at"),
    })
}

#[async_trait]
impl EventFeed for PostgresEventFeed {
    #[instrument(skip(self, event), fields(session_id = %event.session_id, seq = event.seq))]
    async fn append(&self, event: GameEvent) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO game_events (session_id, seq, event_type, message, created_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (session_id, seq) DO NOTHING",
        )
        .bind(&event.session_id)
        .bind(event.seq as i64)
        .bind(event.kind.to_string())
        .bind(&event.message)
        .bind(event.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to store event");
            AppError::DatabaseError(e.to_string())
        })?;

        debug!("Event appended to database feed");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn events_after(
        &self,
        session_id: &str,
        after_seq: u64,
    ) -> Result<Vec<GameEvent>, AppError> {
        let rows = sqlx::query(
            "SELECT session_id, seq, event_type, message, created_at FROM game_events
             WHERE session_id = $1 AND seq > $2 ORDER BY seq ASC LIMIT $3",
        )
        .bind(session_id)
        .bind(after_seq as i64)
        .bind(MAX_RETURNED_EVENTS as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to read events");
            AppError::DatabaseError(e.to_string())
        })?;

        rows.iter().map(event_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn latest(
        &self,
        session_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<GameEvent>, AppError> {
        let rows = sqlx::query(
            "SELECT session_id, seq, event_type, message, created_at FROM game_events
             WHERE session_id = $1 ORDER BY seq DESC LIMIT $2",
        )
        .bind(session_id)
        .bind(latest_limit(limit) as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to read latest events");
            AppError::DatabaseError(e.to_string())
        })?;

        // Newest first from the query, callers want oldest first
        let mut events = rows
            .iter()
            .map(event_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        events.reverse();
        Ok(events)
    }
}
