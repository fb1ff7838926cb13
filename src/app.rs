use axum::{
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::board::handlers as board;
use crate::event::handlers as events;
use crate::event::{EventFeed, InMemoryEventFeed, PostgresEventFeed};
use crate::game::handlers as game;
use crate::game::{InMemorySessionRepository, PostgresSessionRepository, SessionRepository};
use crate::shared::{AppError, AppState};

/// Where session snapshots and the event log are kept. Both always share one backend.
pub struct Storage {
    pub sessions: Arc<dyn SessionRepository + Send + Sync>,
    pub events: Arc<dyn EventFeed + Send + Sync>,
    persistent: bool,
}

impl Storage {
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(InMemorySessionRepository::new()),
            events: Arc::new(InMemoryEventFeed::new()),
            persistent: false,
        }
    }

    /// Connects to PostgreSQL and creates the tables on first start
    pub async fn postgres(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPool::connect(database_url).await.map_err(|e| {
            warn!(error = %e, "Failed to connect to the database");
            AppError::DatabaseError(e.to_string())
        })?;

        let sessions = PostgresSessionRepository::new(pool.clone());
        sessions.ensure_schema().await?;
        let events = PostgresEventFeed::new(pool);
        events.ensure_schema().await?;

        Ok(Self {
            sessions: Arc::new(sessions),
            events: Arc::new(events),
            persistent: true,
        })
    }

    /// PostgreSQL when a database URL is configured, memory otherwise
    pub async fn connect(database_url: Option<&str>) -> Result<Self, AppError> {
        match database_url {
            Some(url) => {
                let storage = Self::postgres(url).await?;
                info!("Using PostgreSQL storage for sessions and events");
                Ok(storage)
            }
            None => {
                info!("Using in-memory storage for sessions and events");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn is_persistent(&self) -> bool {
        self.persistent
    }
}

/// Builds the HTTP router with every game route under `/api`
pub fn build_router(app_state: AppState, cors_allowed_origins: Option<&[String]>) -> Router {
    let api = Router::new()
        .route("/board", get(board::get_board))
        .route("/sessions", post(game::create_session))
        .route("/sessions/code/:code", get(game::find_session_by_code))
        .route("/sessions/:session_id", get(game::get_session))
        .route("/sessions/:session_id/players", post(game::register_player))
        .route(
            "/sessions/:session_id/players/:player_id",
            axum::routing::delete(game::remove_player),
        )
        .route(
            "/sessions/:session_id/players/:player_id/ready",
            post(game::set_ready),
        )
        .route("/sessions/:session_id/lobby/roll", post(game::roll_lobby_d20))
        .route("/sessions/:session_id/turn/roll", post(game::roll_d6))
        .route("/sessions/:session_id/turn/path", post(game::choose_path))
        .route(
            "/sessions/:session_id/turn/special",
            post(game::apply_special_card),
        )
        .route(
            "/sessions/:session_id/turn/confirm",
            post(game::confirm_turn_handover),
        )
        .route("/sessions/:session_id/challenge", post(game::start_challenge))
        .route("/sessions/:session_id/score", post(game::submit_score))
        .route("/sessions/:session_id/leaderboard", get(game::leaderboard))
        .route("/sessions/:session_id/events", get(events::list_events))
        .route(
            "/sessions/:session_id/events/ws",
            get(events::events_websocket),
        );

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", api)
        .layer(cors_layer(cors_allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn cors_layer(allowed_origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = allowed_origins else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
