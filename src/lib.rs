// Library crate for the CodeConquer game server
// This file exposes the public API for integration tests

pub mod app;
pub mod board;
pub mod config;
pub mod event;
pub mod game;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use app::{build_router, Storage};
pub use board::{BoardGraph, BoardNodeType};
pub use config::{GameRules, ServerConfig, SpecialLanding, TurnHandover};
pub use event::{EventBus, EventFeed, EventKind, GameEvent, InMemoryEventFeed, PostgresEventFeed};
pub use game::{GameError, GameService};
pub use shared::{AppError, AppState};
