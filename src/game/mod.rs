// Game engine: lobby, turns, movement, special cards and challenges

pub use cards::{CardOutcome, SpecialCard};
pub use challenge::{ChallengeCategory, ChallengePicker, Difficulty, RandomChallengePicker};
pub use cleanup_task::{start_cleanup_task, CleanupConfig};
pub use dice::{Dice, RandomDice, ScriptedDice};
pub use error::GameError;
pub use models::{GameSession, Player, SessionState, SessionStatus, TurnPhase};
pub use repository::{InMemorySessionRepository, PostgresSessionRepository, SessionRepository};
pub use service::GameService;

pub mod cards;
pub mod challenge;
pub mod cleanup_task;
pub mod dice;
pub mod error;
pub mod handlers;
pub mod lobby;
pub mod models;
pub mod movement;
pub mod repository;
pub mod service;
pub mod turn;
pub mod types;

#[cfg(test)]
pub mod testing;
