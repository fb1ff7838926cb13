use thiserror::Error;

use super::models::TurnPhase;

/// Rule violations raised by the game engine. None of them leave partial state behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Locked: {0}")]
    Phase(String),
}

impl GameError {
    pub fn validation(msg: impl Into<String>) -> Self {
        GameError::Validation(msg.into())
    }

    pub fn phase(msg: impl Into<String>) -> Self {
        GameError::Phase(msg.into())
    }

    pub fn wrong_phase(expected: &[TurnPhase], actual: TurnPhase) -> Self {
        let expected: Vec<String> = expected.iter().map(ToString::to_string).collect();
        GameError::Phase(format!(
            "expected {} but turn is {}",
            expected.join(" or "),
            actual
        ))
    }

    pub fn player_not_found(player_id: &str) -> Self {
        GameError::NotFound(format!("Player not found: {}", player_id))
    }
}
