use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Kinds of facts recorded in a session's event feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    PlayerJoined,
    PlayerLeft,
    LobbyRoll,
    GameStarted,
    TurnNext,
    TurnSkipped,
    DiceRolled,
    PathChosen,
    LandedJail,
    ChallengeStarted,
    ScoreSubmitted,
    Special,
    SpecialIgnored,
    GameFinished,
}

/// Something that already happened in a session.
///
/// `seq` is assigned by the session itself and increases by one per event,
/// so clients can poll with "everything after the last seq I saw".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameEvent {
    pub session_id: String,
    pub seq: u64,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl GameEvent {
    pub fn new(session_id: impl Into<String>, seq: u64, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            seq,
            kind,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}
