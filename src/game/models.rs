use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use strum_macros::{Display, EnumString};
use tracing::debug;

use super::challenge::{ChallengeCategory, Difficulty};
use super::error::GameError;
use crate::event::{EventKind, GameEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    Lobby,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnPhase {
    Idle,
    #[serde(rename = "AWAITING_D6_ROLL")]
    #[strum(serialize = "AWAITING_D6_ROLL")]
    AwaitingD6Roll,
    AwaitingPathChoice,
    InChallenge,
    AwaitingSpecialCard,
    AwaitingConfirm,
}

/// One-shot effects granted by special cards, each consumed the first time it applies
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Modifier {
    IgnoreNextPositiveSpecial,
    NextDiceAdvantage,
    NextHardBecomesMedium,
    NextHardBecomesEasy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingFork {
    pub node_id: String,
    pub remaining_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveChallenge {
    pub id: String,
    pub difficulty: Difficulty,
    pub category: ChallengeCategory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    pub id: String,
    pub code: String,
    pub status: SessionStatus,
    pub turn_order_locked: bool,
    /// 0 before the game starts, otherwise the turn order of the player to act
    pub current_turn_order: u32,
    pub turn_status: TurnPhase,
    pub active_challenge: Option<ActiveChallenge>,
    pub last_dice_roll: Option<u8>,
    pub pending_fork: Option<PendingFork>,
    pub winner_player_id: Option<String>,
    pub last_event_seq: u64,
    pub last_event_type: Option<EventKind>,
    pub last_event_message: Option<String>,
    pub next_join_seq: u64,
    pub created_at: DateTime<Utc>,
}

impl GameSession {
    pub fn new(id: String, code: String) -> Self {
        Self {
            id,
            code,
            status: SessionStatus::Lobby,
            turn_order_locked: false,
            current_turn_order: 0,
            turn_status: TurnPhase::Idle,
            active_challenge: None,
            last_dice_roll: None,
            pending_fork: None,
            winner_player_id: None,
            last_event_seq: 0,
            last_event_type: None,
            last_event_message: None,
            next_join_seq: 1,
            created_at: Utc::now(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.status != SessionStatus::Lobby
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub session_id: String,
    pub name: String,
    pub icon: String,
    pub ready: bool,
    pub turn_order: u32,
    pub position_node_id: String,
    pub skip_turns: u32,
    pub jail_return_node_id: Option<String>,
    pub lobby_roll: Option<u8>,
    pub total_score: i64,
    pub modifiers: BTreeSet<Modifier>,
    pub last_challenge_category: Option<ChallengeCategory>,
    pub join_seq: u64,
    pub joined_at: DateTime<Utc>,
}

impl Player {
    pub fn new(
        session_id: &str,
        name: String,
        icon: String,
        start_node_id: &str,
        turn_order: u32,
        join_seq: u64,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            name,
            icon,
            ready: false,
            turn_order,
            position_node_id: start_node_id.to_string(),
            skip_turns: 0,
            jail_return_node_id: None,
            lobby_roll: None,
            total_score: 0,
            modifiers: BTreeSet::new(),
            last_challenge_category: None,
            join_seq,
            joined_at: Utc::now(),
        }
    }

    pub fn has(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    pub fn grant(&mut self, modifier: Modifier) {
        self.modifiers.insert(modifier);
    }

    /// Consumes the modifier, returning whether it was pending
    pub fn take(&mut self, modifier: Modifier) -> bool {
        self.modifiers.remove(&modifier)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub player_id: String,
    pub player_name: String,
    pub challenge_id: String,
    pub category: ChallengeCategory,
    pub difficulty: Difficulty,
    pub points: i64,
    pub created_at: DateTime<Utc>,
}

/// Everything owned by one session. This is the unit that is locked, mutated and snapshotted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session: GameSession,
    pub players: Vec<Player>,
    #[serde(default)]
    pub scores: Vec<ScoreRecord>,
    /// Events produced by the operation in flight; drained by the service after commit
    #[serde(skip)]
    pub outbox: Vec<GameEvent>,
}

impl SessionState {
    pub fn new(session: GameSession) -> Self {
        Self {
            session,
            players: Vec::new(),
            scores: Vec::new(),
            outbox: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }

    pub fn player_index(&self, player_id: &str) -> Result<usize, GameError> {
        self.players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or_else(|| GameError::player_not_found(player_id))
    }

    pub fn player(&self, player_id: &str) -> Result<&Player, GameError> {
        let idx = self.player_index(player_id)?;
        Ok(&self.players[idx])
    }

    pub fn current_player_index(&self) -> Option<usize> {
        let current = self.session.current_turn_order;
        if current == 0 {
            return None;
        }
        self.players.iter().position(|p| p.turn_order == current)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.current_player_index().map(|idx| &self.players[idx])
    }

    /// Records an event: bumps the session's sequence and queues it for delivery
    pub fn publish(&mut self, kind: EventKind, message: impl Into<String>) {
        let message = message.into();
        self.session.last_event_seq += 1;
        let seq = self.session.last_event_seq;
        debug!(session_id = %self.session.id, seq, kind = %kind, message = %message, "Event published");

        self.session.last_event_type = Some(kind);
        self.session.last_event_message = Some(message.clone());
        self.outbox
            .push(GameEvent::new(self.session.id.clone(), seq, kind, message));
    }

    pub fn take_outbox(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.outbox)
    }
}
