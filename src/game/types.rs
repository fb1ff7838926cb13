use serde::{Deserialize, Serialize};

use super::cards::SpecialCard;
use super::challenge::{ChallengeCategory, ChallengeParams, Difficulty};
use super::lobby::compute_tied_player_ids;
use super::models::{Player, SessionState, SessionStatus, TurnPhase};
use crate::board::{BoardGraph, BoardNodeType, ForkOption};
use crate::event::EventKind;

/// Request payload for joining a session
#[derive(Debug, Deserialize)]
pub struct RegisterPlayerRequest {
    pub name: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReadyRequest {
    pub ready: bool,
}

/// Payload for actions that only need to know who is acting
#[derive(Debug, Deserialize)]
pub struct PlayerActionRequest {
    pub player_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ChoosePathRequest {
    pub player_id: String,
    pub to_node_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SpecialCardRequest {
    pub player_id: String,
    pub card: SpecialCard,
    #[serde(default)]
    pub target_player_id: Option<String>,
    #[serde(default)]
    pub boost_to_node_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StartChallengeRequest {
    pub player_id: String,
    #[serde(default)]
    pub category: Option<ChallengeCategory>,
}

#[derive(Debug, Deserialize)]
pub struct SubmitScoreRequest {
    pub player_id: String,
    pub challenge_id: String,
    pub points: i64,
}

/// Query string for the event feed
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub after_seq: Option<u64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub ready: bool,
    pub turn_order: u32,
    pub lobby_roll: Option<u8>,
    pub tied: bool,
    pub position_node_id: String,
    pub position_type: Option<BoardNodeType>,
    pub skip_turns: u32,
    pub total_score: i64,
}

impl PlayerView {
    pub fn new(player: &Player, board: &BoardGraph, tied: bool) -> Self {
        Self {
            id: player.id.clone(),
            name: player.name.clone(),
            icon: player.icon.clone(),
            ready: player.ready,
            turn_order: player.turn_order,
            lobby_roll: player.lobby_roll,
            tied,
            position_node_id: player.position_node_id.clone(),
            position_type: board.node_type(&player.position_node_id),
            skip_turns: player.skip_turns,
            total_score: player.total_score,
        }
    }
}

/// Everything a client needs to render the lobby or the board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: String,
    pub code: String,
    pub status: SessionStatus,
    pub winner_player_id: Option<String>,
    pub started: bool,
    pub turn_order_locked: bool,
    pub current_turn_order: u32,
    pub current_player_id: Option<String>,
    pub turn_status: TurnPhase,
    pub last_dice_roll: Option<u8>,
    pub pending_fork_node_id: Option<String>,
    pub pending_remaining_steps: Option<u32>,
    pub fork_options: Vec<ForkOption>,
    pub active_challenge_id: Option<String>,
    pub players: Vec<PlayerView>,
    pub last_event_seq: u64,
    pub last_event_type: Option<EventKind>,
    pub last_event_message: Option<String>,
}

impl SessionView {
    pub fn new(state: &SessionState, board: &BoardGraph) -> Self {
        let session = &state.session;
        let tied = compute_tied_player_ids(&state.players);

        let mut players: Vec<&Player> = state.players.iter().collect();
        players.sort_by_key(|p| (p.turn_order, p.join_seq));

        Self {
            session_id: session.id.clone(),
            code: session.code.clone(),
            status: session.status,
            winner_player_id: session.winner_player_id.clone(),
            started: session.is_started(),
            turn_order_locked: session.turn_order_locked,
            current_turn_order: session.current_turn_order,
            current_player_id: state.current_player().map(|p| p.id.clone()),
            turn_status: session.turn_status,
            last_dice_roll: session.last_dice_roll,
            pending_fork_node_id: session.pending_fork.as_ref().map(|f| f.node_id.clone()),
            pending_remaining_steps: session.pending_fork.as_ref().map(|f| f.remaining_steps),
            fork_options: session
                .pending_fork
                .as_ref()
                .map(|f| board.fork_options(&f.node_id))
                .unwrap_or_default(),
            active_challenge_id: session.active_challenge.as_ref().map(|c| c.id.clone()),
            players: players
                .into_iter()
                .map(|p| PlayerView::new(p, board, tied.contains(&p.id)))
                .collect(),
            last_event_seq: session.last_event_seq,
            last_event_type: session.last_event_type,
            last_event_message: session.last_event_message.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbyRollResponse {
    pub player_id: String,
    pub roll: u8,
    pub tied: bool,
    pub turn_order_locked: bool,
}

/// Result of a dice roll or a path choice
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOutcome {
    pub dice_roll: Option<u8>,
    pub position_node_id: String,
    pub position_type: Option<BoardNodeType>,
    pub session_status: SessionStatus,
    pub turn_status: TurnPhase,
    pub fork_node_id: Option<String>,
    pub remaining_steps: Option<u32>,
    #[serde(default)]
    pub options: Vec<ForkOption>,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpecialCardOutcome {
    pub ok: bool,
    #[serde(default)]
    pub ignored: bool,
    #[serde(default)]
    pub need_choice: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fork_node_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ForkOption>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge_id: String,
    pub category: ChallengeCategory,
    pub difficulty: Difficulty,
    pub route: String,
    pub params: ChallengeParams,
    pub base_points: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreResponse {
    pub points_awarded: i64,
    pub total_score: i64,
    pub turn_status: TurnPhase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub player_id: String,
    pub name: String,
    pub icon: String,
    pub total_score: i64,
    pub challenges_played: usize,
    pub position_node_id: String,
}

impl SessionState {
    /// Standings by total score, then name
    pub fn leaderboard(&self) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = self
            .players
            .iter()
            .map(|p| LeaderboardEntry {
                player_id: p.id.clone(),
                name: p.name.clone(),
                icon: p.icon.clone(),
                total_score: p.total_score,
                challenges_played: self.scores.iter().filter(|s| s.player_id == p.id).count(),
                position_node_id: p.position_node_id.clone(),
            })
            .collect();
        entries.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        entries
    }
}
