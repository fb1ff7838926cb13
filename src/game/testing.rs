use super::challenge::{ChallengeCategory, ChallengeDescriptor, ChallengePicker, Difficulty};
use super::dice::ScriptedDice;
use super::models::{GameSession, SessionState};
use crate::board::BoardGraph;

/// Always hands out a stack maze, at whatever difficulty was asked for
pub struct FixedChallengePicker;

impl ChallengePicker for FixedChallengePicker {
    fn pick(
        &self,
        difficulty: Difficulty,
        requested: Option<ChallengeCategory>,
        _exclude: Option<ChallengeCategory>,
    ) -> ChallengeDescriptor {
        ChallengeDescriptor::new(requested.unwrap_or(ChallengeCategory::StackMaze), difficulty)
    }
}

/// A started game where `players[i]` has turn order `i + 1` and the first player is up
pub fn started_game(board: &BoardGraph, names: &[&str]) -> SessionState {
    let mut state = SessionState::new(GameSession::new(
        "session-1".to_string(),
        "test-code".to_string(),
    ));
    for name in names {
        state
            .register_player(board.start_node_id(), name, None)
            .unwrap();
    }

    let dice = ScriptedDice::new((0..names.len()).map(|i| 20 - i as u8));
    let ids: Vec<String> = state.players.iter().map(|p| p.id.clone()).collect();
    for id in &ids {
        state.roll_lobby_d20(&dice, id).unwrap();
    }
    for id in &ids {
        state.set_ready(id, true).unwrap();
    }
    assert!(state.session.is_started());
    state.take_outbox();
    state
}
