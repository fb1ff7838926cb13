use tracing::{debug, info, warn};

use super::dice::{roll_with_advantage, Dice, MOVE_DIE_SIDES};
use super::error::GameError;
use super::models::{Modifier, Player, SessionState, SessionStatus, TurnPhase};
use super::movement::{LandingEffect, MoveResult};
use super::types::MoveOutcome;
use crate::board::{BoardGraph, BoardNodeType};
use crate::config::GameRules;
use crate::event::EventKind;

impl SessionState {
    pub fn ensure_in_progress(&self) -> Result<(), GameError> {
        match self.session.status {
            SessionStatus::InProgress => Ok(()),
            SessionStatus::Lobby => Err(GameError::phase("Game has not started")),
            SessionStatus::Finished => Err(GameError::phase("Game is finished")),
        }
    }

    pub fn ensure_turn_of(&self, idx: usize) -> Result<(), GameError> {
        let current = self.session.current_turn_order;
        if current > 0 && self.players[idx].turn_order == current {
            Ok(())
        } else {
            Err(GameError::NotYourTurn)
        }
    }

    pub fn ensure_phase(&self, allowed: &[TurnPhase]) -> Result<(), GameError> {
        if allowed.contains(&self.session.turn_status) {
            Ok(())
        } else {
            Err(GameError::wrong_phase(allowed, self.session.turn_status))
        }
    }

    /// Renumbers turn orders to 1..=n, keeping relative order and breaking ties by join order
    pub fn normalize_turn_orders(&mut self) {
        let mut order: Vec<usize> = (0..self.players.len()).collect();
        order.sort_by_key(|&idx| (self.players[idx].turn_order, self.players[idx].join_seq));
        for (position, idx) in order.into_iter().enumerate() {
            self.players[idx].turn_order = position as u32 + 1;
        }
    }

    /// Passes the turn to the next player, consuming pending skips on the way
    pub fn advance_turn(&mut self) {
        if self.session.status != SessionStatus::InProgress {
            return;
        }
        self.reset_turn_fields();

        let n = self.players.len() as u32;
        if n == 0 {
            self.session.current_turn_order = 0;
            self.session.turn_status = TurnPhase::Idle;
            return;
        }

        self.normalize_turn_orders();
        self.session.current_turn_order = (self.session.current_turn_order % n) + 1;
        self.consume_skips();
        self.announce_current_turn();
    }

    fn reset_turn_fields(&mut self) {
        self.session.last_dice_roll = None;
        self.session.pending_fork = None;
        self.session.active_challenge = None;
        self.session.turn_status = TurnPhase::AwaitingD6Roll;
    }

    /// Skips every player at the front of the rotation who owes a turn. Bounded by the
    /// player count, so a table where everybody is jailed still terminates.
    pub(crate) fn consume_skips(&mut self) {
        let n = self.players.len() as u32;
        for _ in 0..n {
            let Some(idx) = self.current_player_index() else {
                break;
            };
            if self.players[idx].skip_turns == 0 {
                break;
            }

            let player = &mut self.players[idx];
            player.skip_turns -= 1;
            if let Some(return_node) = player.jail_return_node_id.take() {
                debug!(player = %player.name, node = %return_node, "Released from jail");
                player.position_node_id = return_node;
            }
            let message = format!("{} skips a turn", player.name);
            info!(session_id = %self.session.id, player_id = %self.players[idx].id, "Turn skipped");
            self.publish(EventKind::TurnSkipped, message);

            self.session.current_turn_order = (self.session.current_turn_order % n) + 1;
        }
    }

    pub(crate) fn announce_current_turn(&mut self) {
        if let Some(player) = self.current_player() {
            let message = format!("It's {}'s turn", player.name);
            self.publish(EventKind::TurnNext, message);
        }
    }

    /// Ends the game with `winner_idx` as winner. Repeated calls keep the first winner.
    pub fn finish_session(&mut self, winner_idx: usize) {
        if self.session.status == SessionStatus::Finished {
            return;
        }
        let winner = &self.players[winner_idx];
        let (winner_id, winner_name) = (winner.id.clone(), winner.name.clone());

        self.session.status = SessionStatus::Finished;
        self.session.winner_player_id = Some(winner_id);
        self.session.turn_status = TurnPhase::Idle;
        self.session.pending_fork = None;
        self.session.active_challenge = None;
        info!(session_id = %self.session.id, winner = %winner_name, "Game finished");
        self.publish(EventKind::GameFinished, format!("{} reached the finish", winner_name));
    }

    /// Moves the turn on after a scored challenge when handovers need confirmation
    pub fn confirm_turn_handover(&mut self, player_id: &str) -> Result<(), GameError> {
        let idx = self.player_index(player_id)?;
        self.ensure_in_progress()?;
        self.ensure_turn_of(idx)?;
        self.ensure_phase(&[TurnPhase::AwaitingConfirm])?;
        self.advance_turn();
        Ok(())
    }

    /// Removes a player, keeping turn orders contiguous and the turn pointer valid
    pub fn remove_player(&mut self, player_id: &str) -> Result<Player, GameError> {
        let idx = self.player_index(player_id)?;
        let was_current = self.session.status == SessionStatus::InProgress
            && self.session.current_turn_order == self.players[idx].turn_order;
        let current_id = self.current_player().map(|p| p.id.clone());

        let removed = self.players.remove(idx);
        self.normalize_turn_orders();
        info!(session_id = %self.session.id, player = %removed.name, was_current, "Player left");
        self.publish(EventKind::PlayerLeft, format!("{} left the game", removed.name));

        match self.session.status {
            SessionStatus::Lobby => {
                self.try_start();
            }
            SessionStatus::InProgress if was_current => {
                // Step back so advancing lands on whoever followed the leaver
                self.session.current_turn_order = removed.turn_order.saturating_sub(1);
                self.advance_turn();
            }
            SessionStatus::InProgress => {
                let n = self.players.len() as u32;
                let kept = current_id
                    .as_deref()
                    .and_then(|id| self.players.iter().find(|p| p.id == id))
                    .map(|p| p.turn_order);
                self.session.current_turn_order = match kept {
                    Some(order) => order,
                    None if n == 0 => 0,
                    None => {
                        warn!(session_id = %self.session.id, "Turn pointer out of range, resetting");
                        1
                    }
                };
            }
            SessionStatus::Finished => {}
        }

        Ok(removed)
    }

    /// Rolls the d6 for the current player and moves them
    pub fn roll_d6(
        &mut self,
        board: &BoardGraph,
        rules: &GameRules,
        dice: &dyn Dice,
        player_id: &str,
    ) -> Result<MoveOutcome, GameError> {
        let idx = self.player_index(player_id)?;
        self.ensure_in_progress()?;
        self.ensure_turn_of(idx)?;
        self.ensure_phase(&[TurnPhase::AwaitingD6Roll])?;

        let advantage = self.players[idx].take(Modifier::NextDiceAdvantage);
        let roll = roll_with_advantage(dice, MOVE_DIE_SIDES, advantage);
        self.session.last_dice_roll = Some(roll);
        self.session.pending_fork = None;

        let name = self.players[idx].name.clone();
        info!(session_id = %self.session.id, player = %name, roll, advantage, "Dice rolled");
        self.publish(EventKind::DiceRolled, format!("{} rolled a {}", name, roll));

        let result = self.move_steps(board, rules, idx, roll as u32);
        Ok(self.settle_move(board, idx, result))
    }

    /// Picks a branch at the pending fork and finishes the paused move
    pub fn choose_path(
        &mut self,
        board: &BoardGraph,
        rules: &GameRules,
        player_id: &str,
        to_node_id: &str,
    ) -> Result<MoveOutcome, GameError> {
        let idx = self.player_index(player_id)?;
        self.ensure_in_progress()?;
        self.ensure_turn_of(idx)?;

        let result = self.resume_from_fork(board, rules, idx, to_node_id)?;
        Ok(self.settle_move(board, idx, result))
    }

    /// Decides what the turn does after a move stopped
    fn settle_move(&mut self, board: &BoardGraph, idx: usize, result: MoveResult) -> MoveOutcome {
        // Read before a handover clears it
        let dice_roll = self.session.last_dice_roll;
        let position = self.players[idx].position_node_id.clone();
        let position_type = board.node_type(&position);

        let (message, fork_node_id, remaining_steps, options) = match result {
            MoveResult::AwaitingChoice {
                fork_node_id,
                remaining_steps,
                options,
            } => (
                "Choose a path".to_string(),
                Some(fork_node_id),
                Some(remaining_steps),
                options,
            ),
            MoveResult::Landed(LandingEffect::Finished) => {
                ("Reached the finish".to_string(), None, None, Vec::new())
            }
            MoveResult::Landed(LandingEffect::Jailed) => {
                self.advance_turn();
                ("Jailed - turn ended".to_string(), None, None, Vec::new())
            }
            MoveResult::Landed(LandingEffect::SpecialCardDrawn) => {
                ("Play a special card".to_string(), None, None, Vec::new())
            }
            MoveResult::Completed if position_type == Some(BoardNodeType::Fork) => {
                self.advance_turn();
                ("Stopped on a fork - turn ended".to_string(), None, None, Vec::new())
            }
            MoveResult::Completed => {
                self.session.turn_status = TurnPhase::Idle;
                ("Moved".to_string(), None, None, Vec::new())
            }
        };

        MoveOutcome {
            dice_roll,
            position_node_id: position,
            position_type,
            session_status: self.session.status,
            turn_status: self.session.turn_status,
            fork_node_id,
            remaining_steps,
            options,
            message,
        }
    }
}
