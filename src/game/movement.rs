use serde::Serialize;
use tracing::{debug, info};

use super::error::GameError;
use super::models::{PendingFork, SessionState, TurnPhase};
use crate::board::{BoardGraph, BoardNodeType, ForkOption};
use crate::config::{GameRules, SpecialLanding};
use crate::event::EventKind;

/// Effect triggered by the node a move ends on. Any effect ends the move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LandingEffect {
    Finished,
    Jailed,
    SpecialCardDrawn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// Steps ran out, or the path dead-ended
    Completed,
    AwaitingChoice {
        fork_node_id: String,
        remaining_steps: u32,
        options: Vec<ForkOption>,
    },
    Landed(LandingEffect),
}

impl SessionState {
    /// Walks the player forward `steps` nodes, pausing at forks
    pub fn move_steps(
        &mut self,
        board: &BoardGraph,
        rules: &GameRules,
        idx: usize,
        steps: u32,
    ) -> MoveResult {
        let mut remaining = steps;
        while remaining > 0 {
            let at = self.players[idx].position_node_id.clone();
            if board.node_type(&at) == Some(BoardNodeType::Finish) {
                break;
            }

            let next = match board.outgoing(&at) {
                [] => {
                    debug!(node = %at, remaining, "Dead end reached");
                    break;
                }
                [only] => only.clone(),
                _ => {
                    self.session.pending_fork = Some(PendingFork {
                        node_id: at.clone(),
                        remaining_steps: remaining,
                    });
                    self.session.turn_status = TurnPhase::AwaitingPathChoice;
                    debug!(fork = %at, remaining, "Waiting for path choice");
                    return MoveResult::AwaitingChoice {
                        options: board.fork_options(&at),
                        fork_node_id: at,
                        remaining_steps: remaining,
                    };
                }
            };

            self.players[idx].position_node_id = next.clone();
            remaining -= 1;
            if let Some(effect) = self.land_on(board, rules.special_landing, idx, &next) {
                return MoveResult::Landed(effect);
            }
        }
        MoveResult::Completed
    }

    /// Continues a paused move along `chosen_node_id`
    pub fn resume_from_fork(
        &mut self,
        board: &BoardGraph,
        rules: &GameRules,
        idx: usize,
        chosen_node_id: &str,
    ) -> Result<MoveResult, GameError> {
        self.ensure_phase(&[TurnPhase::AwaitingPathChoice])?;
        let pending = self
            .session
            .pending_fork
            .clone()
            .ok_or_else(|| GameError::phase("No fork is pending"))?;
        if !board.has_edge(&pending.node_id, chosen_node_id) {
            return Err(GameError::validation(format!(
                "{} is not reachable from {}",
                chosen_node_id, pending.node_id
            )));
        }

        let name = self.players[idx].name.clone();
        self.players[idx].position_node_id = chosen_node_id.to_string();
        self.session.pending_fork = None;
        self.session.turn_status = TurnPhase::AwaitingD6Roll;
        self.publish(
            EventKind::PathChosen,
            format!("{} took the path to {}", name, chosen_node_id),
        );

        if let Some(effect) = self.land_on(board, rules.special_landing, idx, chosen_node_id) {
            return Ok(MoveResult::Landed(effect));
        }
        let remaining = pending.remaining_steps.saturating_sub(1);
        Ok(self.move_steps(board, rules, idx, remaining))
    }

    /// Applies the effect of the node the player just stepped onto
    pub(crate) fn land_on(
        &mut self,
        board: &BoardGraph,
        special_landing: SpecialLanding,
        idx: usize,
        node_id: &str,
    ) -> Option<LandingEffect> {
        match board.node_type(node_id)? {
            BoardNodeType::Finish => {
                self.finish_session(idx);
                Some(LandingEffect::Finished)
            }
            BoardNodeType::Special => match special_landing {
                SpecialLanding::Jail => {
                    self.send_to_jail(board, idx);
                    Some(LandingEffect::Jailed)
                }
                SpecialLanding::DrawCard => {
                    self.session.turn_status = TurnPhase::AwaitingSpecialCard;
                    debug!(player = %self.players[idx].name, "Special card drawn");
                    Some(LandingEffect::SpecialCardDrawn)
                }
            },
            BoardNodeType::Jail => {
                let player = &mut self.players[idx];
                player.skip_turns = player.skip_turns.max(1);
                let message = format!("{} landed in jail", player.name);
                self.publish(EventKind::LandedJail, message);
                Some(LandingEffect::Jailed)
            }
            _ => None,
        }
    }

    /// Moves the player to the jail node for one skipped turn, remembering where to come
    /// back to. Boards without a jail only cost the turn.
    pub(crate) fn send_to_jail(&mut self, board: &BoardGraph, idx: usize) {
        let player = &mut self.players[idx];
        player.skip_turns = player.skip_turns.max(1);
        if let Some(jail) = board.jail_node_id() {
            if player.jail_return_node_id.is_none() {
                player.jail_return_node_id = Some(player.position_node_id.clone());
            }
            player.position_node_id = jail.to_string();
        }
        let message = format!("{} was sent to jail", player.name);
        info!(session_id = %self.session.id, player_id = %self.players[idx].id, "Player jailed");
        self.publish(EventKind::LandedJail, message);
    }
}
