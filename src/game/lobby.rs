use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use super::dice::{Dice, LOBBY_DIE_SIDES};
use super::error::GameError;
use super::models::{Player, SessionState, SessionStatus, TurnPhase};
use crate::event::EventKind;

const MAX_NAME_LEN: usize = 32;
const DEFAULT_ICON: &str = "pawn";

/// Ids of every player whose lobby roll is shared with at least one other player
pub fn compute_tied_player_ids(players: &[Player]) -> HashSet<String> {
    let mut by_roll: HashMap<u8, Vec<&Player>> = HashMap::new();
    for player in players {
        if let Some(roll) = player.lobby_roll {
            by_roll.entry(roll).or_default().push(player);
        }
    }

    by_roll
        .into_values()
        .filter(|group| group.len() > 1)
        .flatten()
        .map(|p| p.id.clone())
        .collect()
}

#[derive(Debug, Clone)]
pub struct RegisteredPlayer {
    pub player: Player,
    pub created: bool,
}

impl SessionState {
    /// Adds a player, or returns the existing one with the same name (ignoring case)
    pub fn register_player(
        &mut self,
        start_node_id: &str,
        name: &str,
        icon: Option<&str>,
    ) -> Result<RegisteredPlayer, GameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GameError::validation("Player name is required"));
        }
        if name.chars().count() > MAX_NAME_LEN {
            return Err(GameError::validation(format!(
                "Player name must be at most {} characters",
                MAX_NAME_LEN
            )));
        }

        if let Some(existing) = self
            .players
            .iter()
            .find(|p| p.name.to_lowercase() == name.to_lowercase())
        {
            debug!(player_id = %existing.id, "Player already registered");
            return Ok(RegisteredPlayer {
                player: existing.clone(),
                created: false,
            });
        }

        if self.session.status == SessionStatus::Finished {
            return Err(GameError::phase("Session is finished"));
        }

        let icon = icon
            .map(str::trim)
            .filter(|i| !i.is_empty())
            .unwrap_or(DEFAULT_ICON);
        let turn_order = self.players.len() as u32 + 1;
        let join_seq = self.session.next_join_seq;
        self.session.next_join_seq += 1;

        let player = Player::new(
            &self.session.id,
            name.to_string(),
            icon.to_string(),
            start_node_id,
            turn_order,
            join_seq,
        );
        self.players.push(player.clone());
        self.normalize_turn_orders();

        info!(session_id = %self.session.id, player_id = %player.id, name = %player.name, "Player joined");
        self.publish(EventKind::PlayerJoined, format!("{} joined", player.name));

        // A running game that everybody left resumes with the newcomer
        if self.session.status == SessionStatus::InProgress && self.session.current_turn_order == 0 {
            self.session.current_turn_order = player.turn_order;
            self.session.turn_status = TurnPhase::AwaitingD6Roll;
            info!(session_id = %self.session.id, player_id = %player.id, "Turn handed to rejoining player");
            self.announce_current_turn();
        }

        Ok(RegisteredPlayer {
            player,
            created: true,
        })
    }

    /// Rolls the lobby d20 that decides the initial turn order
    pub fn roll_lobby_d20(&mut self, dice: &dyn Dice, player_id: &str) -> Result<u8, GameError> {
        let idx = self.player_index(player_id)?;
        if self.session.status != SessionStatus::Lobby {
            return Err(GameError::phase("Lobby rolls are only possible before the game starts"));
        }
        if self.session.turn_order_locked {
            return Err(GameError::phase("Turn order is already decided"));
        }

        let tied = compute_tied_player_ids(&self.players);
        let previous = self.players[idx].lobby_roll;
        match previous {
            None => {}
            Some(prev) if tied.contains(player_id) => {
                // The whole tie group rolls again
                for player in self.players.iter_mut().filter(|p| p.lobby_roll == Some(prev)) {
                    player.lobby_roll = None;
                    player.ready = false;
                }
            }
            Some(_) => return Err(GameError::phase("Already rolled")),
        }

        let roll = dice.roll(LOBBY_DIE_SIDES);
        self.players[idx].lobby_roll = Some(roll);
        let name = self.players[idx].name.clone();
        debug!(session_id = %self.session.id, player = %name, roll, "Lobby d20 rolled");
        self.publish(EventKind::LobbyRoll, format!("{} rolled {} on the d20", name, roll));

        if self.lobby_rolls_resolved() {
            self.finalize_turn_order();
        }
        Ok(roll)
    }

    pub fn set_ready(&mut self, player_id: &str, ready: bool) -> Result<Player, GameError> {
        let idx = self.player_index(player_id)?;
        if self.session.status != SessionStatus::Lobby {
            return Err(GameError::phase("Game already started"));
        }
        if ready && !self.session.turn_order_locked {
            let player = &self.players[idx];
            if player.lobby_roll.is_none() {
                return Err(GameError::phase("Roll the lobby d20 before getting ready"));
            }
            if compute_tied_player_ids(&self.players).contains(player_id) {
                return Err(GameError::phase("Tied lobby roll, roll again first"));
            }
        }

        self.players[idx].ready = ready;
        debug!(session_id = %self.session.id, player_id = %player_id, ready, "Ready state changed");
        self.try_start();

        let idx = self.player_index(player_id)?;
        Ok(self.players[idx].clone())
    }

    fn lobby_rolls_resolved(&self) -> bool {
        !self.players.is_empty()
            && self.players.iter().all(|p| p.lobby_roll.is_some())
            && compute_tied_player_ids(&self.players).is_empty()
    }

    /// Orders players by lobby roll (highest first, then join order) and locks the order
    fn finalize_turn_order(&mut self) {
        let mut order: Vec<usize> = (0..self.players.len()).collect();
        order.sort_by(|&a, &b| {
            let (pa, pb) = (&self.players[a], &self.players[b]);
            pb.lobby_roll
                .cmp(&pa.lobby_roll)
                .then(pa.join_seq.cmp(&pb.join_seq))
                .then_with(|| pa.id.cmp(&pb.id))
        });
        for (position, idx) in order.into_iter().enumerate() {
            self.players[idx].turn_order = position as u32 + 1;
        }
        self.session.turn_order_locked = true;
        info!(session_id = %self.session.id, "Turn order locked");
    }

    /// Starts the game once every player is ready and the turn order is settled
    pub fn try_start(&mut self) -> bool {
        if self.session.status != SessionStatus::Lobby || self.players.is_empty() {
            return false;
        }
        if !self.players.iter().all(|p| p.ready) {
            return false;
        }
        if !self.session.turn_order_locked {
            if !self.lobby_rolls_resolved() {
                return false;
            }
            self.finalize_turn_order();
        }

        self.normalize_turn_orders();
        self.session.status = SessionStatus::InProgress;
        self.session.current_turn_order = 1;
        self.session.turn_status = TurnPhase::AwaitingD6Roll;
        info!(session_id = %self.session.id, players = self.players.len(), "Game started");
        self.publish(EventKind::GameStarted, "Game started");

        self.consume_skips();
        self.announce_current_turn();
        true
    }
}
