use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, info};

use super::error::GameError;
use super::models::{Modifier, SessionState, SessionStatus, TurnPhase};
use crate::board::{BoardGraph, ForkOption};
use crate::config::SpecialLanding;
use crate::event::EventKind;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum SpecialCard {
    PermissionDenied,
    RageBait,
    Refactor,
    SecondChance,
    ShortcutFound,
    Rollback,
    Boost,
    Jail,
}

impl SpecialCard {
    /// Cards that help the player who plays them
    pub fn is_positive(self) -> bool {
        matches!(
            self,
            SpecialCard::Refactor
                | SpecialCard::SecondChance
                | SpecialCard::ShortcutFound
                | SpecialCard::Boost
        )
    }

    pub fn needs_target(self) -> bool {
        matches!(
            self,
            SpecialCard::PermissionDenied | SpecialCard::RageBait | SpecialCard::Rollback
        )
    }
}

/// Board change a card makes once it has been announced
enum CardEffect {
    Nothing,
    Jail(usize),
    StepTo(String),
}

enum BoostStep {
    Stay,
    To(String),
    Choose {
        fork_node_id: String,
        options: Vec<ForkOption>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardOutcome {
    Applied,
    /// A pending "ignore next positive special" swallowed the card
    Ignored,
    /// BOOST from a fork needs a destination; nothing was changed
    NeedChoice {
        fork_node_id: String,
        options: Vec<ForkOption>,
    },
}

impl SessionState {
    /// Plays a special card for the current player. Completing a card ends the turn.
    pub fn apply_special_card(
        &mut self,
        board: &BoardGraph,
        player_id: &str,
        card: SpecialCard,
        target_player_id: Option<&str>,
        boost_to_node_id: Option<&str>,
    ) -> Result<CardOutcome, GameError> {
        let idx = self.player_index(player_id)?;
        self.ensure_in_progress()?;
        self.ensure_turn_of(idx)?;
        self.ensure_phase(&[TurnPhase::AwaitingSpecialCard])?;

        let target_idx = if card.needs_target() {
            let target_id = target_player_id
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| GameError::validation(format!("{} needs a target player", card)))?;
            let target_idx = self
                .players
                .iter()
                .position(|p| p.id == target_id)
                .ok_or_else(|| {
                    GameError::validation(format!("Target {} is not in this session", target_id))
                })?;
            Some(target_idx)
        } else {
            None
        };

        let actor = self.players[idx].name.clone();
        if card.is_positive() && self.players[idx].take(Modifier::IgnoreNextPositiveSpecial) {
            info!(session_id = %self.session.id, player = %actor, card = %card, "Special card ignored");
            self.publish(
                EventKind::SpecialIgnored,
                format!("{}'s {} was blocked", actor, card),
            );
            self.end_card_turn();
            return Ok(CardOutcome::Ignored);
        }

        let (message, effect) = match (card, target_idx) {
            (SpecialCard::PermissionDenied, Some(t)) => {
                self.players[t].grant(Modifier::IgnoreNextPositiveSpecial);
                let message =
                    format!("{} denied {}'s next positive card", actor, self.players[t].name);
                (message, CardEffect::Nothing)
            }
            (SpecialCard::RageBait, Some(t)) => {
                let mine = self.players[idx].position_node_id.clone();
                let theirs = std::mem::replace(&mut self.players[t].position_node_id, mine);
                self.players[idx].position_node_id = theirs;
                let message = format!("{} swapped places with {}", actor, self.players[t].name);
                (message, CardEffect::Nothing)
            }
            (SpecialCard::Rollback, Some(t)) => {
                let message = format!("{} rolled {} back to jail", actor, self.players[t].name);
                (message, CardEffect::Jail(t))
            }
            (SpecialCard::Refactor, _) => {
                self.players[idx].grant(Modifier::NextHardBecomesMedium);
                let message = format!("{}'s next HARD challenge becomes MEDIUM", actor);
                (message, CardEffect::Nothing)
            }
            (SpecialCard::SecondChance, _) => {
                self.players[idx].grant(Modifier::NextDiceAdvantage);
                (format!("{} rolls twice next time", actor), CardEffect::Nothing)
            }
            (SpecialCard::ShortcutFound, _) => {
                self.players[idx].grant(Modifier::NextHardBecomesEasy);
                let message = format!("{}'s next HARD challenge becomes EASY", actor);
                (message, CardEffect::Nothing)
            }
            (SpecialCard::Jail, _) => (format!("{} went to jail", actor), CardEffect::Jail(idx)),
            (SpecialCard::Boost, _) => {
                let effect = match self.boost_step(board, idx, boost_to_node_id)? {
                    BoostStep::Choose {
                        fork_node_id,
                        options,
                    } => {
                        return Ok(CardOutcome::NeedChoice {
                            fork_node_id,
                            options,
                        })
                    }
                    BoostStep::Stay => CardEffect::Nothing,
                    BoostStep::To(next) => CardEffect::StepTo(next),
                };
                (format!("{} boosted one step", actor), effect)
            }
            (card, None) => {
                return Err(GameError::validation(format!("{} needs a target player", card)))
            }
        };

        debug!(session_id = %self.session.id, card = %card, "Special card applied");
        self.publish(EventKind::Special, message);
        match effect {
            CardEffect::Nothing => {}
            CardEffect::Jail(t) => self.send_to_jail(board, t),
            CardEffect::StepTo(next) => {
                self.players[idx].position_node_id = next.clone();
                // A boost never chains into another card draw
                self.land_on(board, SpecialLanding::Jail, idx, &next);
            }
        }
        self.end_card_turn();
        Ok(CardOutcome::Applied)
    }

    /// Where a boost takes the actor. Standing on a fork without a destination asks
    /// for a choice.
    fn boost_step(
        &self,
        board: &BoardGraph,
        idx: usize,
        boost_to_node_id: Option<&str>,
    ) -> Result<BoostStep, GameError> {
        let at = &self.players[idx].position_node_id;
        match (board.outgoing(at), boost_to_node_id) {
            ([], _) => Ok(BoostStep::Stay),
            ([only], _) => Ok(BoostStep::To(only.clone())),
            (_, None) => Ok(BoostStep::Choose {
                options: board.fork_options(at),
                fork_node_id: at.clone(),
            }),
            (_, Some(to)) if board.has_edge(at, to) => Ok(BoostStep::To(to.to_string())),
            (_, Some(to)) => Err(GameError::validation(format!(
                "{} is not reachable from {}",
                to, at
            ))),
        }
    }

    fn end_card_turn(&mut self) {
        if self.session.status == SessionStatus::Finished {
            return;
        }
        self.session.turn_status = TurnPhase::AwaitingD6Roll;
        self.advance_turn();
    }
}
