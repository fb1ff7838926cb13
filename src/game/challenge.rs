use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};
use tracing::{debug, info};

use super::error::GameError;
use super::models::{ActiveChallenge, Modifier, ScoreRecord, SessionState, TurnPhase};
use crate::board::{BoardGraph, BoardNodeType};
use crate::config::{GameRules, TurnHandover};
use crate::event::EventKind;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Points awarded for a passed challenge
    pub fn base_points(self) -> i64 {
        match self {
            Difficulty::Easy => 5,
            Difficulty::Medium => 10,
            Difficulty::Hard => 15,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Difficulty::Easy => 1,
            Difficulty::Medium => 2,
            Difficulty::Hard => 3,
        }
    }

    /// Difficulty of the challenge a node triggers; FORK squares count as MEDIUM
    pub fn for_node(node_type: BoardNodeType) -> Option<Self> {
        match node_type {
            BoardNodeType::Easy => Some(Difficulty::Easy),
            BoardNodeType::Medium | BoardNodeType::Fork => Some(Difficulty::Medium),
            BoardNodeType::Hard => Some(Difficulty::Hard),
            _ => None,
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ChallengeCategory {
    StackMaze,
    GraphPath,
    BstInsert,
    QueueCommander,
}

impl ChallengeCategory {
    /// Frontend route hosting the minigame
    pub fn route(self) -> &'static str {
        match self {
            ChallengeCategory::StackMaze => "/stackmaze",
            ChallengeCategory::GraphPath => "/graphpath",
            ChallengeCategory::BstInsert => "/bstinsert",
            ChallengeCategory::QueueCommander => "/queuecommander",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeParams {
    pub level: u8,
    pub difficulty: Difficulty,
    pub category: ChallengeCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeDescriptor {
    pub category: ChallengeCategory,
    pub difficulty: Difficulty,
    pub route: String,
    pub params: ChallengeParams,
}

impl ChallengeDescriptor {
    pub fn new(category: ChallengeCategory, difficulty: Difficulty) -> Self {
        Self {
            category,
            difficulty,
            route: category.route().to_string(),
            params: ChallengeParams {
                level: difficulty.level(),
                difficulty,
                category,
            },
        }
    }
}

/// Chooses challenge content for a landing
pub trait ChallengePicker: Send + Sync {
    fn pick(
        &self,
        difficulty: Difficulty,
        requested: Option<ChallengeCategory>,
        exclude: Option<ChallengeCategory>,
    ) -> ChallengeDescriptor;
}

/// Random category, avoiding the one the player saw last
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomChallengePicker;

impl ChallengePicker for RandomChallengePicker {
    fn pick(
        &self,
        difficulty: Difficulty,
        requested: Option<ChallengeCategory>,
        exclude: Option<ChallengeCategory>,
    ) -> ChallengeDescriptor {
        let category = requested.unwrap_or_else(|| {
            let candidates: Vec<ChallengeCategory> = ChallengeCategory::iter()
                .filter(|c| Some(*c) != exclude)
                .collect();
            candidates
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(ChallengeCategory::StackMaze)
        });
        ChallengeDescriptor::new(category, difficulty)
    }
}

#[derive(Debug, Clone)]
pub struct StartedChallenge {
    pub challenge_id: String,
    pub descriptor: ChallengeDescriptor,
}

impl SessionState {
    /// Starts the challenge of the node the current player stands on
    pub fn start_challenge(
        &mut self,
        board: &BoardGraph,
        picker: &dyn ChallengePicker,
        player_id: &str,
        requested: Option<ChallengeCategory>,
    ) -> Result<StartedChallenge, GameError> {
        let idx = self.player_index(player_id)?;
        self.ensure_in_progress()?;
        self.ensure_turn_of(idx)?;
        self.ensure_phase(&[TurnPhase::Idle])?;

        let node_id = self.players[idx].position_node_id.clone();
        let node_type = board
            .node_type(&node_id)
            .ok_or_else(|| GameError::NotFound(format!("Board node not found: {}", node_id)))?;
        let mut difficulty = Difficulty::for_node(node_type)
            .ok_or_else(|| GameError::phase(format!("No challenge on a {} node", node_type)))?;

        let player = &mut self.players[idx];
        if difficulty == Difficulty::Hard {
            if player.take(Modifier::NextHardBecomesEasy) {
                difficulty = Difficulty::Easy;
            } else if player.take(Modifier::NextHardBecomesMedium) {
                difficulty = Difficulty::Medium;
            }
        }

        let descriptor = picker.pick(difficulty, requested, player.last_challenge_category);
        player.last_challenge_category = Some(descriptor.category);
        let name = player.name.clone();

        let challenge_id = uuid::Uuid::new_v4().to_string();
        self.session.active_challenge = Some(ActiveChallenge {
            id: challenge_id.clone(),
            difficulty: descriptor.difficulty,
            category: descriptor.category,
        });
        self.session.turn_status = TurnPhase::InChallenge;

        info!(
            session_id = %self.session.id,
            player = %name,
            difficulty = %descriptor.difficulty,
            category = %descriptor.category,
            "Challenge started"
        );
        self.publish(
            EventKind::ChallengeStarted,
            format!(
                "{} started a {} {} challenge",
                name, descriptor.difficulty, descriptor.category
            ),
        );

        Ok(StartedChallenge {
            challenge_id,
            descriptor,
        })
    }

    /// Records the result of the active challenge and hands the turn on
    pub fn submit_score(
        &mut self,
        rules: &GameRules,
        player_id: &str,
        challenge_id: &str,
        points: i64,
    ) -> Result<ScoreRecord, GameError> {
        let idx = self.player_index(player_id)?;
        self.ensure_in_progress()?;
        self.ensure_turn_of(idx)?;
        self.ensure_phase(&[TurnPhase::InChallenge])?;

        let active = match &self.session.active_challenge {
            Some(active) if active.id == challenge_id => active.clone(),
            _ => {
                return Err(GameError::validation(format!(
                    "Challenge {} is not the active challenge",
                    challenge_id
                )))
            }
        };

        let awarded = if points > 0 {
            active.difficulty.base_points()
        } else {
            0
        };

        let player = &mut self.players[idx];
        player.total_score += awarded;
        let record = ScoreRecord {
            player_id: player.id.clone(),
            player_name: player.name.clone(),
            challenge_id: active.id.clone(),
            category: active.category,
            difficulty: active.difficulty,
            points: awarded,
            created_at: chrono::Utc::now(),
        };
        debug!(
            player = %record.player_name,
            awarded,
            total = player.total_score,
            "Score recorded"
        );
        self.scores.push(record.clone());
        self.publish(
            EventKind::ScoreSubmitted,
            format!("{} scored {} points", record.player_name, awarded),
        );

        self.session.active_challenge = None;
        match rules.turn_handover {
            TurnHandover::Auto => self.advance_turn(),
            TurnHandover::Confirm => self.session.turn_status = TurnPhase::AwaitingConfirm,
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::testing::{started_game, FixedChallengePicker};
    use crate::board::graph::test_boards::line_board;
    use rstest::rstest;

    #[rstest]
    #[case(BoardNodeType::Easy, Some(Difficulty::Easy))]
    #[case(BoardNodeType::Medium, Some(Difficulty::Medium))]
    #[case(BoardNodeType::Fork, Some(Difficulty::Medium))]
    #[case(BoardNodeType::Hard, Some(Difficulty::Hard))]
    #[case(BoardNodeType::Special, None)]
    #[case(BoardNodeType::Start, None)]
    fn test_difficulty_for_node(#[case] node: BoardNodeType, #[case] expected: Option<Difficulty>) {
        assert_eq!(Difficulty::for_node(node), expected);
    }

    #[test]
    fn test_random_picker_avoids_excluded_category() {
        let picker = RandomChallengePicker;
        for _ in 0..100 {
            let descriptor = picker.pick(
                Difficulty::Medium,
                None,
                Some(ChallengeCategory::GraphPath),
            );
            assert_ne!(descriptor.category, ChallengeCategory::GraphPath);
            assert_eq!(descriptor.params.level, 2);
            assert_eq!(descriptor.route, descriptor.category.route());
        }
        let requested = picker.pick(
            Difficulty::Easy,
            Some(ChallengeCategory::BstInsert),
            Some(ChallengeCategory::BstInsert),
        );
        assert_eq!(requested.category, ChallengeCategory::BstInsert);
    }

    #[test]
    fn test_challenge_and_score_flow() {
        let board = line_board();
        let mut state = started_game(&board, &["alice", "bob"]);
        let alice = state.players[0].id.clone();
        state.players[0].position_node_id = "b".to_string();
        state.session.turn_status = TurnPhase::Idle;

        let started = state
            .start_challenge(&board, &FixedChallengePicker, &alice, None)
            .unwrap();
        assert_eq!(started.descriptor.difficulty, Difficulty::Medium);
        assert_eq!(state.session.turn_status, TurnPhase::InChallenge);
        assert_eq!(
            state.players[0].last_challenge_category,
            Some(started.descriptor.category)
        );

        let wrong = state.submit_score(&GameRules::default(), &alice, "other", 10);
        assert!(matches!(wrong, Err(GameError::Validation(_))));

        let record = state
            .submit_score(&GameRules::default(), &alice, &started.challenge_id, 999)
            .unwrap();
        assert_eq!(record.points, 10);
        assert_eq!(state.players[0].total_score, 10);
        assert_eq!(state.session.current_turn_order, 2);
        assert_eq!(state.session.turn_status, TurnPhase::AwaitingD6Roll);
        assert!(state.session.active_challenge.is_none());
    }

    #[test]
    fn test_failed_challenge_scores_zero() {
        let board = line_board();
        let mut state = started_game(&board, &["alice", "bob"]);
        let alice = state.players[0].id.clone();
        state.players[0].position_node_id = "a".to_string();
        state.session.turn_status = TurnPhase::Idle;

        let started = state
            .start_challenge(&board, &FixedChallengePicker, &alice, None)
            .unwrap();
        let record = state
            .submit_score(&GameRules::default(), &alice, &started.challenge_id, 0)
            .unwrap();
        assert_eq!(record.points, 0);
        assert_eq!(state.players[0].total_score, 0);
    }

    #[rstest]
    #[case(Some(Modifier::NextHardBecomesEasy), Difficulty::Easy)]
    #[case(Some(Modifier::NextHardBecomesMedium), Difficulty::Medium)]
    #[case(None, Difficulty::Hard)]
    fn test_hard_downgrades(#[case] modifier: Option<Modifier>, #[case] expected: Difficulty) {
        let board = line_board();
        let mut state = started_game(&board, &["alice", "bob"]);
        let alice = state.players[0].id.clone();
        state.players[0].position_node_id = "c".to_string();
        state.session.turn_status = TurnPhase::Idle;
        if let Some(modifier) = modifier {
            state.players[0].grant(modifier);
        }

        let started = state
            .start_challenge(&board, &FixedChallengePicker, &alice, None)
            .unwrap();
        assert_eq!(started.descriptor.difficulty, expected);
        assert!(state.players[0].modifiers.is_empty());
    }

    #[test]
    fn test_easy_downgrade_wins_over_medium() {
        let board = line_board();
        let mut state = started_game(&board, &["alice", "bob"]);
        let alice = state.players[0].id.clone();
        state.players[0].position_node_id = "c".to_string();
        state.session.turn_status = TurnPhase::Idle;
        state.players[0].grant(Modifier::NextHardBecomesEasy);
        state.players[0].grant(Modifier::NextHardBecomesMedium);

        let started = state
            .start_challenge(&board, &FixedChallengePicker, &alice, None)
            .unwrap();
        assert_eq!(started.descriptor.difficulty, Difficulty::Easy);
        assert!(state.players[0].has(Modifier::NextHardBecomesMedium));
    }

    #[test]
    fn test_challenge_rules_enforced() {
        let board = line_board();
        let mut state = started_game(&board, &["alice", "bob"]);
        let alice = state.players[0].id.clone();
        let bob = state.players[1].id.clone();

        // Still waiting for the dice
        assert!(matches!(
            state.start_challenge(&board, &FixedChallengePicker, &alice, None),
            Err(GameError::Phase(_))
        ));

        state.session.turn_status = TurnPhase::Idle;
        assert_eq!(
            state
                .start_challenge(&board, &FixedChallengePicker, &bob, None)
                .unwrap_err(),
            GameError::NotYourTurn
        );

        // START has no challenge
        assert!(matches!(
            state.start_challenge(&board, &FixedChallengePicker, &alice, None),
            Err(GameError::Phase(_))
        ));
    }

    #[test]
    fn test_confirm_handover_waits_for_confirmation() {
        let board = line_board();
        let rules = GameRules {
            turn_handover: TurnHandover::Confirm,
            ..GameRules::default()
        };
        let mut state = started_game(&board, &["alice", "bob"]);
        let alice = state.players[0].id.clone();
        state.players[0].position_node_id = "a".to_string();
        state.session.turn_status = TurnPhase::Idle;

        let started = state
            .start_challenge(&board, &FixedChallengePicker, &alice, None)
            .unwrap();
        state
            .submit_score(&rules, &alice, &started.challenge_id, 1)
            .unwrap();
        assert_eq!(state.session.turn_status, TurnPhase::AwaitingConfirm);
        assert_eq!(state.session.current_turn_order, 1);

        state.confirm_turn_handover(&alice).unwrap();
        assert_eq!(state.session.current_turn_order, 2);
        assert_eq!(state.session.turn_status, TurnPhase::AwaitingD6Roll);
    }
}
