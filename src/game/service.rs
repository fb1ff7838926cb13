use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex, OwnedMutexGuard, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use super::cards::CardOutcome;
use super::challenge::{ChallengeCategory, ChallengePicker, RandomChallengePicker};
use super::dice::{Dice, RandomDice};
use super::error::GameError;
use super::lobby::compute_tied_player_ids;
use super::models::{GameSession, SessionState, SessionStatus};
use super::repository::SessionRepository;
use super::types::{
    ChallengeResponse, LeaderboardEntry, LobbyRollResponse, MoveOutcome, PlayerView,
    ScoreResponse, SessionView, SpecialCardOutcome, SpecialCardRequest,
};
use crate::board::BoardGraph;
use crate::config::GameRules;
use crate::event::{EventBus, EventFeed, GameEvent};
use crate::shared::AppError;

const MAX_CODE_ATTEMPTS: usize = 20;

type SessionHandle = Arc<Mutex<LiveSession>>;

/// A loaded session and when a request last touched it
struct LiveSession {
    state: SessionState,
    last_active: Instant,
}

impl LiveSession {
    fn new(state: SessionState) -> Self {
        Self {
            state,
            last_active: Instant::now(),
        }
    }
}

/// Runs every game operation against a session under that session's lock.
///
/// Each operation works on a copy of the session; the copy is persisted and
/// swapped in only when the operation succeeds, so a rejected request never
/// leaves partial changes behind.
pub struct GameService {
    board: Arc<BoardGraph>,
    rules: GameRules,
    dice: Arc<dyn Dice>,
    picker: Arc<dyn ChallengePicker>,
    repository: Arc<dyn SessionRepository + Send + Sync>,
    event_feed: Arc<dyn EventFeed + Send + Sync>,
    event_bus: EventBus,
    sessions: RwLock<HashMap<String, SessionHandle>>,
}

impl GameService {
    pub fn new(
        board: Arc<BoardGraph>,
        rules: GameRules,
        repository: Arc<dyn SessionRepository + Send + Sync>,
        event_feed: Arc<dyn EventFeed + Send + Sync>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            board,
            rules,
            dice: Arc::new(RandomDice),
            picker: Arc::new(RandomChallengePicker),
            repository,
            event_feed,
            event_bus,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_dice(mut self, dice: Arc<dyn Dice>) -> Self {
        self.dice = dice;
        self
    }

    pub fn with_picker(mut self, picker: Arc<dyn ChallengePicker>) -> Self {
        self.picker = picker;
        self
    }

    pub fn board(&self) -> &BoardGraph {
        &self.board
    }

    pub fn rules(&self) -> GameRules {
        self.rules
    }

    #[instrument(skip(self))]
    pub async fn create_session(&self) -> Result<SessionView, AppError> {
        let code = self.unused_code().await?;
        let session = GameSession::new(uuid::Uuid::new_v4().to_string(), code);
        let state = SessionState::new(session);

        self.repository.save(&state).await?;
        let view = SessionView::new(&state, &self.board);
        self.sessions
            .write()
            .await
            .insert(state.session.id.clone(), Arc::new(Mutex::new(LiveSession::new(state))));

        info!(session_id = %view.session_id, code = %view.code, "Session created");
        Ok(view)
    }

    async fn unused_code(&self) -> Result<String, AppError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = petname::Petnames::default().generate_one(2, "-");
            if !self.repository.code_exists(&code).await? {
                return Ok(code);
            }
            debug!(code = %code, "Join code taken, trying another");
        }
        warn!("Could not find a free join code");
        Err(AppError::Internal)
    }

    #[instrument(skip(self))]
    pub async fn session_view(&self, session_id: &str) -> Result<SessionView, AppError> {
        let live = self.lock_session(session_id).await?;
        Ok(SessionView::new(&live.state, &self.board))
    }

    #[instrument(skip(self))]
    pub async fn find_by_code(&self, code: &str) -> Result<SessionView, AppError> {
        let session_id = self
            .repository
            .find_id_by_code(code.trim())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No session with code {}", code)))?;
        self.session_view(&session_id).await
    }

    #[instrument(skip(self))]
    pub async fn register_player(
        &self,
        session_id: &str,
        name: &str,
        icon: Option<&str>,
    ) -> Result<PlayerView, AppError> {
        let start = self.board.start_node_id();
        self.mutate(session_id, |state| {
            let registered = state.register_player(start, name, icon)?;
            let tied = compute_tied_player_ids(&state.players).contains(&registered.player.id);
            Ok(PlayerView::new(&registered.player, &self.board, tied))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_ready(
        &self,
        session_id: &str,
        player_id: &str,
        ready: bool,
    ) -> Result<PlayerView, AppError> {
        self.mutate(session_id, |state| {
            let player = state.set_ready(player_id, ready)?;
            let tied = compute_tied_player_ids(&state.players).contains(&player.id);
            Ok(PlayerView::new(&player, &self.board, tied))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn roll_lobby_d20(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<LobbyRollResponse, AppError> {
        let dice = self.dice.as_ref();
        self.mutate(session_id, |state| {
            let roll = state.roll_lobby_d20(dice, player_id)?;
            Ok(LobbyRollResponse {
                player_id: player_id.to_string(),
                roll,
                tied: compute_tied_player_ids(&state.players).contains(player_id),
                turn_order_locked: state.session.turn_order_locked,
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn roll_d6(&self, session_id: &str, player_id: &str) -> Result<MoveOutcome, AppError> {
        let dice = self.dice.as_ref();
        self.mutate(session_id, |state| {
            state.roll_d6(&self.board, &self.rules, dice, player_id)
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn choose_path(
        &self,
        session_id: &str,
        player_id: &str,
        to_node_id: &str,
    ) -> Result<MoveOutcome, AppError> {
        self.mutate(session_id, |state| {
            state.choose_path(&self.board, &self.rules, player_id, to_node_id)
        })
        .await
    }

    #[instrument(skip(self, request), fields(player_id = %request.player_id, card = %request.card))]
    pub async fn apply_special_card(
        &self,
        session_id: &str,
        request: &SpecialCardRequest,
    ) -> Result<SpecialCardOutcome, AppError> {
        let outcome = self
            .mutate(session_id, |state| {
                state.apply_special_card(
                    &self.board,
                    &request.player_id,
                    request.card,
                    request.target_player_id.as_deref(),
                    request.boost_to_node_id.as_deref(),
                )
            })
            .await?;

        Ok(match outcome {
            CardOutcome::Applied => SpecialCardOutcome {
                ok: true,
                ..Default::default()
            },
            CardOutcome::Ignored => SpecialCardOutcome {
                ok: true,
                ignored: true,
                ..Default::default()
            },
            CardOutcome::NeedChoice {
                fork_node_id,
                options,
            } => SpecialCardOutcome {
                ok: false,
                need_choice: true,
                fork_node_id: Some(fork_node_id),
                options,
                ..Default::default()
            },
        })
    }

    #[instrument(skip(self))]
    pub async fn confirm_turn_handover(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<SessionView, AppError> {
        self.mutate(session_id, |state| {
            state.confirm_turn_handover(player_id)?;
            Ok(SessionView::new(state, &self.board))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn remove_player(
        &self,
        session_id: &str,
        player_id: &str,
    ) -> Result<SessionView, AppError> {
        self.mutate(session_id, |state| {
            state.remove_player(player_id)?;
            Ok(SessionView::new(state, &self.board))
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn start_challenge(
        &self,
        session_id: &str,
        player_id: &str,
        category: Option<ChallengeCategory>,
    ) -> Result<ChallengeResponse, AppError> {
        let picker = self.picker.as_ref();
        self.mutate(session_id, |state| {
            let started = state.start_challenge(&self.board, picker, player_id, category)?;
            let descriptor = started.descriptor;
            Ok(ChallengeResponse {
                challenge_id: started.challenge_id,
                category: descriptor.category,
                difficulty: descriptor.difficulty,
                route: descriptor.route,
                params: descriptor.params,
                base_points: descriptor.difficulty.base_points(),
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn submit_score(
        &self,
        session_id: &str,
        player_id: &str,
        challenge_id: &str,
        points: i64,
    ) -> Result<ScoreResponse, AppError> {
        self.mutate(session_id, |state| {
            let record = state.submit_score(&self.rules, player_id, challenge_id, points)?;
            Ok(ScoreResponse {
                points_awarded: record.points,
                total_score: state.player(player_id)?.total_score,
                turn_status: state.session.turn_status,
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn leaderboard(&self, session_id: &str) -> Result<Vec<LeaderboardEntry>, AppError> {
        let live = self.lock_session(session_id).await?;
        Ok(live.state.leaderboard())
    }

    #[instrument(skip(self))]
    pub async fn events(
        &self,
        session_id: &str,
        after_seq: Option<u64>,
        limit: Option<usize>,
    ) -> Result<Vec<GameEvent>, AppError> {
        self.session_handle(session_id).await?;
        match after_seq {
            Some(after) => self.event_feed.events_after(session_id, after).await,
            None => self.event_feed.latest(session_id, limit).await,
        }
    }

    pub async fn subscribe(
        &self,
        session_id: &str,
    ) -> Result<broadcast::Receiver<GameEvent>, AppError> {
        self.session_handle(session_id).await?;
        Ok(self.event_bus.subscribe(session_id).await)
    }

    /// Returns the live handle of a session, loading its snapshot on first use
    async fn session_handle(&self, session_id: &str) -> Result<SessionHandle, AppError> {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Ok(Arc::clone(handle));
        }

        let state = self
            .repository
            .load(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session not found: {}", session_id)))?;
        debug!(session_id = %session_id, "Session restored from repository");

        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(LiveSession::new(state))));
        Ok(Arc::clone(handle))
    }

    async fn lock_session(&self, session_id: &str) -> Result<OwnedMutexGuard<LiveSession>, AppError> {
        let handle = self.session_handle(session_id).await?;
        let mut live = handle.lock_owned().await;
        live.last_active = Instant::now();
        Ok(live)
    }

    /// Unloads sessions untouched for `idle_after`, or `finished_after` once the game is
    /// over, and closes their event channels. Snapshots stay in the repository and are
    /// loaded again on the next request.
    #[instrument(skip(self))]
    pub async fn evict_idle_sessions(&self, idle_after: Duration, finished_after: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let mut evicted = Vec::new();
        sessions.retain(|session_id, handle| {
            // A request between lookup and lock still holds a clone
            if Arc::strong_count(handle) > 1 {
                return true;
            }
            let Ok(live) = handle.try_lock() else {
                return true;
            };
            let threshold = match live.state.session.status {
                SessionStatus::Finished => finished_after,
                _ => idle_after,
            };
            if live.last_active.elapsed() < threshold {
                return true;
            }
            evicted.push(session_id.clone());
            false
        });

        // Still holding the registry, so a reload cannot race the channel removal
        for session_id in &evicted {
            self.event_bus.remove_session(session_id).await;
            debug!(session_id = %session_id, "Session unloaded");
        }
        evicted.len()
    }

    /// Number of sessions currently held in memory
    pub async fn loaded_sessions(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Applies `operation` to a working copy of the session and commits it on success
    async fn mutate<T, F>(&self, session_id: &str, operation: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut SessionState) -> Result<T, GameError>,
    {
        let mut live = self.lock_session(session_id).await?;

        let mut working = live.state.clone();
        let result = operation(&mut working).map_err(|e| {
            warn!(session_id = %session_id, error = %e, "Operation rejected");
            AppError::from(e)
        })?;

        let events = working.take_outbox();
        self.repository.save(&working).await?;
        live.state = working;

        // Still holding the session lock, so events go out in sequence order
        for event in events {
            if let Err(e) = self.event_feed.append(event.clone()).await {
                warn!(session_id = %session_id, seq = event.seq, error = %e, "Failed to record event");
            }
            self.event_bus.emit(event).await;
        }
        Ok(result)
    }
}
