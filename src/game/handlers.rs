use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, instrument};

use super::types::{
    ChallengeResponse, ChoosePathRequest, LeaderboardEntry, LobbyRollResponse, MoveOutcome,
    PlayerActionRequest, PlayerView, ReadyRequest, RegisterPlayerRequest, ScoreResponse,
    SessionView, SpecialCardRequest, StartChallengeRequest, SubmitScoreRequest,
};
use crate::shared::{AppError, AppState, ValidatedJson};

/// HTTP handler for creating a new game session
///
/// POST /api/sessions
/// Returns the session in its lobby state with a shareable join code
#[instrument(name = "create_session", skip(state))]
pub async fn create_session(State(state): State<AppState>) -> Result<Json<SessionView>, AppError> {
    let session = state.game_service.create_session().await?;
    info!(session_id = %session.session_id, code = %session.code, "Session created successfully");
    Ok(Json(session))
}

/// GET /api/sessions/:session_id
#[instrument(name = "get_session", skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.game_service.session_view(&session_id).await?))
}

/// GET /api/sessions/code/:code
#[instrument(name = "find_session_by_code", skip(state))]
pub async fn find_session_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.game_service.find_by_code(&code).await?))
}

/// HTTP handler for joining a session
///
/// POST /api/sessions/:session_id/players
/// Joining again under the same name returns the existing player
#[instrument(name = "register_player", skip(state))]
pub async fn register_player(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<RegisterPlayerRequest>,
) -> Result<Json<PlayerView>, AppError> {
    let player = state
        .game_service
        .register_player(&session_id, &request.name, request.icon.as_deref())
        .await?;
    info!(player_id = %player.id, name = %player.name, "Player registered");
    Ok(Json(player))
}

/// POST /api/sessions/:session_id/players/:player_id/ready
#[instrument(name = "set_ready", skip(state))]
pub async fn set_ready(
    State(state): State<AppState>,
    Path((session_id, player_id)): Path<(String, String)>,
    ValidatedJson(request): ValidatedJson<ReadyRequest>,
) -> Result<Json<PlayerView>, AppError> {
    let player = state
        .game_service
        .set_ready(&session_id, &player_id, request.ready)
        .await?;
    Ok(Json(player))
}

/// DELETE /api/sessions/:session_id/players/:player_id
#[instrument(name = "remove_player", skip(state))]
pub async fn remove_player(
    State(state): State<AppState>,
    Path((session_id, player_id)): Path<(String, String)>,
) -> Result<Json<SessionView>, AppError> {
    let session = state
        .game_service
        .remove_player(&session_id, &player_id)
        .await?;
    info!(player_id = %player_id, remaining = session.players.len(), "Player removed");
    Ok(Json(session))
}

/// POST /api/sessions/:session_id/lobby/roll
#[instrument(name = "roll_lobby_d20", skip(state))]
pub async fn roll_lobby_d20(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<PlayerActionRequest>,
) -> Result<Json<LobbyRollResponse>, AppError> {
    let roll = state
        .game_service
        .roll_lobby_d20(&session_id, &request.player_id)
        .await?;
    Ok(Json(roll))
}

/// HTTP handler for the current player's movement roll
///
/// POST /api/sessions/:session_id/turn/roll
#[instrument(name = "roll_d6", skip(state))]
pub async fn roll_d6(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<PlayerActionRequest>,
) -> Result<Json<MoveOutcome>, AppError> {
    let outcome = state
        .game_service
        .roll_d6(&session_id, &request.player_id)
        .await?;
    info!(
        dice_roll = ?outcome.dice_roll,
        position = %outcome.position_node_id,
        turn_status = %outcome.turn_status,
        "Dice rolled"
    );
    Ok(Json(outcome))
}

/// POST /api/sessions/:session_id/turn/path
#[instrument(name = "choose_path", skip(state))]
pub async fn choose_path(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<ChoosePathRequest>,
) -> Result<Json<MoveOutcome>, AppError> {
    let outcome = state
        .game_service
        .choose_path(&session_id, &request.player_id, &request.to_node_id)
        .await?;
    Ok(Json(outcome))
}

/// HTTP handler for playing a special card
///
/// POST /api/sessions/:session_id/turn/special
/// A BOOST from a fork without a destination answers 409 with the fork options
#[instrument(name = "apply_special_card", skip(state))]
pub async fn apply_special_card(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<SpecialCardRequest>,
) -> Result<Response, AppError> {
    let outcome = state
        .game_service
        .apply_special_card(&session_id, &request)
        .await?;

    if outcome.need_choice {
        info!(fork_node_id = ?outcome.fork_node_id, "Boost needs a destination");
        return Ok((StatusCode::CONFLICT, Json(outcome)).into_response());
    }
    Ok(Json(outcome).into_response())
}

/// POST /api/sessions/:session_id/turn/confirm
#[instrument(name = "confirm_turn_handover", skip(state))]
pub async fn confirm_turn_handover(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<PlayerActionRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = state
        .game_service
        .confirm_turn_handover(&session_id, &request.player_id)
        .await?;
    Ok(Json(session))
}

/// POST /api/sessions/:session_id/challenge
#[instrument(name = "start_challenge", skip(state))]
pub async fn start_challenge(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<StartChallengeRequest>,
) -> Result<Json<ChallengeResponse>, AppError> {
    let challenge = state
        .game_service
        .start_challenge(&session_id, &request.player_id, request.category)
        .await?;
    Ok(Json(challenge))
}

/// POST /api/sessions/:session_id/score
#[instrument(name = "submit_score", skip(state))]
pub async fn submit_score(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ValidatedJson(request): ValidatedJson<SubmitScoreRequest>,
) -> Result<Json<ScoreResponse>, AppError> {
    let score = state
        .game_service
        .submit_score(
            &session_id,
            &request.player_id,
            &request.challenge_id,
            request.points,
        )
        .await?;
    Ok(Json(score))
}

/// GET /api/sessions/:session_id/leaderboard
#[instrument(name = "leaderboard", skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    Ok(Json(state.game_service.leaderboard(&session_id).await?))
}
