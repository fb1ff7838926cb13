use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
    Json,
};
use futures::stream::StreamExt;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, instrument, warn};

use super::GameEvent;
use crate::game::types::EventsQuery;
use crate::shared::{AppError, AppState};

/// HTTP handler for polling a session's event feed
///
/// GET /api/sessions/:session_id/events?after_seq=N&limit=M
/// With `after_seq` returns newer events oldest first, otherwise the latest ones
#[instrument(name = "list_events", skip(state))]
pub async fn list_events(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<EventsQuery>,
) -> Result<Json<Vec<GameEvent>>, AppError> {
    let events = state
        .game_service
        .events(&session_id, query.after_seq, query.limit)
        .await?;
    debug!(count = events.len(), "Events listed");
    Ok(Json(events))
}

/// WebSocket upgrade handler streaming a session's events as they are committed
///
/// GET /api/sessions/:session_id/events/ws
#[instrument(name = "events_websocket", skip(state, ws))]
pub async fn events_websocket(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<Response, AppError> {
    let receiver = state.game_service.subscribe(&session_id).await?;
    info!(session_id = %session_id, "Event stream connection established");
    Ok(ws.on_upgrade(move |socket| stream_events(socket, session_id, receiver)))
}

async fn stream_events(
    mut socket: WebSocket,
    session_id: String,
    mut receiver: broadcast::Receiver<GameEvent>,
) {
    loop {
        tokio::select! {
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(session_id = %session_id, error = %e, "Event stream receive failed");
                    break;
                }
                // Clients only listen
                Some(Ok(_)) => {}
            },
            event = receiver.recv() => match event {
                Ok(event) => {
                    let text = match serde_json::to_string(&event) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(session_id = %session_id, skipped, "Event stream lagged, clients can catch up from the feed");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    info!(session_id = %session_id, "Event stream closed");
}
