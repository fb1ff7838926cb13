use axum::{extract::State, Json};
use serde::Serialize;
use tracing::{debug, instrument};

use super::{BoardDefinition, BoardGraph};
use crate::shared::AppState;

#[derive(Debug, Serialize)]
pub struct BoardView {
    pub start_node_id: String,
    pub finish_node_id: String,
    pub jail_node_id: Option<String>,
    #[serde(flatten)]
    pub definition: BoardDefinition,
}

impl BoardView {
    pub fn new(board: &BoardGraph) -> Self {
        Self {
            start_node_id: board.start_node_id().to_string(),
            finish_node_id: board.finish_node_id().to_string(),
            jail_node_id: board.jail_node_id().map(str::to_string),
            definition: board.definition().clone(),
        }
    }
}

/// HTTP handler returning the board every session is played on
///
/// GET /api/board
#[instrument(name = "get_board", skip(state))]
pub async fn get_board(State(state): State<AppState>) -> Json<BoardView> {
    let view = BoardView::new(state.game_service.board());
    debug!(
        nodes = view.definition.nodes.len(),
        edges = view.definition.edges.len(),
        "Board served"
    );
    Json(view)
}
