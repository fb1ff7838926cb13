use codeconquer::{
    build_router,
    board::BoardGraph,
    event::EventBus,
    game::{start_cleanup_task, CleanupConfig, GameService},
    AppState, ServerConfig, Storage,
};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "codeconquer=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Server stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    info!("Starting CodeConquer game server");
    let config = ServerConfig::from_env()?;

    // A broken board is fatal, sessions cannot be played on it
    let board = match &config.board_path {
        Some(path) => BoardGraph::from_file(path)?,
        None => BoardGraph::default_board()?,
    };
    info!(
        nodes = board.definition().nodes.len(),
        start = %board.start_node_id(),
        finish = %board.finish_node_id(),
        "Board loaded"
    );

    let storage = Storage::connect(config.database_url.as_deref()).await?;

    let game_service = Arc::new(GameService::new(
        Arc::new(board),
        config.rules,
        storage.sessions,
        storage.events,
        EventBus::new(),
    ));
    tokio::spawn(start_cleanup_task(
        Arc::clone(&game_service),
        CleanupConfig::default(),
    ));
    let app_state = AppState::new(game_service);
    let app = build_router(app_state, config.cors_allowed_origins.as_deref());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(
        bind_addr = %config.bind_addr,
        special_landing = %config.rules.special_landing,
        turn_handover = %config.rules.turn_handover,
        "Server running"
    );
    axum::serve(listener, app).await?;
    Ok(())
}
