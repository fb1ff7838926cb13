#![allow(dead_code)] // Test utilities may not all be used in every test

use std::sync::Arc;
use tokio::sync::broadcast;

use codeconquer::{
    board::BoardGraph,
    event::{EventBus, GameEvent, InMemoryEventFeed},
    game::{GameService, InMemorySessionRepository, ScriptedDice},
    GameRules,
};

use super::boards::track_board;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub service: Arc<GameService>,
    pub dice: Arc<ScriptedDice>,
    pub repository: Arc<InMemorySessionRepository>,
    pub session_id: String,
    /// (name, player id) in turn order
    pub players: Vec<(String, String)>,
    pub events: broadcast::Receiver<GameEvent>,
}

pub struct TestSetupBuilder {
    players: Vec<String>,
    board: Option<BoardGraph>,
    rules: GameRules,
    started: bool,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            players: vec![],
            board: None,
            rules: GameRules::default(),
            started: true,
        }
    }

    pub fn with_players(mut self, players: Vec<&str>) -> Self {
        self.players = players.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_two_players(self) -> Self {
        self.with_players(vec!["alice", "bob"])
    }

    pub fn with_three_players(self) -> Self {
        self.with_players(vec!["alice", "bob", "carol"])
    }

    pub fn with_board(mut self, board: BoardGraph) -> Self {
        self.board = Some(board);
        self
    }

    pub fn with_rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Players join but nobody rolls or readies up
    pub fn in_lobby(mut self) -> Self {
        self.started = false;
        self
    }

    pub async fn build(self) -> TestSetup {
        let dice = Arc::new(ScriptedDice::default());
        let repository = Arc::new(InMemorySessionRepository::new());
        let service = Arc::new(
            GameService::new(
                Arc::new(self.board.unwrap_or_else(track_board)),
                self.rules,
                repository.clone(),
                Arc::new(InMemoryEventFeed::new()),
                EventBus::new(),
            )
            .with_dice(dice.clone()),
        );

        let session = service.create_session().await.unwrap();
        let session_id = session.session_id;

        let mut players = Vec::new();
        for name in &self.players {
            let player = service
                .register_player(&session_id, name, None)
                .await
                .unwrap();
            players.push((name.clone(), player.id));
        }

        if self.started {
            // Descending d20 rolls keep the join order as the turn order
            for (i, (_, id)) in players.iter().enumerate() {
                dice.push(20 - i as u8);
                service.roll_lobby_d20(&session_id, id).await.unwrap();
            }
            for (_, id) in &players {
                service.set_ready(&session_id, id, true).await.unwrap();
            }
        }

        let events = service.subscribe(&session_id).await.unwrap();

        TestSetup {
            service,
            dice,
            repository,
            session_id,
            players,
            events,
        }
    }
}

impl TestSetup {
    /// Player id by name
    pub fn id(&self, name: &str) -> String {
        self.players
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, id)| id.clone())
            .unwrap_or_else(|| panic!("no player named {}", name))
    }
}
