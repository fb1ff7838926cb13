use axum::{
    body::Body,
    http::{Request, StatusCode},
    response::Response,
    Router,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

use codeconquer::{
    build_router,
    event::{EventBus, GameEvent, InMemoryEventFeed},
    game::{
        types::{ChallengeResponse, MoveOutcome, PlayerView, ScoreResponse, SessionView},
        GameService, InMemorySessionRepository, ScriptedDice,
    },
    AppState, GameRules,
};

mod utils;

use utils::boards::track_board;

fn app(dice: Arc<ScriptedDice>, cors: Option<Vec<String>>) -> Router {
    let service = GameService::new(
        Arc::new(track_board()),
        GameRules::default(),
        Arc::new(InMemorySessionRepository::new()),
        Arc::new(InMemoryEventFeed::new()),
        EventBus::new(),
    )
    .with_dice(dice);
    build_router(AppState::new(Arc::new(service)), cors.as_deref())
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    app.clone().oneshot(request).await.unwrap()
}

async fn read<T: DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_and_board() {
    let app = app(Arc::new(ScriptedDice::default()), None);

    let response = call(&app, "GET", "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = call(&app, "GET", "/api/board", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let board: Value = read(response).await;
    assert_eq!(board["nodes"].as_array().unwrap().len(), 8);
    assert_eq!(board["jail_node_id"], "j");
    assert!(board["edges"]
        .as_array()
        .unwrap()
        .iter()
        .any(|e| e["from"] == "j" && e["to"] == "d"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = app(Arc::new(ScriptedDice::default()), None);
    let response = call(&app, "GET", "/api/nothing-here", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_full_turn_over_http() {
    let dice = Arc::new(ScriptedDice::new([20, 10, 1]));
    let app = app(dice, None);

    let session: SessionView = read(call(&app, "POST", "/api/sessions", None).await).await;
    let sid = session.session_id.clone();

    let found: SessionView = read(
        call(&app, "GET", &format!("/api/sessions/code/{}", session.code), None).await,
    )
    .await;
    assert_eq!(found.session_id, sid);

    let mut ids = Vec::new();
    for name in ["alice", "bob"] {
        let player: PlayerView = read(
            call(
                &app,
                "POST",
                &format!("/api/sessions/{}/players", sid),
                Some(json!({ "name": name, "icon": "robot" })),
            )
            .await,
        )
        .await;
        assert_eq!(player.icon, "robot");
        ids.push(player.id);
    }
    for id in &ids {
        let response = call(
            &app,
            "POST",
            &format!("/api/sessions/{}/lobby/roll", sid),
            Some(json!({ "player_id": id })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    for id in &ids {
        let response = call(
            &app,
            "POST",
            &format!("/api/sessions/{}/players/{}/ready", sid, id),
            Some(json!({ "ready": true })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let outcome: MoveOutcome = read(
        call(
            &app,
            "POST",
            &format!("/api/sessions/{}/turn/roll", sid),
            Some(json!({ "player_id": ids[0] })),
        )
        .await,
    )
    .await;
    assert_eq!(outcome.position_node_id, "a");

    let challenge: ChallengeResponse = read(
        call(
            &app,
            "POST",
            &format!("/api/sessions/{}/challenge", sid),
            Some(json!({ "player_id": ids[0], "category": "GRAPH_PATH" })),
        )
        .await,
    )
    .await;
    assert_eq!(challenge.params.level, 1);
    assert_eq!(challenge.base_points, 5);

    let score: ScoreResponse = read(
        call(
            &app,
            "POST",
            &format!("/api/sessions/{}/score", sid),
            Some(json!({
                "player_id": ids[0],
                "challenge_id": challenge.challenge_id,
                "points": 5
            })),
        )
        .await,
    )
    .await;
    assert_eq!(score.total_score, 5);

    let leaderboard: Value = read(
        call(&app, "GET", &format!("/api/sessions/{}/leaderboard", sid), None).await,
    )
    .await;
    assert_eq!(leaderboard[0]["name"], "alice");
    assert_eq!(leaderboard[0]["total_score"], 5);

    let events: Vec<GameEvent> = read(
        call(
            &app,
            "GET",
            &format!("/api/sessions/{}/events?limit=3", sid),
            None,
        )
        .await,
    )
    .await;
    assert_eq!(events.len(), 3);
    assert!(events.windows(2).all(|w| w[1].seq == w[0].seq + 1));
    assert_eq!(events[2].message, "It's bob's turn");
}

#[tokio::test]
async fn test_error_body_and_status() {
    let app = app(Arc::new(ScriptedDice::default()), None);
    let session: SessionView = read(call(&app, "POST", "/api/sessions", None).await).await;

    let response = call(
        &app,
        "POST",
        &format!("/api/sessions/{}/turn/roll", session.session_id),
        Some(json!({ "player_id": "nobody" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = read(response).await;
    assert!(body["error"].as_str().unwrap().contains("nobody"));

    let response = call(
        &app,
        "POST",
        &format!("/api/sessions/{}/players", session.session_id),
        Some(json!({ "name": "alice" })),
    )
    .await;
    let alice: PlayerView = read(response).await;

    let response = call(
        &app,
        "POST",
        &format!("/api/sessions/{}/turn/roll", session.session_id),
        Some(json!({ "player_id": alice.id })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::LOCKED);
    let body: Value = read(response).await;
    assert_eq!(body["error"], "Locked: Game has not started");
}

#[tokio::test]
async fn test_cors_allows_configured_origin() {
    let app = app(
        Arc::new(ScriptedDice::default()),
        Some(vec!["http://localhost:5173".to_string()]),
    );

    let request = Request::builder()
        .method("GET")
        .uri("/api/board")
        .header("origin", "http://localhost:5173")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .unwrap(),
        "http://localhost:5173"
    );

    let request = Request::builder()
        .method("GET")
        .uri("/api/board")
        .header("origin", "http://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert!(response
        .headers()
        .get("access-control-allow-origin")
        .is_none());
}
