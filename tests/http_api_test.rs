//! HTTP router tests driven with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use grid_arena::{Arena, ArenaConfig, server};

fn app() -> Router {
    server::router(Arc::new(Arena::in_memory(ArenaConfig::default())))
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Valid request");

    let response = app.clone().oneshot(request).await.expect("Router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Body readable")
        .to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn user(app: &Router, name: &str) -> i64 {
    let (status, body) = call(app, "POST", "/users", Some(json!({ "name": name }))).await;
    assert_eq!(status, StatusCode::CREATED);
    body["user_id"].as_i64().expect("user_id")
}

async fn started_game(app: &Router, creator: i64, opponent: i64) -> i64 {
    let (status, body) = call(app, "POST", "/game", Some(json!({ "creator_user_id": creator }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let game_id = body["game_id"].as_i64().expect("game_id");
    let (status, _) = call(
        app,
        "POST",
        &format!("/game/{}/join", game_id),
        Some(json!({ "user_id": opponent })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    game_id
}

async fn play(app: &Router, game: i64, user: i64, row: usize, col: usize) -> (StatusCode, Value) {
    call(
        app,
        "POST",
        &format!("/game/{}/move", game),
        Some(json!({ "user_id": user, "row": row, "col": col })),
    )
    .await
}

#[tokio::test]
async fn test_full_game_over_http() {
    let app = app();
    let alice = user(&app, "alice").await;
    let bob = user(&app, "bob").await;
    let game = started_game(&app, alice, bob).await;

    let (status, view) = call(&app, "GET", &format!("/game/{}", game), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "in_progress");
    assert_eq!(view["next_player_id"], alice);
    assert_eq!(view["players"], json!([alice, bob]));

    for (u, row, col) in [(alice, 0, 0), (bob, 1, 1), (alice, 0, 1), (bob, 1, 2)] {
        let (status, _) = play(&app, game, u, row, col).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, view) = play(&app, game, alice, 0, 2).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["status"], "completed");
    assert_eq!(view["winner_id"], alice);
    assert_eq!(view["move_count"], 5);
    assert_eq!(view["board"][0], json!([alice, alice, alice]));
    assert_eq!(view["board"][2], json!([null, null, null]));
    assert_eq!(view["next_player_id"], Value::Null);

    let (status, stats) = call(&app, "GET", &format!("/users/{}/stats", alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["wins"], 1);
    assert_eq!(stats["win_ratio"], 1.0);

    let (status, board) = call(&app, "GET", "/leaderboard", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = board.as_array().expect("array");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["user_id"], alice);
}

#[tokio::test]
async fn test_error_mapping() {
    let app = app();
    let alice = user(&app, "alice").await;
    let bob = user(&app, "bob").await;
    let carol = user(&app, "carol").await;
    let game = started_game(&app, alice, bob).await;

    let (status, body) = play(&app, game, bob, 0, 0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "not_your_turn");

    let (status, body) = play(&app, game, carol, 0, 0).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "not_participant");

    let (status, body) = play(&app, game, alice, 5, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "out_of_bounds");

    play(&app, game, alice, 0, 0).await;
    let (status, body) = play(&app, game, bob, 0, 0).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "cell_occupied");

    let (status, body) = call(
        &app,
        "POST",
        &format!("/game/{}/join", game),
        Some(json!({ "user_id": carol })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "invalid_state");

    let (status, body) = call(&app, "POST", "/game", Some(json!({ "creator_user_id": alice }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let own = body["game_id"].as_i64().expect("game_id");
    let (status, body) = call(
        &app,
        "POST",
        &format!("/game/{}/join", own),
        Some(json!({ "user_id": alice })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "self_join");

    let (status, body) = call(&app, "GET", "/game/12345", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, body) = call(&app, "GET", "/users/12345/stats", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_leaderboard_query_validation() {
    let app = app();
    let (status, body) = call(&app, "GET", "/leaderboard?metric=speed", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unknown_metric");

    let (status, body) = call(&app, "GET", "/leaderboard?metric=efficiency&limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = call(&app, "POST", "/users", Some(json!({ "name": "   " }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_leaderboard_limit() {
    let app = app();
    let mut users = Vec::new();
    for name in ["a", "b", "c", "d", "e"] {
        users.push(user(&app, name).await);
    }
    for pair in users.windows(2) {
        let game = started_game(&app, pair[0], pair[1]).await;
        for (u, row, col) in [(pair[0], 0, 0), (pair[1], 1, 0), (pair[0], 0, 1), (pair[1], 1, 1), (pair[0], 0, 2)] {
            play(&app, game, u, row, col).await;
        }
    }

    let (_, body) = call(&app, "GET", "/leaderboard?metric=wins", None).await;
    assert_eq!(body.as_array().expect("array").len(), 3);
    let (_, body) = call(&app, "GET", "/leaderboard?metric=games_played&limit=10", None).await;
    assert_eq!(body.as_array().expect("array").len(), 5);
}

#[tokio::test]
async fn test_user_name_length_limit() {
    let app = app();
    let longest = "x".repeat(64);
    let (status, body) = call(&app, "POST", "/users", Some(json!({ "name": longest }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["user_id"].is_i64());

    let too_long = "x".repeat(65);
    let (status, body) = call(&app, "POST", "/users", Some(json!({ "name": too_long }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_malformed_requests_are_validation_errors() {
    let app = app();
    let alice = user(&app, "alice").await;
    let bob = user(&app, "bob").await;
    let game = started_game(&app, alice, bob).await;

    let (status, body) = call(
        &app,
        "POST",
        &format!("/game/{}/move", game),
        Some(json!({ "user_id": alice, "row": -1, "col": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
    assert!(body["message"].is_string());

    let (status, body) = call(&app, "POST", "/users", Some(json!({ "nickname": "carol" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = call(&app, "GET", "/game/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, body) = call(&app, "GET", "/leaderboard?limit=many", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");

    let (status, view) = call(&app, "GET", &format!("/game/{}", game), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(view["move_count"], 0);
}
