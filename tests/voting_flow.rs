//! End-to-end flows through the HTTP router against the in-memory backend.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use game_vote_back::{
    config::AppConfig,
    dao::vote_store::memory::MemoryVoteStore,
    routes,
    state::AppState,
};

fn app() -> Router {
    routes::router(AppState::with_store(
        AppConfig::default(),
        Arc::new(MemoryVoteStore::new()),
    ))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        request = request.header("x-user-id", user);
    }
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn votes_flow_into_statistics() {
    let app = app();

    for user in ["alice", "bob", "carol"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/games/mine",
            Some(user),
            Some(json!({ "game": "Chess" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    send(
        &app,
        Method::POST,
        "/games/mine",
        Some("alice"),
        Some(json!({ "game": "Counter-Strike" })),
    )
    .await;

    let (status, _) = send(&app, Method::DELETE, "/games/mine/chess", Some("bob"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, stats) = send(&app, Method::GET, "/stats", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!([
            { "name": "Chess", "votes": 2 },
            { "name": "Counter-Strike", "votes": 1 }
        ])
    );

    let (_, mine) = send(&app, Method::GET, "/games/mine", Some("alice"), None).await;
    assert_eq!(mine, json!(["Chess", "Counter-Strike"]));

    let (_, all) = send(&app, Method::GET, "/games", None, None).await;
    assert_eq!(all, json!(["Chess", "Counter-Strike"]));
}

#[tokio::test]
async fn replace_reports_the_difference() {
    let app = app();

    let (status, first) = send(
        &app,
        Method::PUT,
        "/games/mine",
        Some("alice"),
        Some(json!({ "games": ["A game", "B game"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["added"], 2);

    let (_, second) = send(
        &app,
        Method::PUT,
        "/games/mine",
        Some("alice"),
        Some(json!({ "games": ["b-game", "C game", "   ", "z".repeat(201)] })),
    )
    .await;
    assert_eq!(second["added"], 1);
    assert_eq!(second["removed"], 1);
    assert_eq!(second["skipped"], 2);

    let (_, mine) = send(&app, Method::GET, "/games/mine", Some("alice"), None).await;
    assert_eq!(mine, json!(["B game", "C game"]));

    let (_, stats) = send(&app, Method::GET, "/stats?min_votes=1", None, None).await;
    assert_eq!(stats.as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::PUT,
        "/games/mine",
        Some("alice"),
        Some(json!({ "games": "Chess" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());

    let (status, _) = send(
        &app,
        Method::POST,
        "/games/mine",
        Some("alice"),
        Some(json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/games/mine",
        Some("alice"),
        Some(json!({ "game": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/games/mine", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::DELETE,
        "/games/mine/Nonexistent",
        Some("alice"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn users_round_trip_through_the_directory() {
    let app = app();

    let (status, _) = send(&app, Method::GET, "/users/42", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, saved) = send(
        &app,
        Method::PUT,
        "/users",
        None,
        Some(json!({ "id": "42", "display_name": "Ada", "avatar_ref": "abc123" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(saved["display_name"], "Ada");

    let (_, fetched) = send(&app, Method::GET, "/users/42", None, None).await;
    assert_eq!(fetched["avatar_ref"], "abc123");

    let (status, _) = send(
        &app,
        Method::PUT,
        "/users",
        None,
        Some(json!({ "id": "42", "display_name": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn degraded_mode_answers_service_unavailable() {
    let app = routes::router(AppState::new(AppConfig::default()));

    let (status, _) = send(&app, Method::GET, "/stats", None, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, health) = send(&app, Method::GET, "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
}
