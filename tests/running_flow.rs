use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use running_mate_back::{
    config::AppConfig, dao::run_store::MemoryRunStore, routes, state::AppState,
};
use serde_json::{Value, json};
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
use tower::ServiceExt;

fn app() -> Router {
    let state = AppState::new(Arc::new(MemoryRunStore::new()), AppConfig::default());
    routes::router(state)
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header("X-Session-Token", token);
    }
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn register(app: &Router, nickname: &str) -> String {
    let (status, body) = call(
        app,
        "POST",
        "/users",
        None,
        Some(json!({ "nickname": nickname, "weight_kg": 70.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["session_token"].as_str().unwrap().to_owned()
}

fn timestamp(offset: Duration) -> String {
    (OffsetDateTime::now_utc() + offset).format(&Rfc3339).unwrap()
}

fn group_payload(max_participants: u32) -> Value {
    json!({
        "title": "Evening 5k",
        "tag": "CASUAL",
        "starts_at": timestamp(Duration::hours(1)),
        "ends_at": timestamp(Duration::hours(2)),
        "target_distance_m": 5000,
        "max_participants": max_participants,
    })
}

#[tokio::test]
async fn healthcheck_reports_ok() {
    let app = app();
    let (status, body) = call(&app, "GET", "/healthcheck", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn full_running_session() {
    let app = app();
    let host = register(&app, "host").await;
    let guest = register(&app, "guest").await;

    let (status, created) = call(&app, "POST", "/groups", Some(&host), Some(group_payload(2))).await;
    assert_eq!(status, StatusCode::CREATED);
    let group_id = created["group"]["id"].as_str().unwrap().to_owned();
    let host_record = created["participation"]["record_id"]
        .as_str()
        .unwrap()
        .to_owned();
    assert_eq!(created["group"]["current_participants"], 1);

    let (status, joined) = call(
        &app,
        "POST",
        &format!("/groups/{group_id}/join"),
        Some(&guest),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(joined["rank"], 2);
    let guest_record = joined["record_id"].as_str().unwrap().to_owned();

    let (status, update) = call(
        &app,
        "POST",
        &format!("/records/{guest_record}/updates"),
        Some(&guest),
        Some(json!({ "distance_m": 1200, "elapsed_secs": 420 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(update["rank"], 1);
    assert_eq!(update["movement"], "up");
    assert_eq!(update["commentary"], "You took first place. Hold the lead!");
    assert_eq!(update["live_window"].as_array().unwrap().len(), 3);

    let (status, board) = call(
        &app,
        "GET",
        &format!("/records/{host_record}/leaderboard"),
        Some(&host),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let entries = board["entries"].as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["nickname"], "guest");
    assert_eq!(entries[1]["nickname"], "host");
    assert_eq!(entries[1]["your_record"], true);
    assert_eq!(entries[2]["nickname"], "-");

    let (status, participants) = call(
        &app,
        "GET",
        &format!("/groups/{group_id}/participants"),
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(participants["participants"], json!(["host", "guest"]));

    let (status, _) = call(
        &app,
        "DELETE",
        &format!("/records/{guest_record}"),
        Some(&guest),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, profile) = call(&app, "GET", "/users/me", Some(&host), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["nickname"], "host");
    assert_eq!(profile["sessions"], 1);
}

#[tokio::test]
async fn errors_carry_kind_and_status() {
    let app = app();
    let host = register(&app, "host").await;
    let late = register(&app, "late").await;

    let (status, body) = call(&app, "POST", "/groups", None, Some(group_payload(1))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["kind"], "auth_required");

    let (status, body) = call(&app, "POST", "/groups", Some(&host), Some(group_payload(0))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");

    let (_, created) = call(&app, "POST", "/groups", Some(&host), Some(group_payload(1))).await;
    let group_id = created["group"]["id"].as_str().unwrap().to_owned();

    let (status, body) = call(
        &app,
        "POST",
        &format!("/groups/{group_id}/join"),
        Some(&late),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "capacity_exceeded");

    let (status, body) = call(&app, "POST", "/groups/quick/join", Some(&late), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");

    let (status, body) = call(
        &app,
        "POST",
        "/users",
        None,
        Some(json!({ "nickname": " ", "weight_kg": 70.0 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "invalid_input");
}

#[tokio::test]
async fn upcoming_groups_are_listed_and_filtered() {
    let app = app();
    let host = register(&app, "host").await;
    call(&app, "POST", "/groups", Some(&host), Some(group_payload(4))).await;

    let (status, listed) = call(&app, "GET", "/groups?tag=CASUAL&q=evening", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 1);

    let (status, listed) = call(&app, "GET", "/groups?tag=MARATHON", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(listed.as_array().unwrap().is_empty());

    let (status, main) = call(&app, "GET", "/groups/main", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(main.as_array().unwrap().len(), 1);
}
