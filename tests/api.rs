use std::{sync::Arc, time::Duration};

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use timer_deck::{
    create_router,
    services::{LogNotifier, MemoryStore},
    state::AppState,
};

fn setup() -> (Router, Arc<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let (state, writer) = AppState::new(store.clone(), Arc::new(LogNotifier), Duration::from_secs(5));
    tokio::spawn(writer.run());
    let state = Arc::new(state);
    (create_router(Arc::clone(&state)), state, store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn add(app: &Router, name: &str, duration: Value, category: &str) -> (StatusCode, Value) {
    send(
        app,
        "POST",
        "/timers",
        Some(json!({ "name": name, "duration": duration, "category": category, "halfwayAlert": true })),
    )
    .await
}

#[tokio::test]
async fn add_timer_creates_idle_timer() {
    let (app, _, _) = setup();

    let (status, body) = add(&app, "Focus", json!("25"), "Work").await;
    assert_eq!(status, StatusCode::CREATED);
    let timer = &body["timer"];
    assert_eq!(timer["status"], "idle");
    assert_eq!(timer["duration"], 1500);
    assert_eq!(timer["remainingTime"], 1500);
    assert_eq!(timer["halfwayAlert"], true);

    let (status, body) = send(&app, "GET", "/timers", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timers"].as_array().unwrap().len(), 1);

    let (_, body) = send(&app, "GET", "/categories", None).await;
    assert_eq!(body["categories"], json!([{ "name": "Work", "expanded": true }]));
}

#[tokio::test]
async fn add_timer_rejects_malformed_duration() {
    let (app, _, _) = setup();

    for duration in [
        json!("soon"),
        json!(0),
        json!(-3),
        json!(2.5),
        Value::Null,
        json!(true),
    ] {
        let (status, body) = add(&app, "Bad", duration, "Work").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));
    }
    let (status, _) = add(&app, "", json!(5), "Work").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = json!({ "name": "Bad", "category": "Work" });
    let (status, body) = send(&app, "POST", "/timers", Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));

    // Bodies that are not a JSON object at all get the same error shape
    let (status, body) = send(&app, "POST", "/timers", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid input"));

    let (_, body) = send(&app, "GET", "/timers", None).await;
    assert!(body["timers"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn single_timer_actions() {
    let (app, _, _) = setup();
    let (_, body) = add(&app, "Tea", json!(3), "Kitchen").await;
    let id = body["timer"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "POST", &format!("/timers/{}/start", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["status"], "running");

    let (_, body) = send(&app, "POST", &format!("/timers/{}/pause", id), None).await;
    assert_eq!(body["timer"]["status"], "paused");

    let (_, body) = send(&app, "POST", &format!("/timers/{}/reset", id), None).await;
    assert_eq!(body["timer"]["status"], "idle");
    assert_eq!(body["timer"]["remainingTime"], 180);

    let (status, _) = send(&app, "POST", &format!("/timers/{}/explode", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = uuid::Uuid::new_v4();
    let (status, _) = send(&app, "POST", &format!("/timers/{}/start", missing), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bulk_pause_only_touches_its_category() {
    let (app, _, _) = setup();
    let (_, work) = add(&app, "Report", json!(30), "Work").await;
    let (_, home) = add(&app, "Laundry", json!(45), "Home").await;

    send(&app, "POST", "/categories/Work/bulk/start", None).await;
    send(&app, "POST", "/categories/Home/bulk/start", None).await;

    let (status, body) = send(&app, "POST", "/categories/Work/bulk/pause", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["changed"], 1);
    assert_eq!(body["timers"][0]["id"], work["timer"]["id"]);
    assert_eq!(body["timers"][0]["status"], "paused");

    let (_, body) = send(&app, "GET", "/timers", None).await;
    let home_now = body["timers"]
        .as_array()
        .unwrap()
        .iter()
        .find(|t| t["id"] == home["timer"]["id"])
        .unwrap();
    assert_eq!(home_now["status"], "running");
}

#[tokio::test]
async fn toggle_category_flips_expanded() {
    let (app, _, _) = setup();
    add(&app, "Run", json!(20), "Health").await;

    let (status, body) = send(&app, "POST", "/categories/Health/toggle", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["categories"][0]["expanded"], false);

    let (status, _) = send(&app, "POST", "/categories/Nope/toggle", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn completed_timer_shows_up_in_history_until_cleared() {
    let (app, state, store) = setup();
    let (_, body) = add(&app, "Plank", json!(1), "Health").await;
    let id = body["timer"]["id"].as_str().unwrap().to_string();
    send(&app, "POST", &format!("/timers/{}/start", id), None).await;

    for _ in 0..60 {
        state.tick(Utc::now()).unwrap();
    }

    let (status, body) = send(&app, "GET", "/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], id.as_str());
    assert_eq!(records[0]["timerName"], "Plank");
    assert_eq!(records[0]["category"], "Health");

    let (_, body) = send(&app, "GET", "/timers", None).await;
    assert_eq!(body["timers"][0]["status"], "completed");
    assert_eq!(body["timers"][0]["remainingTime"], 0);

    let (status, _) = send(&app, "DELETE", "/history", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, body) = send(&app, "GET", "/history", None).await;
    assert!(body["records"].as_array().unwrap().is_empty());

    use timer_deck::services::TimerStore;
    assert_eq!(store.load_timers().unwrap()[0].remaining_time, 0);
}

#[tokio::test]
async fn failing_store_does_not_block_commands() {
    let (app, _, store) = setup();
    store.set_fail_writes(true);

    let (status, body) = add(&app, "Offline", json!(2), "Work").await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["timer"]["id"].as_str().unwrap().to_string();
    let (status, body) = send(&app, "POST", &format!("/timers/{}/start", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timer"]["status"], "running");

    let (status, _) = send(&app, "DELETE", "/history", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_reports_ok() {
    let (app, _, _) = setup();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
