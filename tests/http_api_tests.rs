#![cfg(feature = "http_api")]

use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use chrono::NaiveDate;
use serde_json::{Value, json};
use shop_scheduler::{
    HolidayConfig, MemoryQueueStore, QueueStore, Scheduler, SchedulerConfig, WorkItem, Worker,
    http_api,
};
use tower::util::ServiceExt;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn new_router() -> (axum::Router, Arc<MemoryQueueStore>) {
    let items = vec![
        WorkItem::new(1, 1, "cut", 8.0).starting(d(2025, 1, 6)),
        WorkItem::new(2, 1, "bend", 8.0).starting(d(2025, 1, 7)),
    ];
    let mut scheduler = Scheduler::from_parts(
        SchedulerConfig::default(),
        vec![Worker::new(1, "Ana"), Worker::new(2, "Bo")],
        items,
        HolidayConfig::default().with_standard("Independence Day"),
        Some(d(2025, 1, 6)),
    )
    .unwrap();
    scheduler.resequence_all().unwrap();
    let store = Arc::new(MemoryQueueStore::new());
    let state = http_api::AppState::new(scheduler, store.clone());
    (http_api::router(state), store)
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_and_roster() {
    let (app, _) = new_router();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");

    let (status, body) = send(&app, "GET", "/workers", None).await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|worker| worker["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Unassigned", "Ana", "Bo"]);
}

#[tokio::test]
async fn queue_and_item_lookups() {
    let (app, _) = new_router();
    let (status, body) = send(&app, "GET", "/workers/1/queue", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
    assert_eq!(body[1]["start_date"], "2025-01-07");

    let (status, body) = send(&app, "GET", "/items/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "bend");

    let (status, body) = send(&app, "GET", "/items/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");

    let (status, _) = send(&app, "GET", "/workers/42/queue", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn timeline_positions_bars() {
    let (app, _) = new_router();
    let (status, body) = send(&app, "GET", "/timeline?chart_start=2025-01-06", None).await;
    assert_eq!(status, StatusCode::OK);
    let bars = body.as_array().unwrap();
    assert_eq!(bars.len(), 2);
    assert_eq!(bars[1]["x_px"], 32.0);
    assert_eq!(bars[1]["width_px"], 32.0);
}

#[tokio::test]
async fn calendar_probe_explains_holidays() {
    let (app, _) = new_router();
    let (status, body) = send(&app, "GET", "/calendar/1/2025-07-04", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workday"], false);
    assert_eq!(body["next_workday"], "2025-07-07");
}

#[tokio::test]
async fn changes_commit_and_persist() {
    let (app, store) = new_router();
    let payload = json!({
        "changes": [
            {
                "kind": "add_item",
                "id": 3,
                "worker_id": 1,
                "name": "weld",
                "start_date": "2025-01-06",
                "nominal_hours": 8.0
            }
        ]
    });
    let (status, body) = send(&app, "POST", "/changes", Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["resequenced"], json!([1]));
    assert_eq!(store.stored_queue(1).unwrap().len(), 3);

    let (_, queue) = send(&app, "GET", "/workers/1/queue", None).await;
    let ids: Vec<i64> = queue
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![3, 1, 2]);
}

#[tokio::test]
async fn conflicting_changes_need_acknowledge_flag() {
    let (app, store) = new_router();
    let payload = json!({
        "changes": [
            {"kind": "update_worker", "id": 1, "name": "Ana", "can_schedule": false},
            {"kind": "update_worker", "id": 2, "name": "Bob"}
        ]
    });
    let (status, body) = send(&app, "POST", "/changes", Some(payload.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflicts"][0]["worker_name"], "Ana");
    assert!(store.load_roster().unwrap().is_empty());

    let mut acknowledged = payload;
    acknowledged["acknowledge"] = json!(true);
    let (status, body) = send(&app, "POST", "/changes", Some(acknowledged)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reverted"], json!(["Ana"]));

    let (_, workers) = send(&app, "GET", "/workers", None).await;
    assert_eq!(workers[1]["can_schedule"], true);
    assert_eq!(workers[2]["name"], "Bob");
}

#[tokio::test]
async fn invalid_changes_return_field_errors() {
    let (app, _) = new_router();
    let payload = json!({
        "changes": [
            {"kind": "add_item", "id": 9, "worker_id": 1, "name": "", "nominal_hours": -2.0}
        ]
    });
    let (status, body) = send(&app, "POST", "/changes", Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = body["fields"]
        .as_array()
        .unwrap()
        .iter()
        .map(|error| error["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"nominal_hours"));
}

#[tokio::test]
async fn absurd_hours_are_a_field_error() {
    let (app, store) = new_router();
    let payload = json!({
        "changes": [
            {"kind": "add_item", "id": 9, "worker_id": 1, "name": "forever", "nominal_hours": 1.0e9}
        ]
    });
    let (status, body) = send(&app, "POST", "/changes", Some(payload)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["fields"][0]["field"], "nominal_hours");
    assert!(store.queue_writes().unwrap().is_empty());

    let (status, _) = send(&app, "GET", "/items/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn persistence_failure_is_a_server_error() {
    let (app, store) = new_router();
    store.fail_queue_writes_for(2).unwrap();
    let payload = json!({
        "changes": [
            {"kind": "drag", "item_id": 1, "worker_id": 2, "start_date": "2025-01-06"}
        ]
    });
    let (status, body) = send(&app, "POST", "/changes", Some(payload)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["persisted"], json!([1]));
}
