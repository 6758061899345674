//! Notion backend against a local stand-in for the REST API.

use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{patch, post};
use axum::{Json, Router};
use bookmark_storage::{MessageMetadata, NotionStorage, ProcessedMessage, RecordUpdate, Storage, StorageError};
use chrono::Utc;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct Recorded {
    requests: Arc<Mutex<Vec<(String, Value)>>>,
}

async fn create_page(State(rec): State<Recorded>, headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
    let version = headers
        .get("Notion-Version")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    rec.requests
        .lock()
        .unwrap()
        .push((format!("POST pages {}", version), body));
    Json(json!({"id": "page-123"}))
}

async fn patch_page(
    State(rec): State<Recorded>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if id == "missing" {
        return Err(StatusCode::NOT_FOUND);
    }
    rec.requests.lock().unwrap().push((format!("PATCH {}", id), body));
    Ok(Json(json!({"id": id})))
}

async fn get_page(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    match id.as_str() {
        "page-123" => Ok(Json(json!({"id": id, "properties": {"Category": {"select": {"name": "Learning Notes"}}}}))),
        "broken" => Err(StatusCode::INTERNAL_SERVER_ERROR),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn spawn_server() -> (String, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/v1/pages", post(create_page))
        .route("/v1/pages/:id", patch(patch_page).get(get_page))
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/v1", addr), recorded)
}

fn message() -> ProcessedMessage {
    ProcessedMessage {
        user_id: 5,
        user_username: Some("bob".into()),
        message_id: 99,
        chat_id: 5,
        timestamp: Utc::now(),
        content: "body".into(),
        summary: "short".into(),
        category: "Learning Notes".into(),
        tags: vec!["a".into()],
        keywords: vec![],
        embedding: None,
        metadata: MessageMetadata::default(),
    }
}

#[tokio::test]
async fn test_save_update_delete() {
    let (base, recorded) = spawn_server().await;
    let storage = NotionStorage::new("secret", "db-1", &base);

    let id = storage.save(&message()).await.unwrap();
    assert_eq!(id, "page-123");

    assert!(storage.update(&id, &RecordUpdate::tags(vec!["b".into()])).await.unwrap());
    assert!(storage.delete(&id).await.unwrap());
    assert!(!storage.delete("missing").await.unwrap());

    let requests = recorded.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].0, "POST pages 2022-06-28");
    assert_eq!(requests[0].1["parent"]["database_id"], "db-1");
    assert_eq!(requests[0].1["properties"]["Title"]["title"][0]["text"]["content"], "short");
    assert_eq!(requests[1].1["properties"]["Tags"]["multi_select"][0]["name"], "b");
    assert_eq!(requests[2].1, json!({"archived": true}));
}

#[tokio::test]
async fn test_get_maps_statuses() {
    let (base, _) = spawn_server().await;
    let storage = NotionStorage::new("secret", "db-1", &base);

    let entry = storage.get("page-123").await.unwrap();
    assert_eq!(entry.properties["Category"]["select"]["name"], "Learning Notes");

    assert!(matches!(storage.get("nope").await, Err(StorageError::NotFound(_))));
    assert!(matches!(
        storage.get("broken").await,
        Err(StorageError::Api { status: 500, .. })
    ));
}
