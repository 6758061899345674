//! `--healthcheck` against a live health server.

use std::sync::Arc;

use bookmark_telegram::health::{check_health, serve_on};
use bookmark_telegram::{HealthState, HealthStatus, TelegramError};
use tokio::net::TcpListener;

async fn spawn_server(status: HealthStatus) -> (u16, Arc<HealthState>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let state = Arc::new(HealthState::new("polling"));
    state.set_status(status);

    let server_state = Arc::clone(&state);
    tokio::spawn(async move {
        let _ = serve_on(listener, server_state).await;
    });
    (port, state)
}

#[tokio::test]
async fn test_check_running_bot() {
    let (port, state) = spawn_server(HealthStatus::Ok).await;
    state.record_processed();

    let body = check_health(port).await.unwrap();
    assert_eq!(body.status, "ok");
    assert_eq!(body.mode, "polling");
    assert_eq!(body.processed, 1);
}

#[tokio::test]
async fn test_check_starting_bot_is_unhealthy() {
    let (port, _state) = spawn_server(HealthStatus::Starting).await;

    let err = check_health(port).await.unwrap_err();
    assert!(matches!(err, TelegramError::Unhealthy(_)));
}

#[tokio::test]
async fn test_check_nothing_listening_is_unhealthy() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = check_health(port).await.unwrap_err();
    assert!(matches!(err, TelegramError::Unhealthy(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_other_http_failures_are_not_health_failures() {
    let err: TelegramError = reqwest::get("http://127.0.0.1:0/").await.unwrap_err().into();
    assert!(matches!(err, TelegramError::Http(_)));
    assert!(err.to_string().starts_with("HTTP error:"));
}
