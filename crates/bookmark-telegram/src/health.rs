//! Liveness endpoint and the client check behind `--healthcheck`.
//!
//! `GET /health` answers 200 while the dispatcher is running and 503 while
//! it is starting or after it stopped. The check treats anything but a 200
//! with status `ok` as unhealthy, so a container health check fails when the
//! bot is down.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use crate::error::{Result, TelegramError};

/// Health check request timeout.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Lifecycle of the bot process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum HealthStatus {
    Starting = 0,
    Ok = 1,
    Stopped = 2,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ok => "ok",
            Self::Stopped => "stopped",
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Ok,
            2 => Self::Stopped,
            _ => Self::Starting,
        }
    }
}

/// Liveness data shared between the bot and the health server.
#[derive(Debug)]
pub struct HealthState {
    /// The current `HealthStatus` as its discriminant.
    status: AtomicU8,
    /// The process start time.
    started: Instant,
    /// The run mode, `polling` or `webhook`.
    mode: String,
    /// The number of messages processed.
    processed: AtomicU64,
}

impl HealthState {
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            status: AtomicU8::new(HealthStatus::Starting as u8),
            started: Instant::now(),
            mode: mode.into(),
            processed: AtomicU64::new(0),
        }
    }

    pub fn set_status(&self, status: HealthStatus) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    pub fn status(&self) -> HealthStatus {
        HealthStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    pub fn record_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub mode: String,
    pub processed: u64,
}

/// Build the health router.
pub fn router(state: Arc<HealthState>) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

async fn health(State(state): State<Arc<HealthState>>) -> (StatusCode, Json<HealthResponse>) {
    let status = state.status();
    let code = if status == HealthStatus::Ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(HealthResponse {
            status: status.as_str().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: state.uptime_seconds(),
            mode: state.mode.clone(),
            processed: state.processed(),
        }),
    )
}

/// Serve the health endpoint on all interfaces.
pub async fn serve(port: u16, state: Arc<HealthState>) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    serve_on(listener, state).await
}

/// Serve the health endpoint on an already bound listener.
pub async fn serve_on(listener: TcpListener, state: Arc<HealthState>) -> std::io::Result<()> {
    info!(addr = ?listener.local_addr().ok(), "Health server listening");
    axum::serve(listener, router(state)).await
}

/// Check a running instance on localhost.
///
/// Connection failures, timeouts and unreadable bodies all count as unhealthy.
pub async fn check_health(port: u16) -> Result<HealthResponse> {
    let client = reqwest::Client::builder().timeout(CHECK_TIMEOUT).build()?;
    let response = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .map_err(unhealthy)?;

    let code = response.status();
    let body: HealthResponse = response.json().await.map_err(unhealthy)?;

    if !code.is_success() || body.status != HealthStatus::Ok.as_str() {
        return Err(TelegramError::Unhealthy(format!("HTTP {} status {}", code.as_u16(), body.status)));
    }
    Ok(body)
}

fn unhealthy(e: reqwest::Error) -> TelegramError {
    TelegramError::Unhealthy(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    #[tokio::test]
    async fn test_health_starting_is_unavailable() {
        let state = Arc::new(HealthState::new("polling"));
        let server = TestServer::new(router(Arc::clone(&state))).unwrap();

        let response = server.get("/health").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let body: HealthResponse = response.json();
        assert_eq!(body.status, "starting");
        assert_eq!(body.mode, "polling");
    }

    #[tokio::test]
    async fn test_health_ok_reports_processed() {
        let state = Arc::new(HealthState::new("webhook"));
        state.set_status(HealthStatus::Ok);
        state.record_processed();
        state.record_processed();
        let server = TestServer::new(router(Arc::clone(&state))).unwrap();

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body: HealthResponse = response.json();
        assert_eq!(body.status, "ok");
        assert_eq!(body.processed, 2);
        assert!(!body.version.is_empty());
    }

    #[tokio::test]
    async fn test_health_stopped_is_unavailable() {
        let state = Arc::new(HealthState::new("polling"));
        state.set_status(HealthStatus::Stopped);
        let server = TestServer::new(router(state)).unwrap();

        server
            .get("/health")
            .await
            .assert_status(StatusCode::SERVICE_UNAVAILABLE);
    }
}
