//! Backend API and supervisor tests
//!
//! The backend is played by a local axum server; the supervised process is a
//! plain shell command.

use agisfl_core::backend::{BackendApi, BackendConfig, BackendSupervisor, Readiness};
use agisfl_core::AgisError;
use axum::{http::StatusCode, routing::get, Json, Router};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::time::Duration;

async fn spawn_backend(ready: bool) -> SocketAddr {
    let app = Router::new()
        .route("/healthz", get(|| async { Json(json!({"status": "ok"})) }))
        .route(
            "/readyz",
            get(move || async move {
                if ready {
                    (StatusCode::OK, Json(json!({"status": "ready"})))
                } else {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({"status": "not ready"})),
                    )
                }
            }),
        )
        .route(
            "/api/dashboard",
            get(|| async {
                Json(json!({
                    "overview": {
                        "system_health": 95,
                        "security_score": 92,
                        "fl_accuracy": 0.94,
                        "active_threats": 2,
                        "uptime_hours": 1.5
                    },
                    "system": {"cpu_percent": 12.5},
                    "federated_learning": {"accuracy": 0.94},
                    "intrusion_detection": {"recent_threats": [{"id": "t-1"}, {"id": "t-2"}]},
                    "timestamp": "2026-10-16T08:30:00+00:00",
                    "version": "2.0.0",
                    "environment": "test"
                }))
            }),
        );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn api(addr: SocketAddr) -> BackendApi {
    BackendApi::new(&format!("http://{}", addr), Duration::from_secs(5)).unwrap()
}

// =============================================================================
// BackendApi
// =============================================================================

#[tokio::test]
async fn probes_report_liveness_and_readiness() {
    let ready = api(spawn_backend(true).await);
    assert!(ready.healthz().await.is_ok());
    assert_eq!(ready.readyz().await.unwrap(), Readiness::Ready);

    let starting = api(spawn_backend(false).await);
    assert!(starting.healthz().await.is_ok());
    assert_eq!(starting.readyz().await.unwrap(), Readiness::NotReady);
}

#[tokio::test]
async fn dashboard_snapshot_is_decoded() {
    let api = api(spawn_backend(true).await);
    let snap = api.dashboard().await.unwrap();

    assert_eq!(snap.overview.active_threats, 2);
    assert_eq!(snap.overview.fl_accuracy, 0.94);
    assert_eq!(snap.system["cpu_percent"], 12.5);
    assert_eq!(snap.environment.as_deref(), Some("test"));
}

#[tokio::test]
async fn missing_endpoint_is_backend_error() {
    let api = BackendApi::new(
        &format!("http://{}/nowhere", spawn_backend(true).await),
        Duration::from_secs(5),
    )
    .unwrap();
    assert!(matches!(api.healthz().await, Err(AgisError::Backend(_))));
    assert!(matches!(api.dashboard().await, Err(AgisError::Backend(_))));
}

#[tokio::test]
async fn unreachable_backend_is_http_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    assert!(matches!(api(addr).healthz().await, Err(AgisError::Http(_))));
}

// =============================================================================
// BackendSupervisor
// =============================================================================

#[cfg(unix)]
#[tokio::test]
async fn supervisor_starts_waits_and_stops() {
    let addr = spawn_backend(true).await;
    let config = BackendConfig::new("sh").with_args(["-c", "echo backend up; sleep 30"]);
    let mut sup = BackendSupervisor::new(config);

    sup.start().unwrap();
    assert!(sup.is_running());
    assert!(sup.pid().is_some());

    sup.wait_ready(&api(addr)).await.unwrap();

    sup.stop().await.unwrap();
    assert!(!sup.is_running());
    assert!(sup.pid().is_none());

    // second stop is a no-op
    sup.stop().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn wait_ready_holds_until_readiness_probe_passes() {
    // live but still starting: /healthz ok, /readyz 503
    let addr = spawn_backend(false).await;
    let mut config = BackendConfig::new("sh").with_args(["-c", "sleep 30"]);
    config.startup_timeout_ms = 300;
    config.poll_interval_ms = 20;
    let mut sup = BackendSupervisor::new(config);
    sup.start().unwrap();

    let err = sup.wait_ready(&api(addr)).await.unwrap_err();
    assert!(matches!(err, AgisError::Backend(_)));
    assert!(err.to_string().contains("not ready"));
    assert!(sup.is_running());

    sup.stop().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn wait_ready_accepts_unbounded_startup_timeout() {
    let addr = spawn_backend(true).await;
    let mut config = BackendConfig::new("sh").with_args(["-c", "sleep 30"]);
    config.startup_timeout_ms = u64::MAX;
    let mut sup = BackendSupervisor::new(config);
    sup.start().unwrap();

    sup.wait_ready(&api(addr)).await.unwrap();

    sup.stop().await.unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn wait_ready_fails_when_process_exits() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = BackendConfig::new("sh").with_args(["-c", "exit 3"]);
    config.poll_interval_ms = 20;
    let mut sup = BackendSupervisor::new(config);
    sup.start().unwrap();

    let err = sup.wait_ready(&api(addr)).await.unwrap_err();
    assert!(matches!(err, AgisError::Backend(_)));
    assert!(!sup.is_running());
}

#[cfg(unix)]
#[tokio::test]
async fn wait_ready_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let mut config = BackendConfig::new("sh").with_args(["-c", "sleep 30"]);
    config.startup_timeout_ms = 200;
    config.poll_interval_ms = 20;
    let mut sup = BackendSupervisor::new(config);
    sup.start().unwrap();

    let err = sup.wait_ready(&api(addr)).await.unwrap_err();
    assert!(err.to_string().contains("not ready"));

    sup.stop().await.unwrap();
}
