//! HttpApi and Session against an in-process fake management server.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use vllmtop::{
    api::{ApiError, HttpApi, ServerApi},
    config::Settings,
    prefs::{MemoryPrefs, PreferenceStore},
    session::Session,
    types::ServerState,
};

#[derive(Clone, Default)]
struct Fake {
    hits: Arc<Mutex<Vec<String>>>,
    state: Arc<Mutex<String>>,
}

impl Fake {
    fn hit(&self, what: impl Into<String>) {
        self.hits.lock().unwrap().push(what.into());
    }
}

async fn status(State(f): State<Fake>) -> Json<Value> {
    let state = f.state.lock().unwrap().clone();
    Json(json!({
        "state": state,
        "model": "qwen-32b",
        "last_state_change_at": "2025-01-01T00:00:00+00:00",
        "checks": {"health_ok": true},
        "gpu": {"fan_speed_percent": 55, "memory_used_mb": 30000,
                "memory_total_mb": 48000, "temperature_c": 71, "gpu_count": 2}
    }))
}

async fn models() -> Json<Value> {
    Json(json!({"models": [
        {"id": "qwen-32b", "script": "/opt/models/qwen.sh", "active": true},
        {"id": "llama-70b", "script": "/opt/models/llama.sh", "active": false}
    ]}))
}

async fn service_status(Query(q): Query<HashMap<String, String>>) -> Json<Value> {
    let lines: u32 = q.get("lines").and_then(|l| l.parse().ok()).unwrap_or(0);
    Json(json!({
        "service": "vllm.service",
        "lines": lines,
        "systemctl_status_output": "Active: active (running)",
        "journal_output": "INFO: Application startup complete.",
        "generated_at": "2025-01-01T00:00:00+00:00",
        "checks": {}
    }))
}

async fn start(State(f): State<Fake>) -> Json<Value> {
    f.hit("start");
    *f.state.lock().unwrap() = "starting".into();
    Json(json!({"status": "starting"}))
}

async fn stop(State(f): State<Fake>) -> impl IntoResponse {
    f.hit("stop");
    (
        StatusCode::CONFLICT,
        Json(json!({"detail": "Service is not running"})),
    )
}

async fn switch(State(f): State<Fake>, Json(body): Json<Value>) -> Json<Value> {
    f.hit(format!("switch {}", body["model"].as_str().unwrap_or("?")));
    Json(json!({"status": "switching"}))
}

async fn restart(State(f): State<Fake>) -> StatusCode {
    f.hit("restart");
    StatusCode::OK
}

async fn shutdown(State(f): State<Fake>) -> StatusCode {
    f.hit("shutdown");
    StatusCode::ACCEPTED
}

async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn fake_server() -> (String, Fake) {
    let fake = Fake::default();
    *fake.state.lock().unwrap() = "running".into();
    let router = Router::new()
        .route("/status", get(status))
        .route("/models", get(models))
        .route("/service/status", get(service_status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/restart", post(restart))
        .route("/switch", post(switch))
        .route("/shutdown", post(shutdown))
        .with_state(fake.clone());
    (serve(router).await, fake)
}

fn api() -> HttpApi {
    HttpApi::new(Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn status_and_models_decode() {
    let (base, _fake) = fake_server().await;
    let api = api();
    let st = api.get_status(&base).await.unwrap();
    assert_eq!(st.state, ServerState::Running);
    assert_eq!(st.model.as_deref(), Some("qwen-32b"));
    let gpu = st.gpu.unwrap();
    assert_eq!(gpu.gpu_count, 2);
    assert!((gpu.memory_percent() - 62.5).abs() < 1e-9);

    let models = api.get_models(&format!("{base}/")).await.unwrap();
    let ids: Vec<_> = models.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["qwen-32b", "llama-70b"]);
}

#[tokio::test]
async fn posts_reach_their_endpoints() {
    let (base, fake) = fake_server().await;
    let api = api();
    api.start(&base).await.unwrap();
    api.restart(&base).await.unwrap();
    api.switch_model(&base, "llama-70b").await.unwrap();
    api.shutdown(&base).await.unwrap();
    assert_eq!(
        fake.hits.lock().unwrap().as_slice(),
        ["start", "restart", "switch llama-70b", "shutdown"]
    );
}

#[tokio::test]
async fn refusal_carries_server_detail() {
    let (base, _fake) = fake_server().await;
    let err = api().stop(&base).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 409, .. }));
    assert_eq!(err.to_string(), "Service is not running");
}

#[tokio::test]
async fn service_status_passes_line_count() {
    let (base, _fake) = fake_server().await;
    let d = api().get_service_status(&base, 42).await.unwrap();
    assert_eq!(d.lines, 42);
    assert_eq!(d.service, "vllm.service");
    assert!(d.journal_output.contains("startup complete"));
}

#[tokio::test]
async fn malformed_payload_is_a_decode_error() {
    let router = Router::new().route("/status", get(|| async { "<html>proxy error</html>" }));
    let base = serve(router).await;
    let err = api().get_status(&base).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "{err:?}");
}

#[tokio::test]
async fn missing_route_is_a_status_error() {
    let router = Router::new();
    let base = serve(router).await;
    let err = api().get_models(&base).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 404, .. }), "{err:?}");
}

#[tokio::test]
async fn session_drives_a_real_server() {
    let (base, fake) = fake_server().await;
    let prefs = Arc::new(MemoryPrefs::with_usage(&[("llama-70b", 10)]));
    let session = Session::new(Arc::new(api()), prefs.clone(), Settings::default());

    session.configure(&format!("{base}/")).await.unwrap();
    let s = session.snapshot();
    assert_eq!(prefs.server_url(), Some(base.clone()));
    assert!(s.reachable);
    assert_eq!(s.models[0].id, "llama-70b");
    assert_eq!(s.transition_started_at, None);

    session.start().await;
    session.poll_now().await;
    let s = session.snapshot();
    assert_eq!(s.status.as_ref().map(|st| st.state), Some(ServerState::Starting));
    assert!(s.transition_started_at.is_some());

    session.stop().await;
    assert_eq!(
        session.snapshot().last_error.as_deref(),
        Some("Stop failed: Service is not running")
    );
    session.consume_error();

    session.switch_model("qwen-32b").await;
    let s = session.snapshot();
    assert!(s.last_error.is_none());
    assert_eq!(s.models[0].id, "qwen-32b");
    assert!(prefs.model_usage().contains_key("qwen-32b"));
    assert!(fake.hits.lock().unwrap().contains(&"switch qwen-32b".to_string()));
}

#[tokio::test]
async fn unreachable_server_flags_session() {
    // bind then drop to get a port nobody listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let session = Session::new(
        Arc::new(HttpApi::new(Duration::from_secs(2)).unwrap()),
        Arc::new(MemoryPrefs::new()),
        Settings::default(),
    );
    session.configure(&format!("http://{addr}")).await.unwrap();
    let s = session.snapshot();
    assert!(!s.reachable);
    assert!(s.status.is_none());
    assert!(s.last_error.is_none());
}
