// In-process autonomy backend for controller tests. Keeps one run's state
// behind a mutex and counts every control call it serves.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

pub struct BackendState {
    pub status: String,
    pub env: String,
    pub lane: String,
    pub mode: String,
    pub step_idx: u64,
    pub halt_reason: Option<String>,
    pub last_error: Option<Value>,
    pub events: Vec<Value>,
    pub fail_start_and_tick: bool,
    pub fail_tick: bool,
    pub fail_get_run: bool,
    pub reject_set_mode: bool,
    pub tick_delay: Duration,
    pub calls: HashMap<&'static str, usize>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            status: "READY".to_string(),
            env: "dev".to_string(),
            lane: "innovation".to_string(),
            mode: "manual".to_string(),
            step_idx: 0,
            halt_reason: None,
            last_error: None,
            events: vec![json!({"type": "CREATED", "ts": "2026-08-01T10:00:00Z"})],
            fail_start_and_tick: false,
            fail_tick: false,
            fail_get_run: false,
            reject_set_mode: false,
            tick_delay: Duration::ZERO,
            calls: HashMap::new(),
        }
    }
}

impl BackendState {
    fn state_json(&self) -> Value {
        let mut state = json!({
            "status": self.status,
            "env": self.env,
            "lane": self.lane,
            "mode": self.mode,
            "step_idx": self.step_idx,
        });
        if let Some(reason) = &self.halt_reason {
            state["halt_reason"] = json!(reason);
        }
        state
    }

    fn count(&mut self, name: &'static str) {
        *self.calls.entry(name).or_insert(0) += 1;
    }
}

type Shared = Arc<Mutex<BackendState>>;

pub struct MockBackend {
    pub base_url: String,
    state: Shared,
}

impl MockBackend {
    pub async fn spawn() -> Self {
        let state: Shared = Arc::new(Mutex::new(BackendState::default()));

        let app = Router::new()
            .route("/api/autonomy/runs", get(list_runs))
            .route("/api/autonomy/runs/start", post(start_run))
            .route(
                "/api/autonomy/runs/start_and_tick_once",
                post(start_and_tick_once),
            )
            .route("/api/autonomy/runs/{id}", get(get_run))
            .route("/api/autonomy/runs/{id}/tick", post(tick))
            .route("/api/autonomy/runs/{id}/halt", post(halt))
            .route("/api/autonomy/runs/{id}/retry", post(retry))
            .route("/api/autonomy/runs/{id}/approve_and_tick", post(approve_and_tick))
            .route("/api/autonomy/runs/{id}/continue", post(continue_run))
            .route("/api/autonomy/runs/{id}/set_mode", post(set_mode))
            .route("/api/autonomy/worker/status", get(worker_status))
            .route("/api/autonomy/worker/tick_once", post(worker_tick_once))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    pub fn configure(&self, f: impl FnOnce(&mut BackendState)) {
        f(&mut self.lock());
    }

    pub fn set_status(&self, status: &str) {
        self.lock().status = status.to_string();
    }

    pub fn calls(&self, name: &str) -> usize {
        self.lock().calls.get(name).copied().unwrap_or(0)
    }
}

async fn list_runs(State(state): State<Shared>) -> Json<Value> {
    let state = state.lock().unwrap();
    Json(json!({
        "runs": [{
            "run_id": "run-100",
            "status": state.status,
            "env": state.env,
            "lane": state.lane,
            "mode": state.mode,
        }]
    }))
}

async fn get_run(State(state): State<Shared>) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.count("get_run");
    if state.fail_get_run {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "detail store unavailable"})),
        ));
    }
    Ok(Json(json!({
        "state": state.state_json(),
        "events": state.events,
        "last_error": state.last_error,
        "linked_job": null,
    })))
}

async fn start_run(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.count("start");
    state.status = "READY".to_string();
    Json(json!({"run_id": "run-100", "state": state.state_json()}))
}

async fn start_and_tick_once(
    State(state): State<Shared>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.count("start_and_tick_once");
    if state.fail_start_and_tick {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "compound start unavailable"})),
        ));
    }
    state.status = "RUNNING".to_string();
    state.step_idx = 1;
    Ok(Json(json!({"run_id": "run-100", "state": state.state_json()})))
}

async fn tick(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let delay = state.lock().unwrap().tick_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let mut state = state.lock().unwrap();
    state.count("tick");
    if state.fail_tick {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"message": "tick worker unavailable"})),
        ));
    }
    let approve = body
        .get("approve_blocked")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if state.status == "BLOCKED" {
        if !approve {
            return Err((
                StatusCode::CONFLICT,
                Json(json!({"message": "run is blocked awaiting approval"})),
            ));
        }
        state.status = "RUNNING".to_string();
    }
    state.step_idx += 1;
    Ok(Json(json!({"state": state.state_json()})))
}

async fn halt(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.count("halt");
    state.status = "HALT".to_string();
    state.halt_reason = body
        .get("reason")
        .and_then(Value::as_str)
        .map(str::to_string);
    Json(json!({"state": state.state_json()}))
}

async fn retry(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.count("retry");
    state.status = "RUNNING".to_string();
    state.last_error = None;
    Json(json!({"state": state.state_json()}))
}

async fn approve_and_tick(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.count("approve_and_tick");
    state.status = "RUNNING".to_string();
    state.step_idx += 1;
    Json(json!({"state": state.state_json()}))
}

async fn continue_run(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.count("continue");
    state.step_idx += 1;
    Json(json!({"state": state.state_json()}))
}

async fn set_mode(
    State(state): State<Shared>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let mut state = state.lock().unwrap();
    state.count("set_mode");
    if state.reject_set_mode {
        return Err((
            StatusCode::FORBIDDEN,
            Json(json!({"message": "mode change not allowed by policy"})),
        ));
    }
    if let Some(mode) = body.get("mode").and_then(Value::as_str) {
        state.mode = mode.to_string();
    }
    Ok(Json(json!({"state": state.state_json()})))
}

async fn worker_status(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.count("worker_status");
    Json(json!({"enabled": true, "last_tick_at": "2026-08-01T10:00:00Z"}))
}

async fn worker_tick_once(State(state): State<Shared>) -> Json<Value> {
    let mut state = state.lock().unwrap();
    state.count("worker_tick_once");
    Json(json!({"enabled": true, "considered": 1, "ticked": 1, "skipped": 0, "errors": 0}))
}
