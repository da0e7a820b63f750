// Typed wrapper over the autonomy run REST API.
//
// Every operation is a single remote call. Failures surface as `ApiError`
// and are never retried here; recovery policy belongs to the calling
// controller. Mutating calls return the fresh run state, which callers must
// replace into their cache wholesale (the backend owns run state, field
// merges invite drift).

mod config;
mod error;

pub use config::{ApiConfig, DEFAULT_API_BASE_URL, ENV_API_BASE_URL, ENV_API_TIMEOUT_SECS};
pub use error::{ApiError, Result};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use cercle_types::{
    ListRunsResponse, RunDetail, RunMode, RunState, RunSummary, StartRunRequest,
    StartRunResponse, StateEnvelope, WorkerStatus, WorkerTickSummary,
};

/// Halt reason recorded when the operator gives none.
pub const DEFAULT_HALT_REASON: &str = "halt_requested_via_cockpit";

#[derive(Debug, Serialize)]
struct TickRequest {
    approve_blocked: bool,
}

#[derive(Debug, Serialize)]
struct HaltRequest<'a> {
    reason: &'a str,
}

#[derive(Debug, Serialize)]
struct SetModeRequest {
    mode: RunMode,
}

// Endpoints without a payload still take `{}`.
fn empty_body() -> Value {
    Value::Object(serde_json::Map::new())
}

/// Client for the autonomy run control surface.
#[derive(Clone)]
pub struct AutonomyClient {
    base_url: String,
    http: reqwest::Client,
}

impl AutonomyClient {
    pub fn new(config: ApiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build HTTP client");
        Self {
            base_url: config.base_url,
            http,
        }
    }

    pub fn from_env() -> Self {
        Self::new(ApiConfig::from_env())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn list_runs(&self) -> Result<Vec<RunSummary>> {
        let response: ListRunsResponse = self.get_json("/api/autonomy/runs").await?;
        Ok(response.runs)
    }

    pub async fn get_run(&self, run_id: &str) -> Result<RunDetail> {
        self.get_json(&format!("/api/autonomy/runs/{}", run_id)).await
    }

    pub async fn start_run(&self, request: &StartRunRequest) -> Result<StartRunResponse> {
        self.post_json("/api/autonomy/runs/start", request).await
    }

    /// Compound create + first tick. Callers that need the run even when
    /// this endpoint is unavailable fall back to `start_run` followed by an
    /// independent `tick`.
    pub async fn start_run_and_tick_once(
        &self,
        request: &StartRunRequest,
    ) -> Result<StartRunResponse> {
        self.post_json("/api/autonomy/runs/start_and_tick_once", request)
            .await
    }

    /// Advance the run one step. `approve_blocked` additionally clears a
    /// BLOCKED state awaiting operator approval.
    pub async fn tick(&self, run_id: &str, approve_blocked: bool) -> Result<RunState> {
        let envelope: StateEnvelope = self
            .post_json(
                &format!("/api/autonomy/runs/{}/tick", run_id),
                &TickRequest { approve_blocked },
            )
            .await?;
        Ok(envelope.state)
    }

    pub async fn halt(&self, run_id: &str, reason: Option<&str>) -> Result<RunState> {
        let envelope: StateEnvelope = self
            .post_json(
                &format!("/api/autonomy/runs/{}/halt", run_id),
                &HaltRequest {
                    reason: reason.unwrap_or(DEFAULT_HALT_REASON),
                },
            )
            .await?;
        Ok(envelope.state)
    }

    pub async fn retry(&self, run_id: &str) -> Result<RunState> {
        let envelope: StateEnvelope = self
            .post_json(&format!("/api/autonomy/runs/{}/retry", run_id), &empty_body())
            .await?;
        Ok(envelope.state)
    }

    pub async fn approve_and_tick(&self, run_id: &str) -> Result<RunState> {
        let envelope: StateEnvelope = self
            .post_json(
                &format!("/api/autonomy/runs/{}/approve_and_tick", run_id),
                &empty_body(),
            )
            .await?;
        Ok(envelope.state)
    }

    pub async fn continue_run(&self, run_id: &str) -> Result<RunState> {
        let envelope: StateEnvelope = self
            .post_json(
                &format!("/api/autonomy/runs/{}/continue", run_id),
                &empty_body(),
            )
            .await?;
        Ok(envelope.state)
    }

    /// Request a mode change. The backend is authoritative on policy and
    /// may reject the transition; the rejection surfaces as a plain
    /// `ApiError` for the caller to handle.
    pub async fn set_mode(&self, run_id: &str, mode: RunMode) -> Result<RunState> {
        let envelope: StateEnvelope = self
            .post_json(
                &format!("/api/autonomy/runs/{}/set_mode", run_id),
                &SetModeRequest { mode },
            )
            .await?;
        Ok(envelope.state)
    }

    pub async fn worker_status(&self) -> Result<WorkerStatus> {
        self.get_json("/api/autonomy/worker/status").await
    }

    pub async fn tick_worker_once(&self) -> Result<WorkerTickSummary> {
        self.post_json("/api/autonomy/worker/tick_once", &empty_body())
            .await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ApiError::network(&e))?;
        handle_response(response).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.url(path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::network(&e))?;
        handle_response(response).await
    }
}

async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    let url = response.url().to_string();

    if status.is_success() {
        let body = response.text().await.map_err(|e| ApiError {
            message: format!("failed to read response body: {}", e),
            status: status.as_u16(),
            details: None,
        })?;

        tracing::debug!(url = %url, "response: {}", &body[..body.len().min(500)]);

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(url = %url, "failed to parse response: {}", e);
            ApiError {
                message: format!("failed to parse response: {}", e),
                status: status.as_u16(),
                details: None,
            }
        })
    } else {
        let body = response.text().await.unwrap_or_default();
        let details: Option<Value> = serde_json::from_str(&body).ok();
        let message = details
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("request failed ({})", status));

        tracing::error!(url = %url, status = %status, "request failed: {}", body);

        Err(ApiError {
            message,
            status: status.as_u16(),
            details,
        })
    }
}
