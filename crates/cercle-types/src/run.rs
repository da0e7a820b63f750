// Wire shapes for the autonomy run API.
// All remote-owned structures are mirrored read-only; the backend is the
// sole authority over their contents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::event::RunEvent;
use crate::status::RunStatus;

/// Execution mode of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Manual,
    Assisted,
    Autonomous,
}

impl RunMode {
    pub fn as_str(self) -> &'static str {
        match self {
            RunMode::Manual => "manual",
            RunMode::Assisted => "assisted",
            RunMode::Autonomous => "autonomous",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manual" => Some(RunMode::Manual),
            "assisted" => Some(RunMode::Assisted),
            "autonomous" => Some(RunMode::Autonomous),
            _ => None,
        }
    }
}

/// Remote-owned run state.
///
/// The backend treats this as an open map of fields; only a handful have
/// meaning to the cockpit. The full map is preserved round-trip so callers
/// can inspect fields this crate knows nothing about. Mutating calls return
/// a fresh copy that replaces any cached one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunState {
    fields: Map<String, Value>,
}

impl RunState {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn status(&self) -> RunStatus {
        RunStatus::from_raw(self.str_field("status"))
    }

    pub fn mode(&self) -> RunMode {
        self.str_field("mode")
            .and_then(RunMode::parse)
            .unwrap_or(RunMode::Manual)
    }

    pub fn step_idx(&self) -> u64 {
        self.fields.get("step_idx").and_then(Value::as_u64).unwrap_or(0)
    }

    pub fn env(&self) -> &str {
        self.str_field("env").unwrap_or("dev")
    }

    pub fn lane(&self) -> &str {
        self.str_field("lane").unwrap_or("innovation")
    }

    pub fn halt_reason(&self) -> Option<&str> {
        self.str_field("halt_reason")
    }
}

impl From<Map<String, Value>> for RunState {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

/// Background execution unit linked to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkedJob {
    pub job_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

/// Job excerpt embedded in a `LastError` summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastErrorJob {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<String>,
}

/// Backend-derived error summary. A hint, never authoritative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LastError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<LastErrorJob>,
}

impl LastError {
    /// Best human-oriented one-liner for this error, if any detail exists.
    pub fn hint(&self) -> Option<String> {
        if let Some(message) = self.job.as_ref().and_then(|j| j.message.clone()) {
            return Some(message);
        }
        self.event
            .as_ref()
            .and_then(|ev| ev.get("type"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

/// One row of the run listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<RunMode>,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        RunStatus::from_raw(self.status.as_deref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRunsResponse {
    #[serde(default)]
    pub runs: Vec<RunSummary>,
}

/// Full detail for one run, as returned by a single poll.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunDetail {
    #[serde(default)]
    pub state: RunState,
    #[serde(default)]
    pub events: Vec<RunEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_job: Option<LinkedJob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts_tree: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<LastError>,
}

/// Envelope around the fresh state returned by every mutating call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateEnvelope {
    pub state: RunState,
}

/// What kind of work a run performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Analysis,
    Plan,
    Patch,
    Audit,
}

impl TaskKind {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Analysis => "analysis",
            TaskKind::Plan => "plan",
            TaskKind::Patch => "patch",
            TaskKind::Audit => "audit",
        }
    }
}

/// Which backend executor a run is handed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    CodingLane,
    Autobuilder,
    Builder,
}

/// Operator-authored description of the task a run should carry out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSpec {
    pub id: String,
    pub kind: TaskKind,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_root: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lane: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunRequest {
    pub task: TaskSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_type: Option<JobType>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRunResponse {
    pub run_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<RunState>,
}

/// Global background worker status (admin surface, not per-run).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerStatus {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tick_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caps: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counters: Option<Value>,
}

/// Result of one bounded worker sweep.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkerTickSummary {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub considered: u64,
    #[serde(default)]
    pub ticked: u64,
    #[serde(default)]
    pub skipped: u64,
    #[serde(default)]
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_state_accessors_read_known_fields() {
        let state: RunState = serde_json::from_value(json!({
            "status": "running",
            "mode": "assisted",
            "step_idx": 3,
            "env": "staging",
            "lane": "innovation",
            "halt_reason": null,
            "planner_hint": {"weight": 0.4},
        }))
        .unwrap();

        assert_eq!(state.status().as_str(), "RUNNING");
        assert_eq!(state.mode(), RunMode::Assisted);
        assert_eq!(state.step_idx(), 3);
        assert_eq!(state.env(), "staging");
        assert_eq!(state.lane(), "innovation");
        assert_eq!(state.halt_reason(), None);
        // Unknown fields stay reachable.
        assert!(state.get("planner_hint").is_some());
    }

    #[test]
    fn run_state_defaults_for_missing_fields() {
        let state = RunState::default();
        assert_eq!(state.status().as_str(), "UNKNOWN");
        assert_eq!(state.mode(), RunMode::Manual);
        assert_eq!(state.step_idx(), 0);
        assert_eq!(state.env(), "dev");
        assert_eq!(state.lane(), "innovation");
    }

    #[test]
    fn run_state_round_trips_unknown_fields() {
        let raw = json!({"status": "BLOCKED", "custom": [1, 2, 3]});
        let state: RunState = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&state).unwrap(), raw);
    }

    #[test]
    fn run_detail_tolerates_sparse_payloads() {
        let detail: RunDetail = serde_json::from_value(json!({
            "state": {"status": "RUNNING"},
            "events": [],
        }))
        .unwrap();
        assert!(detail.linked_job.is_none());
        assert!(detail.last_error.is_none());
        assert_eq!(detail.state.status().as_str(), "RUNNING");
    }

    #[test]
    fn last_error_hint_prefers_job_message() {
        let err = LastError {
            source: Some("job".to_string()),
            state_status: Some("FAILED".to_string()),
            event: Some(json!({"type": "STEP_FAILED"})),
            job: Some(LastErrorJob {
                message: Some("compile failed".to_string()),
                ..LastErrorJob::default()
            }),
        };
        assert_eq!(err.hint().as_deref(), Some("compile failed"));

        let err_without_job = LastError {
            job: None,
            ..err
        };
        assert_eq!(err_without_job.hint().as_deref(), Some("STEP_FAILED"));
    }
}
