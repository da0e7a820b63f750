use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Type fragments that mark an event as an error for display purposes.
const ERROR_MARKERS: [&str; 5] = ["ERROR", "FAILED", "BLOCKED", "EXCEPTION", "AUDIT_FAILED"];

/// Append-only record of something that happened during a run.
///
/// Events arrive oldest-first; consumers render them newest-first. The
/// payload beyond `type` and `ts` is backend-defined and passes through
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    #[serde(rename = "type", default)]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl RunEvent {
    /// Whether the event's type marks it as an error event,
    /// case-insensitively.
    pub fn is_error(&self) -> bool {
        let label = self.event_type.to_ascii_uppercase();
        ERROR_MARKERS.iter().any(|marker| label.contains(marker))
    }
}

/// Most recent error event in an oldest-first event log.
pub fn last_error_event(events: &[RunEvent]) -> Option<&RunEvent> {
    events.iter().rev().find(|ev| ev.is_error())
}
