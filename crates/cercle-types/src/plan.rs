// Run plan shapes. Plans are client-local overlays on a run: operator
// guidance only, never consulted by the backend.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::run::{JobType, TaskKind};

/// Client action a plan step maps to when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    /// Create the run and perform the first tick. Only valid while
    /// launching; meaningless against an existing run.
    CreateAndTickOnce,
    ApproveAndTick,
    Continue,
    TickOnce,
}

impl StepAction {
    pub fn as_str(self) -> &'static str {
        match self {
            StepAction::CreateAndTickOnce => "create_and_tick_once",
            StepAction::ApproveAndTick => "approve_and_tick",
            StepAction::Continue => "continue",
            StepAction::TickOnce => "tick_once",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a run plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlanStep {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub action_type: StepAction,
    pub requires_approval: bool,
}

/// Form defaults carried by a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateDefaults {
    pub kind: TaskKind,
    pub job_type: JobType,
    pub env: String,
    pub lane: String,
    pub description: String,
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// Single-shot run template without a step plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuilderRunTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub defaults: TemplateDefaults,
}

/// Template with an ordered step plan, selected at run creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlanTemplate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub steps: Vec<RunPlanStep>,
    pub defaults: TemplateDefaults,
}

impl RunPlanTemplate {
    pub fn instantiate(&self) -> RunPlanInstance {
        RunPlanInstance {
            template_id: self.id.clone(),
            steps: self.steps.clone(),
        }
    }
}

/// The persisted slice of a plan: template id plus the ordered steps.
///
/// Deliberately position-free. The current step is recomputed from live run
/// state on every render; persisting it would let the cached copy drift from
/// backend truth. Legacy documents that carry a stored index are accepted
/// and the index discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunPlanInstance {
    #[serde(rename = "templateId")]
    pub template_id: String,
    pub steps: Vec<RunPlanStep>,
}
