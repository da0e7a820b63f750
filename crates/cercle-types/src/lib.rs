mod event;
mod plan;
mod run;
mod status;

pub use event::{last_error_event, RunEvent};
pub use plan::{
    BuilderRunTemplate, RunPlanInstance, RunPlanStep, RunPlanTemplate, StepAction,
    TemplateDefaults,
};
pub use run::{
    JobType, LastError, LastErrorJob, LinkedJob, ListRunsResponse, RunDetail, RunMode, RunState,
    RunSummary, StartRunRequest, StartRunResponse, StateEnvelope, TaskKind, TaskSpec,
    WorkerStatus, WorkerTickSummary,
};
pub use status::RunStatus;
