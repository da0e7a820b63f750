mod error;
mod header;
mod launch;
mod plan_panel;
mod plan_store;
mod poller;
mod recovery;
mod selector;
mod templates;
mod worker;

pub use error::ControlError;
pub use header::{ActionOutcome, RunHeaderController};
pub use launch::{launch_run, launch_run_with_plan, LaunchOutcome};
pub use plan_panel::RunPlanPanelController;
pub use plan_store::{PlanStore, PlanStoreError};
pub use poller::{RunTimelinePoller, RunView, DEFAULT_POLL_INTERVAL};
pub use recovery::{RecoveryActions, RecoveryController};
pub use selector::{select_current_step, StatusSnapshot};
pub use templates::{builder_run_templates, find_run_plan_template, run_plan_templates};
pub use worker::{WorkerOverview, WorkerOverviewController};
