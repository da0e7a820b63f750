use thiserror::Error;

use cercle_client::ApiError;
use cercle_types::StepAction;

/// Errors surfaced by the run-control controllers.
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("step action {0} only applies when launching a run")]
    UnsupportedStepAction(StepAction),
}
