// Run launch flow: compound create + first tick, with an explicit
// two-phase fallback when the compound endpoint is unavailable.

use crate::plan_store::PlanStore;
use cercle_client::{ApiError, AutonomyClient};
use cercle_types::{RunPlanTemplate, RunState, StartRunRequest};

/// Result of launching a run. Creation and the first tick are observable
/// independently: a run whose first tick failed still exists and can be
/// ticked by hand.
#[derive(Debug, Clone)]
pub struct LaunchOutcome {
    pub run_id: String,
    pub created: bool,
    pub ticked: bool,
    pub state: Option<RunState>,
}

/// Create a run and give it its first tick.
///
/// Prefers the compound endpoint; when that fails, falls back to a plain
/// create followed by a separate tick. A failing fallback tick is logged
/// and reported through `ticked`, never unwound: the run was created.
pub async fn launch_run(
    client: &AutonomyClient,
    request: &StartRunRequest,
) -> Result<LaunchOutcome, ApiError> {
    match client.start_run_and_tick_once(request).await {
        Ok(response) => Ok(LaunchOutcome {
            run_id: response.run_id,
            created: true,
            ticked: true,
            state: response.state,
        }),
        Err(err) => {
            tracing::warn!(
                error = %err,
                "start_and_tick_once failed, falling back to start + tick"
            );

            let response = client.start_run(request).await?;
            let run_id = response.run_id;

            let (ticked, state) = match client.tick(&run_id, false).await {
                Ok(state) => (true, Some(state)),
                Err(tick_err) => {
                    tracing::warn!(
                        run_id = %run_id,
                        error = %tick_err,
                        "first tick after fallback create failed; run can be ticked manually"
                    );
                    (false, response.state)
                }
            };

            Ok(LaunchOutcome {
                run_id,
                created: true,
                ticked,
                state,
            })
        }
    }
}

/// Launch a run and persist the chosen plan under the new run id.
///
/// The plan write happens once, here; a failing write degrades to a run
/// without a plan overlay rather than failing a launch that already
/// succeeded remotely.
pub async fn launch_run_with_plan(
    client: &AutonomyClient,
    request: &StartRunRequest,
    template: &RunPlanTemplate,
    store: &PlanStore,
) -> Result<LaunchOutcome, ApiError> {
    let outcome = launch_run(client, request).await?;

    if let Err(err) = store.save(&outcome.run_id, &template.instantiate()) {
        tracing::warn!(
            run_id = %outcome.run_id,
            error = %err,
            "failed to persist run plan; the run continues without an overlay"
        );
    }

    Ok(outcome)
}
