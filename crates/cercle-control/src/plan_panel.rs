// Plan panel controller: overlays a locally stored step plan on a run and
// maps the heuristically selected current step to control actions.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::error::ControlError;
use crate::header::ActionOutcome;
use crate::plan_store::{PlanStore, PlanStoreError};
use crate::selector::{select_current_step, StatusSnapshot};
use cercle_client::AutonomyClient;
use cercle_types::{RunPlanInstance, RunPlanStep, StepAction};

/// Drives one run's plan overlay.
///
/// The plan (template id + steps) is loaded once from the local store; the
/// current position is recomputed from every snapshot via the selector and
/// never persisted. Executing a step never advances a local index; the
/// next poll's recomputation is the only thing that moves the highlight.
pub struct RunPlanPanelController {
    client: AutonomyClient,
    run_id: String,
    plan: Option<RunPlanInstance>,
    snapshot: RwLock<StatusSnapshot>,
    busy: AtomicBool,
    error: RwLock<Option<String>>,
}

impl RunPlanPanelController {
    /// Load the plan for `run_id` from the store. A store miss is fine:
    /// the panel simply has nothing to show.
    pub fn load(
        client: AutonomyClient,
        run_id: impl Into<String>,
        store: &PlanStore,
    ) -> Result<Self, PlanStoreError> {
        let run_id = run_id.into();
        let plan = store.load(&run_id)?;
        Ok(Self::with_plan(client, run_id, plan))
    }

    pub fn with_plan(
        client: AutonomyClient,
        run_id: impl Into<String>,
        plan: Option<RunPlanInstance>,
    ) -> Self {
        Self {
            client,
            run_id: run_id.into(),
            plan,
            snapshot: RwLock::new(StatusSnapshot::default()),
            busy: AtomicBool::new(false),
            error: RwLock::new(None),
        }
    }

    pub fn has_plan(&self) -> bool {
        self.plan.is_some()
    }

    pub fn template_id(&self) -> Option<&str> {
        self.plan.as_ref().map(|p| p.template_id.as_str())
    }

    pub fn steps(&self) -> &[RunPlanStep] {
        self.plan.as_ref().map(|p| p.steps.as_slice()).unwrap_or(&[])
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.error.read().await.clone()
    }

    /// Feed the latest polled snapshot in.
    pub async fn observe(&self, snapshot: StatusSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    /// The panel disappears without a plan and once the run completes or
    /// halts.
    pub async fn visible(&self) -> bool {
        if self.plan.is_none() {
            return false;
        }
        let snapshot = self.snapshot.read().await;
        !(snapshot.status.is_success() || snapshot.status.is_halted())
    }

    /// Effective current step, recomputed from the latest snapshot.
    pub async fn current_step_index(&self) -> usize {
        let snapshot = self.snapshot.read().await;
        select_current_step(self.steps(), &snapshot)
    }

    pub async fn current_step(&self) -> Option<&RunPlanStep> {
        let idx = self.current_step_index().await;
        self.steps().get(idx)
    }

    /// Whether the current step may be executed right now: approval steps
    /// only while the run is blocked, plain steps in any non-dead state.
    pub async fn can_execute_current_step(&self) -> bool {
        let Some(step) = self.current_step().await else {
            return false;
        };
        let snapshot = self.snapshot.read().await;
        if step.requires_approval {
            snapshot.status.is_blocked()
        } else {
            !snapshot.status.is_halted() && !snapshot.status.is_recoverable()
        }
    }

    /// Execute the current step by mapping its action to a client call.
    pub async fn execute_current_step(&self) -> Result<ActionOutcome, ControlError> {
        let Some(step) = self.current_step().await else {
            return Ok(ActionOutcome::Skipped);
        };
        if !self.can_execute_current_step().await {
            return Ok(ActionOutcome::Skipped);
        }
        if !self.begin() {
            return Ok(ActionOutcome::Skipped);
        }

        let result = match step.action_type {
            StepAction::ApproveAndTick => self
                .client
                .approve_and_tick(&self.run_id)
                .await
                .map(|_| ())
                .map_err(ControlError::from),
            StepAction::Continue => self
                .client
                .continue_run(&self.run_id)
                .await
                .map(|_| ())
                .map_err(ControlError::from),
            StepAction::TickOnce => self
                .client
                .tick(&self.run_id, false)
                .await
                .map(|_| ())
                .map_err(ControlError::from),
            // The create half already happened in the launch flow; there is
            // nothing sensible to do with it against an existing run.
            StepAction::CreateAndTickOnce => {
                Err(ControlError::UnsupportedStepAction(step.action_type))
            }
        };

        let outcome = match result {
            Ok(()) => {
                *self.error.write().await = None;
                Ok(ActionOutcome::Applied)
            }
            Err(err) => {
                *self.error.write().await = Some(err.to_string());
                Err(err)
            }
        };
        self.busy.store(false, Ordering::SeqCst);
        outcome
    }

    fn begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}
