// Header controller for one run: owns the cached state copy and issues the
// primary control actions against it.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use cercle_client::{ApiError, AutonomyClient};
use cercle_types::{RunMode, RunState, RunStatus};

/// Lanes where autonomous mode is never offered.
const PROTECTED_LANES: [&str; 2] = ["prod", "production"];

/// What happened to a requested control action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The call went out and the returned state replaced the cache.
    Applied,
    /// Not attempted: the control is busy or the action is not enabled for
    /// the current status.
    Skipped,
    /// Attempted and refused by backend policy; logged, view unaffected.
    Rejected,
}

/// Owns the authoritative in-memory copy of one run's state.
///
/// Transitions happen only through the actions below or through backend
/// changes observed by the next poll (`absorb`). Every action holds the
/// busy gate for the duration of its call so one control cannot submit
/// twice concurrently.
pub struct RunHeaderController {
    client: AutonomyClient,
    run_id: String,
    state: RwLock<RunState>,
    busy: AtomicBool,
    error: RwLock<Option<String>>,
}

impl RunHeaderController {
    pub fn new(client: AutonomyClient, run_id: impl Into<String>, initial_state: RunState) -> Self {
        Self {
            client,
            run_id: run_id.into(),
            state: RwLock::new(initial_state),
            busy: AtomicBool::new(false),
            error: RwLock::new(None),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn state(&self) -> RunState {
        self.state.read().await.clone()
    }

    pub async fn status(&self) -> RunStatus {
        self.state.read().await.status()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.error.read().await.clone()
    }

    /// Replace the cached state with a freshly polled copy. Last write
    /// wins; the cache is advisory display state, not a correctness store.
    pub async fn absorb(&self, state: RunState) {
        *self.state.write().await = state;
    }

    /// Advance the run one step. Always enabled.
    pub async fn tick(&self) -> Result<ActionOutcome, ApiError> {
        if !self.begin() {
            return Ok(ActionOutcome::Skipped);
        }
        let result = self.client.tick(&self.run_id, false).await;
        self.finish(result).await
    }

    /// Approve a blocked run and resume it. Enabled only in BLOCKED.
    pub async fn approve_and_resume(&self) -> Result<ActionOutcome, ApiError> {
        if !self.status().await.is_blocked() {
            return Ok(ActionOutcome::Skipped);
        }
        if !self.begin() {
            return Ok(ActionOutcome::Skipped);
        }
        let result = self.client.tick(&self.run_id, true).await;
        self.finish(result).await
    }

    /// Halt the run. Enabled whenever it is not already halted.
    pub async fn halt(&self, reason: Option<&str>) -> Result<ActionOutcome, ApiError> {
        if self.status().await.is_halted() {
            return Ok(ActionOutcome::Skipped);
        }
        if !self.begin() {
            return Ok(ActionOutcome::Skipped);
        }
        let result = self.client.halt(&self.run_id, reason).await;
        self.finish(result).await
    }

    /// Whether the autonomous option is withheld for this run. Mirrors the
    /// backend's prod protection; the backend still enforces its own policy.
    pub async fn autonomous_disallowed(&self) -> bool {
        let state = self.state.read().await;
        let env = state.env().to_ascii_lowercase();
        let lane = state.lane().to_ascii_lowercase();
        env == "prod" || PROTECTED_LANES.contains(&lane.as_str())
    }

    /// Request a mode change. A backend policy rejection is logged and
    /// reported as `Rejected`; it never unwinds the view, since the guard
    /// above already withholds the disallowed option and a rejection here
    /// can only come from racing policy.
    pub async fn set_mode(&self, mode: RunMode) -> ActionOutcome {
        if mode == RunMode::Autonomous && self.autonomous_disallowed().await {
            return ActionOutcome::Skipped;
        }
        if !self.begin() {
            return ActionOutcome::Skipped;
        }

        let outcome = match self.client.set_mode(&self.run_id, mode).await {
            Ok(state) => {
                *self.state.write().await = state;
                ActionOutcome::Applied
            }
            Err(err) => {
                tracing::warn!(
                    run_id = %self.run_id,
                    mode = mode.as_str(),
                    error = %err,
                    "failed to set mode"
                );
                ActionOutcome::Rejected
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

    async fn finish(
        &self,
        result: Result<RunState, ApiError>,
    ) -> Result<ActionOutcome, ApiError> {
        let outcome = match result {
            Ok(state) => {
                *self.state.write().await = state;
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
}
