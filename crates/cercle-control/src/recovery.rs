use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::header::ActionOutcome;
use crate::selector::StatusSnapshot;
use cercle_client::{ApiError, AutonomyClient};
use cercle_types::RunStatus;

/// Which recovery actions the current status allows.
///
/// Derived purely from `{status, last_error}`; nothing here is stateful.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryActions {
    pub can_retry: bool,
    pub can_approve_and_continue: bool,
    pub can_continue: bool,
    /// Whether the recovery surface shows at all. Hidden when the run is
    /// healthy with no error hint and nothing actionable.
    pub panel_visible: bool,
}

impl RecoveryActions {
    pub fn derive(status: &RunStatus, has_last_error: bool) -> Self {
        let can_retry = status.is_recoverable();
        let can_approve_and_continue = status.is_blocked();
        // Terminal runs (SUCCESS included) have nothing left to continue.
        let can_continue = !status.is_terminal() && !status.is_blocked();
        let panel_visible =
            has_last_error || can_retry || can_approve_and_continue || can_continue;
        Self {
            can_retry,
            can_approve_and_continue,
            can_continue,
            panel_visible,
        }
    }

    pub fn from_snapshot(snapshot: &StatusSnapshot) -> Self {
        Self::derive(&snapshot.status, snapshot.has_last_error)
    }
}

/// Issues recovery actions for one run, gated by the latest snapshot.
///
/// Invoking an action whose flag is false is a no-op, not an error; the
/// gate is enforced here, not only in whatever renders the buttons.
pub struct RecoveryController {
    client: AutonomyClient,
    run_id: String,
    snapshot: RwLock<StatusSnapshot>,
    busy: AtomicBool,
    error: RwLock<Option<String>>,
}

impl RecoveryController {
    pub fn new(client: AutonomyClient, run_id: impl Into<String>) -> Self {
        Self {
            client,
            run_id: run_id.into(),
            snapshot: RwLock::new(StatusSnapshot::default()),
            busy: AtomicBool::new(false),
            error: RwLock::new(None),
        }
    }

    /// Feed the latest polled snapshot in.
    pub async fn observe(&self, snapshot: StatusSnapshot) {
        *self.snapshot.write().await = snapshot;
    }

    pub async fn actions(&self) -> RecoveryActions {
        RecoveryActions::from_snapshot(&*self.snapshot.read().await)
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.error.read().await.clone()
    }

    /// Retry a FAILED/ERROR run.
    pub async fn retry(&self) -> Result<ActionOutcome, ApiError> {
        if !self.actions().await.can_retry {
            return Ok(ActionOutcome::Skipped);
        }
        if !self.begin() {
            return Ok(ActionOutcome::Skipped);
        }
        let result = self.client.retry(&self.run_id).await;
        self.finish(result.map(|_| ())).await
    }

    /// Approve a BLOCKED run and tick it.
    pub async fn approve_and_continue(&self) -> Result<ActionOutcome, ApiError> {
        if !self.actions().await.can_approve_and_continue {
            return Ok(ActionOutcome::Skipped);
        }
        if !self.begin() {
            return Ok(ActionOutcome::Skipped);
        }
        let result = self.client.approve_and_tick(&self.run_id).await;
        self.finish(result.map(|_| ())).await
    }

    /// Continue a healthy run with one more tick.
    pub async fn continue_run(&self) -> Result<ActionOutcome, ApiError> {
        if !self.actions().await.can_continue {
            return Ok(ActionOutcome::Skipped);
        }
        if !self.begin() {
            return Ok(ActionOutcome::Skipped);
        }
        let result = self.client.continue_run(&self.run_id).await;
        self.finish(result.map(|_| ())).await
    }

    fn begin(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    // The returned state is not cached here; the next poll refreshes every
    // consumer at once.
    async fn finish(&self, result: Result<(), ApiError>) -> Result<ActionOutcome, ApiError> {
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
}
