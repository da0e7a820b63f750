// Worker overview: the admin surface for the backend scheduler that
// opportunistically advances autonomous-mode runs.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use cercle_client::{ApiError, AutonomyClient};
use cercle_types::{RunMode, RunSummary, WorkerStatus, WorkerTickSummary};

#[derive(Debug, Clone, Default)]
pub struct WorkerOverview {
    pub status: Option<WorkerStatus>,
    pub autonomous_runs: Vec<RunSummary>,
    pub last_tick: Option<WorkerTickSummary>,
}

/// Loads worker status alongside the runs the worker would consider.
pub struct WorkerOverviewController {
    client: AutonomyClient,
    overview: RwLock<WorkerOverview>,
    busy: AtomicBool,
    error: RwLock<Option<String>>,
}

impl WorkerOverviewController {
    pub fn new(client: AutonomyClient) -> Self {
        Self {
            client,
            overview: RwLock::new(WorkerOverview::default()),
            busy: AtomicBool::new(false),
            error: RwLock::new(None),
        }
    }

    pub async fn overview(&self) -> WorkerOverview {
        self.overview.read().await.clone()
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    pub async fn last_error(&self) -> Option<String> {
        self.error.read().await.clone()
    }

    /// Fetch worker status and the run list concurrently; keep whatever
    /// was loaded before if either call fails.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        *self.error.write().await = None;

        let (status, runs) = tokio::join!(self.client.worker_status(), self.client.list_runs());
        match (status, runs) {
            (Ok(status), Ok(runs)) => {
                let autonomous_runs = runs
                    .into_iter()
                    .filter(|run| run.mode == Some(RunMode::Autonomous))
                    .collect();
                let mut overview = self.overview.write().await;
                overview.status = Some(status);
                overview.autonomous_runs = autonomous_runs;
                Ok(())
            }
            (Err(err), _) | (_, Err(err)) => {
                *self.error.write().await = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Trigger one bounded worker sweep, then refresh the overview.
    /// Returns `Ok(None)` when a sweep is already in flight.
    pub async fn tick_once(&self) -> Result<Option<WorkerTickSummary>, ApiError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(None);
        }

        let result = self.client.tick_worker_once().await;
        let outcome = match result {
            Ok(summary) => {
                self.overview.write().await.last_tick = Some(summary.clone());
                *self.error.write().await = None;
                Ok(Some(summary))
            }
            Err(err) => {
                *self.error.write().await = Some(err.to_string());
                Err(err)
            }
        };
        self.busy.store(false, Ordering::SeqCst);

        if outcome.is_ok() {
            // Refresh failures land in the error slot on their own.
            let _ = self.refresh().await;
        }
        outcome
    }
}
