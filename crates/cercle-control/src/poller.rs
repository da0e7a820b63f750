// Timeline poller: eventually-consistent view of one run with bounded
// staleness, via fixed-interval re-fetch.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::selector::StatusSnapshot;
use cercle_client::AutonomyClient;
use cercle_types::RunDetail;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Latest polled view of a run.
///
/// On success the whole detail tuple is replaced and the poll error
/// cleared; on failure the last good detail is preserved and only the
/// error flag changes.
#[derive(Debug, Clone, Default)]
pub struct RunView {
    pub detail: Option<RunDetail>,
    pub poll_error: Option<String>,
}

impl RunView {
    pub fn snapshot(&self) -> StatusSnapshot {
        match &self.detail {
            Some(detail) => StatusSnapshot::from_state(&detail.state, detail.last_error.as_ref()),
            None => StatusSnapshot::default(),
        }
    }
}

/// Re-fetches full run detail on a fixed interval and fans it out through
/// a watch channel.
///
/// Fetches are strictly sequential: the next interval tick is not awaited
/// until the previous response has been processed, so there is at most one
/// in-flight request per poller. `stop` cancels the timer immediately; a
/// response already in flight completes and its value is simply the last
/// one written.
pub struct RunTimelinePoller {
    cancel: CancellationToken,
    rx: watch::Receiver<RunView>,
    task: Option<JoinHandle<()>>,
}

impl RunTimelinePoller {
    pub fn spawn(client: AutonomyClient, run_id: impl Into<String>, period: Duration) -> Self {
        let run_id = run_id.into();
        let (tx, rx) = watch::channel(RunView::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(client, run_id, period, tx, cancel.clone()));
        Self {
            cancel,
            rx,
            task: Some(task),
        }
    }

    /// Watch receiver for consumers that want change notifications.
    pub fn subscribe(&self) -> watch::Receiver<RunView> {
        self.rx.clone()
    }

    pub fn latest(&self) -> RunView {
        self.rx.borrow().clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.task.as_ref().map(|t| t.is_finished()).unwrap_or(true)
    }

    /// Stop and wait for the poll task to wind down.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RunTimelinePoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    client: AutonomyClient,
    run_id: String,
    period: Duration,
    tx: watch::Sender<RunView>,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match client.get_run(&run_id).await {
            Ok(detail) => {
                tx.send_modify(|view| {
                    view.detail = Some(detail);
                    view.poll_error = None;
                });
            }
            Err(err) => {
                tracing::warn!(run_id = %run_id, error = %err, "run poll failed");
                tx.send_modify(|view| {
                    view.poll_error = Some(err.to_string());
                });
            }
        }
    }
}
