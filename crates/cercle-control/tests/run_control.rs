// End-to-end controller behavior against an in-process backend.

mod support;

use std::sync::Arc;
use std::time::Duration;

use support::mock_backend::MockBackend;
use tempfile::tempdir;

use cercle_client::{ApiConfig, AutonomyClient};
use cercle_control::{
    find_run_plan_template, launch_run, launch_run_with_plan, ActionOutcome, PlanStore,
    RecoveryController, RunHeaderController, RunPlanPanelController, RunTimelinePoller,
    RunView, WorkerOverviewController,
};
use cercle_types::{RunMode, RunState, StartRunRequest, TaskKind, TaskSpec};

fn client_for(backend: &MockBackend) -> AutonomyClient {
    AutonomyClient::new(ApiConfig::new(&backend.base_url))
}

fn patch_request() -> StartRunRequest {
    StartRunRequest {
        task: TaskSpec {
            id: "cockpit-test".to_string(),
            kind: TaskKind::Patch,
            description: "apply a minimal patch".to_string(),
            repo_root: Some(".".to_string()),
            paths: Vec::new(),
            constraints: Vec::new(),
            tags: Default::default(),
            lane: Some("innovation".to_string()),
        },
        job_type: None,
    }
}

async fn wait_for_view(
    rx: &mut tokio::sync::watch::Receiver<RunView>,
    mut accept: impl FnMut(&RunView) -> bool,
) -> RunView {
    tokio::time::timeout(Duration::from_secs(3), async {
        loop {
            {
                let view = rx.borrow();
                if accept(&view) {
                    return view.clone();
                }
            }
            rx.changed().await.expect("poller alive");
        }
    })
    .await
    .expect("view arrived in time")
}

#[tokio::test]
async fn launch_prefers_the_compound_endpoint() {
    let backend = MockBackend::spawn().await;
    let client = client_for(&backend);

    let outcome = launch_run(&client, &patch_request()).await.unwrap();
    assert_eq!(outcome.run_id, "run-100");
    assert!(outcome.created);
    assert!(outcome.ticked);

    assert_eq!(backend.calls("start_and_tick_once"), 1);
    assert_eq!(backend.calls("start"), 0);
    assert_eq!(backend.calls("tick"), 0);
}

#[tokio::test]
async fn launch_falls_back_to_start_then_tick() {
    let backend = MockBackend::spawn().await;
    backend.configure(|s| s.fail_start_and_tick = true);
    let client = client_for(&backend);

    let outcome = launch_run(&client, &patch_request()).await.unwrap();
    assert!(outcome.created);
    assert!(outcome.ticked);

    assert_eq!(backend.calls("start_and_tick_once"), 1);
    assert_eq!(backend.calls("start"), 1);
    assert_eq!(backend.calls("tick"), 1);
}

#[tokio::test]
async fn launch_survives_a_failing_fallback_tick() {
    let backend = MockBackend::spawn().await;
    backend.configure(|s| {
        s.fail_start_and_tick = true;
        s.fail_tick = true;
    });
    let client = client_for(&backend);

    let outcome = launch_run(&client, &patch_request())
        .await
        .expect("creation still resolves");
    assert_eq!(outcome.run_id, "run-100");
    assert!(outcome.created);
    assert!(!outcome.ticked);
    assert_eq!(backend.calls("tick"), 1);
}

#[tokio::test]
async fn launch_with_plan_persists_the_instance() {
    let backend = MockBackend::spawn().await;
    let client = client_for(&backend);
    let temp = tempdir().unwrap();
    let store = PlanStore::new(temp.path()).unwrap();
    let template = find_run_plan_template("code_review_workflow").unwrap();

    let outcome = launch_run_with_plan(&client, &patch_request(), &template, &store)
        .await
        .unwrap();

    let stored = store.load(&outcome.run_id).unwrap().expect("plan saved");
    assert_eq!(stored.template_id, "code_review_workflow");
    assert_eq!(stored.steps.len(), 3);
}

#[tokio::test]
async fn header_actions_replace_cached_state() {
    let backend = MockBackend::spawn().await;
    backend.set_status("RUNNING");
    let client = client_for(&backend);
    let header = RunHeaderController::new(client, "run-100", RunState::default());

    let outcome = header.tick().await.unwrap();
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(header.state().await.step_idx(), 1);
    assert_eq!(header.status().await.as_str(), "RUNNING");

    let outcome = header.halt(Some("operator drill")).await.unwrap();
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(header.status().await.as_str(), "HALT");
    assert_eq!(header.state().await.halt_reason(), Some("operator drill"));

    // Already halted: nothing goes out.
    let halts_before = backend.calls("halt");
    assert_eq!(header.halt(None).await.unwrap(), ActionOutcome::Skipped);
    assert_eq!(backend.calls("halt"), halts_before);
}

#[tokio::test]
async fn busy_gate_blocks_concurrent_submissions() {
    let backend = MockBackend::spawn().await;
    backend.configure(|s| {
        s.status = "RUNNING".to_string();
        s.tick_delay = Duration::from_millis(200);
    });
    let client = client_for(&backend);
    let header = Arc::new(RunHeaderController::new(
        client,
        "run-100",
        RunState::default(),
    ));

    let first = {
        let header = header.clone();
        tokio::spawn(async move { header.tick().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    let second = header.tick().await.unwrap();

    assert_eq!(second, ActionOutcome::Skipped);
    assert_eq!(first.await.unwrap(), ActionOutcome::Applied);
    assert_eq!(backend.calls("tick"), 1);
}

#[tokio::test]
async fn approve_and_resume_sends_the_approval_flag() {
    let backend = MockBackend::spawn().await;
    backend.set_status("BLOCKED");
    let client = client_for(&backend);

    let initial: RunState =
        serde_json::from_value(serde_json::json!({"status": "BLOCKED"})).unwrap();
    let header = RunHeaderController::new(client, "run-100", initial);

    let outcome = header.approve_and_resume().await.unwrap();
    assert_eq!(outcome, ActionOutcome::Applied);
    assert_eq!(header.status().await.as_str(), "RUNNING");
}

#[tokio::test]
async fn set_mode_policy_rejection_is_swallowed() {
    let backend = MockBackend::spawn().await;
    backend.configure(|s| s.reject_set_mode = true);
    let client = client_for(&backend);
    let header = RunHeaderController::new(client, "run-100", RunState::default());

    let outcome = header.set_mode(RunMode::Autonomous).await;
    assert_eq!(outcome, ActionOutcome::Rejected);
    // The rejection is logged, not surfaced as a view error.
    assert!(header.last_error().await.is_none());
    assert!(!header.is_busy());
}

#[tokio::test]
async fn recovery_actions_gate_their_calls() {
    let backend = MockBackend::spawn().await;
    backend.set_status("FAILED");
    let client = client_for(&backend);
    let recovery = RecoveryController::new(client.clone(), "run-100");

    let detail = client.get_run("run-100").await.unwrap();
    recovery
        .observe(cercle_control::StatusSnapshot::from_state(
            &detail.state,
            detail.last_error.as_ref(),
        ))
        .await;

    let actions = recovery.actions().await;
    assert!(actions.can_retry);
    assert!(!actions.can_approve_and_continue);
    assert!(!actions.can_continue);

    // Disabled actions never reach the wire.
    assert_eq!(
        recovery.continue_run().await.unwrap(),
        ActionOutcome::Skipped
    );
    assert_eq!(backend.calls("continue"), 0);

    assert_eq!(recovery.retry().await.unwrap(), ActionOutcome::Applied);
    assert_eq!(backend.calls("retry"), 1);
}

#[tokio::test]
async fn poller_replaces_state_and_preserves_it_across_failures() {
    let backend = MockBackend::spawn().await;
    backend.set_status("RUNNING");
    let client = client_for(&backend);

    let poller = RunTimelinePoller::spawn(client, "run-100", Duration::from_millis(30));
    let mut rx = poller.subscribe();

    let view = wait_for_view(&mut rx, |v| v.detail.is_some()).await;
    assert_eq!(
        view.detail.as_ref().unwrap().state.status().as_str(),
        "RUNNING"
    );
    assert!(view.poll_error.is_none());

    backend.configure(|s| s.fail_get_run = true);
    let view = wait_for_view(&mut rx, |v| v.poll_error.is_some()).await;
    // Last good tuple stays in place.
    assert_eq!(
        view.detail.as_ref().unwrap().state.status().as_str(),
        "RUNNING"
    );

    backend.configure(|s| {
        s.fail_get_run = false;
        s.status = "BLOCKED".to_string();
    });
    let view = wait_for_view(&mut rx, |v| {
        v.poll_error.is_none()
            && v.detail
                .as_ref()
                .is_some_and(|d| d.state.status().as_str() == "BLOCKED")
    })
    .await;
    assert!(view.poll_error.is_none());

    poller.shutdown().await;
    let polls_after_stop = backend.calls("get_run");
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(backend.calls("get_run"), polls_after_stop);
}

#[tokio::test]
async fn worker_overview_filters_to_autonomous_runs() {
    let backend = MockBackend::spawn().await;
    let client = client_for(&backend);
    let worker = WorkerOverviewController::new(client);

    worker.refresh().await.unwrap();
    let overview = worker.overview().await;
    assert!(overview.status.as_ref().is_some_and(|s| s.enabled));
    // The single mock run is in manual mode.
    assert!(overview.autonomous_runs.is_empty());

    backend.configure(|s| s.mode = "autonomous".to_string());
    worker.refresh().await.unwrap();
    let overview = worker.overview().await;
    assert_eq!(overview.autonomous_runs.len(), 1);
    assert_eq!(overview.autonomous_runs[0].run_id, "run-100");

    let summary = worker.tick_once().await.unwrap().expect("not busy");
    assert_eq!(summary.ticked, 1);
    assert_eq!(backend.calls("worker_tick_once"), 1);
    // The sweep refreshes the overview afterwards.
    assert!(worker.overview().await.last_tick.is_some());
}

#[tokio::test]
async fn code_review_flow_moves_the_highlight_with_backend_state() {
    let backend = MockBackend::spawn().await;
    let client = client_for(&backend);
    let temp = tempdir().unwrap();
    let store = PlanStore::new(temp.path()).unwrap();
    let template = find_run_plan_template("code_review_workflow").unwrap();

    // Launch with the plan; the mock leaves the run RUNNING after the
    // compound create + tick.
    let outcome = launch_run_with_plan(&client, &patch_request(), &template, &store)
        .await
        .unwrap();

    let panel = RunPlanPanelController::load(client.clone(), outcome.run_id.clone(), &store)
        .unwrap();
    assert!(panel.has_plan());

    let recovery = RecoveryController::new(client.clone(), outcome.run_id.clone());

    let detail = client.get_run(&outcome.run_id).await.unwrap();
    let snapshot =
        cercle_control::StatusSnapshot::from_state(&detail.state, detail.last_error.as_ref());
    panel.observe(snapshot.clone()).await;
    recovery.observe(snapshot).await;

    // Healthy run: bootstrap and approval steps are skipped.
    assert_eq!(panel.current_step_index().await, 2);
    assert!(panel.visible().await);

    // The run blocks awaiting approval.
    backend.set_status("BLOCKED");
    let detail = client.get_run(&outcome.run_id).await.unwrap();
    let snapshot =
        cercle_control::StatusSnapshot::from_state(&detail.state, detail.last_error.as_ref());
    panel.observe(snapshot.clone()).await;
    recovery.observe(snapshot).await;

    assert_eq!(panel.current_step_index().await, 1);
    let actions = recovery.actions().await;
    assert!(actions.can_approve_and_continue);
    assert!(!actions.can_retry);
    assert!(!actions.can_continue);

    // Approving through the panel's current step resumes the run.
    assert!(panel.can_execute_current_step().await);
    assert_eq!(
        panel.execute_current_step().await.unwrap(),
        ActionOutcome::Applied
    );
    assert_eq!(backend.calls("approve_and_tick"), 1);

    let detail = client.get_run(&outcome.run_id).await.unwrap();
    panel
        .observe(cercle_control::StatusSnapshot::from_state(
            &detail.state,
            detail.last_error.as_ref(),
        ))
        .await;
    assert_eq!(panel.current_step_index().await, 2);

    // Completion hides the plan overlay.
    backend.set_status("SUCCESS");
    let detail = client.get_run(&outcome.run_id).await.unwrap();
    panel
        .observe(cercle_control::StatusSnapshot::from_state(
            &detail.state,
            detail.last_error.as_ref(),
        ))
        .await;
    assert!(!panel.visible().await);
}
