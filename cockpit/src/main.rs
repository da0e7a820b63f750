use std::time::Duration;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};

use cercle_client::{ApiConfig, AutonomyClient};
use cercle_control::{
    builder_run_templates, find_run_plan_template, launch_run, launch_run_with_plan,
    run_plan_templates, PlanStore, RecoveryActions, RunTimelinePoller, WorkerOverviewController,
    DEFAULT_POLL_INTERVAL,
};
use cercle_observability::{default_logs_dir, init_process_logging, ProcessKind};
use cercle_types::{
    last_error_event, JobType, RunDetail, RunMode, StartRunRequest, TaskKind, TaskSpec,
};

#[derive(Parser, Debug)]
#[command(name = "cercle-cockpit")]
#[command(about = "Operator cockpit for Cercle autonomy runs")]
struct Cli {
    /// API base URL. Falls back to CERCLE_API_BASE_URL, then the live default.
    #[arg(long)]
    api_base: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List known runs
    Runs,
    /// Show one run's full detail
    Show { run_id: String },
    /// Follow a run until it reaches a terminal state
    Watch {
        run_id: String,
        /// Poll interval in milliseconds (default 2000)
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Create a run, optionally overlaying a plan
    Start(StartArgs),
    /// Advance a run one step
    Tick {
        run_id: String,
        /// Also approve a BLOCKED run
        #[arg(long)]
        approve: bool,
    },
    /// Halt a run
    Halt {
        run_id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// Retry a FAILED/ERROR run
    Retry { run_id: String },
    /// Give a healthy run one more tick
    Continue { run_id: String },
    /// Change a run's execution mode
    SetMode { run_id: String, mode: String },
    /// Background worker controls
    Worker {
        #[command(subcommand)]
        command: WorkerCommand,
    },
    /// List the built-in templates
    Templates,
}

#[derive(Subcommand, Debug)]
enum WorkerCommand {
    Status,
    Tick,
}

#[derive(Args, Debug)]
struct StartArgs {
    /// What the run should do
    #[arg(long)]
    description: String,
    /// analysis | plan | patch | audit
    #[arg(long, default_value = "patch")]
    kind: String,
    #[arg(long, default_value = "dev")]
    env: String,
    #[arg(long, default_value = "innovation")]
    lane: String,
    /// coding_lane | autobuilder | builder
    #[arg(long, default_value = "coding_lane")]
    job_type: String,
    /// Task id; generated when omitted
    #[arg(long)]
    task_id: Option<String>,
    /// Path scope, repeatable
    #[arg(long = "path")]
    paths: Vec<String>,
    /// Constraint line, repeatable
    #[arg(long = "constraint")]
    constraints: Vec<String>,
    /// Run plan template id (see `templates`)
    #[arg(long)]
    plan: Option<String>,
    /// Create only; skip the first tick
    #[arg(long)]
    no_tick: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Keep the appender guard alive for the process lifetime.
    let _log_guard = match default_logs_dir() {
        Some(dir) => Some(init_process_logging(ProcessKind::Cockpit, &dir, 14)?),
        None => None,
    };

    let config = match &cli.api_base {
        Some(url) => ApiConfig::new(url.clone()),
        None => ApiConfig::from_env(),
    };
    tracing::debug!(base_url = %config.base_url, "cockpit starting");
    let client = AutonomyClient::new(config);

    match cli.command {
        Command::Runs => cmd_runs(&client).await,
        Command::Show { run_id } => cmd_show(&client, &run_id).await,
        Command::Watch { run_id, interval_ms } => {
            let interval = interval_ms
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_POLL_INTERVAL);
            cmd_watch(client, &run_id, interval).await
        }
        Command::Start(args) => cmd_start(&client, args).await,
        Command::Tick { run_id, approve } => {
            let state = client.tick(&run_id, approve).await?;
            println!("ticked: status={} step={}", state.status(), state.step_idx());
            Ok(())
        }
        Command::Halt { run_id, reason } => {
            let state = client.halt(&run_id, reason.as_deref()).await?;
            println!(
                "halted: status={} reason={}",
                state.status(),
                state.halt_reason().unwrap_or("-")
            );
            Ok(())
        }
        Command::Retry { run_id } => {
            let state = client.retry(&run_id).await?;
            println!("retried: status={}", state.status());
            Ok(())
        }
        Command::Continue { run_id } => {
            let state = client.continue_run(&run_id).await?;
            println!("continued: status={} step={}", state.status(), state.step_idx());
            Ok(())
        }
        Command::SetMode { run_id, mode } => {
            let mode = RunMode::parse(&mode)
                .with_context(|| format!("unknown mode '{}'", mode))?;
            let state = client.set_mode(&run_id, mode).await?;
            println!("mode set: mode={} status={}", state.mode().as_str(), state.status());
            Ok(())
        }
        Command::Worker { command } => cmd_worker(&client, command).await,
        Command::Templates => {
            cmd_templates();
            Ok(())
        }
    }
}

async fn cmd_runs(client: &AutonomyClient) -> anyhow::Result<()> {
    let runs = client.list_runs().await?;
    if runs.is_empty() {
        println!("no runs");
        return Ok(());
    }
    for run in runs {
        println!(
            "{}  status={} env={} lane={} mode={} updated={}",
            run.run_id,
            run.status(),
            run.env.as_deref().unwrap_or("?"),
            run.lane.as_deref().unwrap_or("?"),
            run.mode.map(|m| m.as_str()).unwrap_or("?"),
            run.updated_at.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}

fn print_detail(run_id: &str, detail: &RunDetail) {
    let state = &detail.state;
    println!(
        "{}  status={} step={} env={} lane={} mode={}",
        run_id,
        state.status(),
        state.step_idx(),
        state.env(),
        state.lane(),
        state.mode().as_str(),
    );
    if let Some(reason) = state.halt_reason() {
        println!("halt_reason: {}", reason);
    }
    if let Some(job) = &detail.linked_job {
        println!(
            "linked job: {} type={} status={} message={}",
            job.job_id,
            job.job_type.as_deref().unwrap_or("-"),
            job.status.as_deref().unwrap_or("-"),
            job.message.as_deref().unwrap_or("-"),
        );
    }
    if let Some(err) = &detail.last_error {
        println!(
            "last error: source={} hint={}",
            err.source.as_deref().unwrap_or("-"),
            err.hint().unwrap_or_else(|| "-".to_string()),
        );
    } else if let Some(event) = last_error_event(&detail.events) {
        // No backend summary; fall back to the newest error event.
        println!("last error event: {}", event.event_type);
    }
}

async fn cmd_show(client: &AutonomyClient, run_id: &str) -> anyhow::Result<()> {
    let detail = client.get_run(run_id).await?;
    print_detail(run_id, &detail);

    println!("events (newest first):");
    for event in detail.events.iter().rev().take(20) {
        println!(
            "  {}  {}",
            event.ts.as_deref().unwrap_or("-"),
            event.event_type
        );
    }
    println!("state:");
    println!("{}", serde_json::to_string_pretty(&detail.state)?);
    Ok(())
}

async fn cmd_watch(
    client: AutonomyClient,
    run_id: &str,
    interval: Duration,
) -> anyhow::Result<()> {
    let poller = RunTimelinePoller::spawn(client, run_id, interval);
    let mut rx = poller.subscribe();

    let mut last_line = String::new();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("stopping watch");
                break;
            }
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }

        let view = rx.borrow().clone();
        if let Some(poll_error) = &view.poll_error {
            eprintln!("poll failed: {} (showing last good state)", poll_error);
        }
        let Some(detail) = &view.detail else { continue };

        let state = &detail.state;
        let line = format!(
            "status={} step={} mode={}",
            state.status(),
            state.step_idx(),
            state.mode().as_str()
        );
        if line != last_line {
            println!("{}", line);
            let actions = RecoveryActions::from_snapshot(&view.snapshot());
            if actions.can_approve_and_continue {
                println!("  run is blocked; approve with: tick {} --approve", run_id);
            }
            if actions.can_retry {
                println!("  run is recoverable; retry with: retry {}", run_id);
            }
            last_line = line;
        }

        if state.status().is_terminal() {
            println!("run reached {}; watch done", state.status());
            break;
        }
    }

    poller.shutdown().await;
    Ok(())
}

async fn cmd_start(client: &AutonomyClient, args: StartArgs) -> anyhow::Result<()> {
    let kind = parse_task_kind(&args.kind)?;
    let job_type = parse_job_type(&args.job_type)?;
    let task_id = args.task_id.clone().unwrap_or_else(generated_task_id);

    let mut tags = std::collections::BTreeMap::new();
    tags.insert("environment".to_string(), args.env.clone());
    tags.insert("lane".to_string(), args.lane.clone());

    let request = StartRunRequest {
        task: TaskSpec {
            id: task_id,
            kind,
            description: args.description.clone(),
            repo_root: Some(".".to_string()),
            paths: args.paths.clone(),
            constraints: args.constraints.clone(),
            tags,
            lane: Some(args.lane.clone()),
        },
        job_type: Some(job_type),
    };

    if args.no_tick {
        let response = client.start_run(&request).await?;
        println!("created {}", response.run_id);
        return Ok(());
    }

    let outcome = match &args.plan {
        Some(plan_id) => {
            let template = find_run_plan_template(plan_id).with_context(|| {
                let known: Vec<String> =
                    run_plan_templates().into_iter().map(|t| t.id).collect();
                format!("unknown plan template '{}' (known: {})", plan_id, known.join(", "))
            })?;
            let store = PlanStore::open_default()?;
            launch_run_with_plan(client, &request, &template, &store).await?
        }
        None => launch_run(client, &request).await?,
    };

    println!(
        "created {} (ticked={}{})",
        outcome.run_id,
        outcome.ticked,
        if args.plan.is_some() { ", plan stored" } else { "" },
    );
    if !outcome.ticked {
        println!("first tick failed; advance manually with: tick {}", outcome.run_id);
    }
    Ok(())
}

async fn cmd_worker(client: &AutonomyClient, command: WorkerCommand) -> anyhow::Result<()> {
    let controller = WorkerOverviewController::new(client.clone());
    match command {
        WorkerCommand::Status => {
            controller.refresh().await?;
        }
        WorkerCommand::Tick => {
            match controller.tick_once().await? {
                Some(summary) => println!(
                    "worker tick: enabled={} considered={} ticked={} skipped={} errors={}",
                    summary.enabled,
                    summary.considered,
                    summary.ticked,
                    summary.skipped,
                    summary.errors,
                ),
                None => println!("worker tick already in flight"),
            }
        }
    }

    let overview = controller.overview().await;
    if let Some(status) = &overview.status {
        println!(
            "worker: enabled={} last_tick_at={}",
            status.enabled,
            status.last_tick_at.as_deref().unwrap_or("-"),
        );
        if let Some(caps) = &status.caps {
            println!("caps: {}", serde_json::to_string_pretty(caps)?);
        }
    }
    if overview.autonomous_runs.is_empty() {
        println!("no runs currently in autonomous mode");
    } else {
        println!("autonomous runs:");
        for run in &overview.autonomous_runs {
            println!(
                "  {}  status={} env={} lane={}",
                run.run_id,
                run.status(),
                run.env.as_deref().unwrap_or("?"),
                run.lane.as_deref().unwrap_or("?"),
            );
        }
    }
    Ok(())
}

fn cmd_templates() {
    println!("single-run templates:");
    for tpl in builder_run_templates() {
        println!("  {}  {}", tpl.id, tpl.title);
    }
    println!("run plan templates:");
    for tpl in run_plan_templates() {
        println!("  {}  {} ({} steps)", tpl.id, tpl.title, tpl.steps.len());
        for step in &tpl.steps {
            println!(
                "    - {} [{}]{}",
                step.title,
                step.action_type,
                if step.requires_approval { " (requires approval)" } else { "" },
            );
        }
    }
}

fn generated_task_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("cockpit-{}", &hex[..12])
}

fn parse_task_kind(raw: &str) -> anyhow::Result<TaskKind> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "analysis" => Ok(TaskKind::Analysis),
        "plan" => Ok(TaskKind::Plan),
        "patch" => Ok(TaskKind::Patch),
        "audit" => Ok(TaskKind::Audit),
        other => bail!("unknown task kind '{}'", other),
    }
}

fn parse_job_type(raw: &str) -> anyhow::Result<JobType> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "coding_lane" => Ok(JobType::CodingLane),
        "autobuilder" => Ok(JobType::Autobuilder),
        "builder" => Ok(JobType::Builder),
        other => bail!("unknown job type '{}'", other),
    }
}
