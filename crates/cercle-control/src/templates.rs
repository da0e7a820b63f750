// Built-in template catalog. Templates are client-defined and statically
// enumerated; the operator picks one at run creation.

use cercle_types::{
    BuilderRunTemplate, JobType, RunPlanStep, RunPlanTemplate, StepAction, TaskKind,
    TemplateDefaults,
};

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Single-shot templates: form defaults only, no step plan.
pub fn builder_run_templates() -> Vec<BuilderRunTemplate> {
    vec![
        BuilderRunTemplate {
            id: "doc_patch".to_string(),
            title: "Doc patch (README/docs only)".to_string(),
            description: "Safest patch template limited to docs.".to_string(),
            defaults: TemplateDefaults {
                kind: TaskKind::Patch,
                job_type: JobType::CodingLane,
                env: "dev".to_string(),
                lane: "innovation".to_string(),
                description: "Update docs with minimal changes.".to_string(),
                paths: strings(&["README.md", "docs/"]),
                constraints: strings(&[
                    "Only modify documentation files (README.md, docs/*).",
                    "Do not change runtime behavior.",
                    "Keep edits minimal and focused.",
                ]),
            },
        },
        BuilderRunTemplate {
            id: "fix_test".to_string(),
            title: "Fix failing test (minimal diff)".to_string(),
            description: "Patch to address one failing test with smallest change.".to_string(),
            defaults: TemplateDefaults {
                kind: TaskKind::Patch,
                job_type: JobType::CodingLane,
                env: "dev".to_string(),
                lane: "innovation".to_string(),
                description: "Fix a failing test with minimal diff.".to_string(),
                paths: strings(&["tests/"]),
                constraints: strings(&[
                    "Target only the failing test and minimal required code.",
                    "No refactors unless required for fix.",
                    "Run relevant tests after changes.",
                ]),
            },
        },
        BuilderRunTemplate {
            id: "audit_only".to_string(),
            title: "Audit only (no patch)".to_string(),
            description: "Run an audit-style objective; no edits expected.".to_string(),
            defaults: TemplateDefaults {
                kind: TaskKind::Audit,
                job_type: JobType::CodingLane,
                env: "dev".to_string(),
                lane: "innovation".to_string(),
                description: "Audit current behavior and report findings.".to_string(),
                paths: Vec::new(),
                constraints: strings(&[
                    "Do not modify files.",
                    "Produce actionable findings and file pointers.",
                ]),
            },
        },
    ]
}

/// Templates that overlay a step plan on the run.
pub fn run_plan_templates() -> Vec<RunPlanTemplate> {
    vec![
        RunPlanTemplate {
            id: "code_review_workflow".to_string(),
            title: "Code Review Workflow".to_string(),
            description: "Guided code review with approve steps.".to_string(),
            defaults: TemplateDefaults {
                kind: TaskKind::Patch,
                job_type: JobType::CodingLane,
                env: "dev".to_string(),
                lane: "innovation".to_string(),
                description: "Run a code review with manual approval steps.".to_string(),
                paths: Vec::new(),
                constraints: Vec::new(),
            },
            steps: vec![
                RunPlanStep {
                    id: "create_and_initial_tick".to_string(),
                    title: "Create & Initial Analysis".to_string(),
                    description: "Create run and perform initial analysis.".to_string(),
                    action_type: StepAction::CreateAndTickOnce,
                    requires_approval: false,
                },
                RunPlanStep {
                    id: "review_changes".to_string(),
                    title: "Review Changes".to_string(),
                    description: "Review the proposed changes and decide whether to approve."
                        .to_string(),
                    action_type: StepAction::ApproveAndTick,
                    requires_approval: true,
                },
                RunPlanStep {
                    id: "finalize".to_string(),
                    title: "Finalize".to_string(),
                    description: "Complete the review and apply changes.".to_string(),
                    action_type: StepAction::Continue,
                    requires_approval: false,
                },
            ],
        },
        RunPlanTemplate {
            id: "feature_deployment".to_string(),
            title: "Feature Deployment".to_string(),
            description: "Multi-step feature deployment with safety checks.".to_string(),
            defaults: TemplateDefaults {
                kind: TaskKind::Patch,
                job_type: JobType::CodingLane,
                env: "dev".to_string(),
                lane: "innovation".to_string(),
                description: "Deploy a new feature with incremental steps.".to_string(),
                paths: Vec::new(),
                constraints: Vec::new(),
            },
            steps: vec![
                RunPlanStep {
                    id: "create_and_plan".to_string(),
                    title: "Create & Plan".to_string(),
                    description: "Create run and generate deployment plan.".to_string(),
                    action_type: StepAction::CreateAndTickOnce,
                    requires_approval: false,
                },
                RunPlanStep {
                    id: "approve_deployment".to_string(),
                    title: "Approve Deployment".to_string(),
                    description: "Approve the deployment plan before execution.".to_string(),
                    action_type: StepAction::ApproveAndTick,
                    requires_approval: true,
                },
                RunPlanStep {
                    id: "execute_deployment".to_string(),
                    title: "Execute Deployment".to_string(),
                    description: "Execute the deployment steps.".to_string(),
                    action_type: StepAction::Continue,
                    requires_approval: false,
                },
                RunPlanStep {
                    id: "verify_deployment".to_string(),
                    title: "Verify Deployment".to_string(),
                    description: "Verify deployment success.".to_string(),
                    action_type: StepAction::TickOnce,
                    requires_approval: false,
                },
            ],
        },
    ]
}

pub fn find_run_plan_template(id: &str) -> Option<RunPlanTemplate> {
    run_plan_templates().into_iter().find(|tpl| tpl.id == id)
}
