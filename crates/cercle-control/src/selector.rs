use cercle_types::{LastError, RunPlanStep, RunState, RunStatus, StepAction};

/// The slice of remote state the step selector consults.
#[derive(Debug, Clone, Default)]
pub struct StatusSnapshot {
    pub status: RunStatus,
    pub has_last_error: bool,
}

impl StatusSnapshot {
    pub fn new(status: RunStatus, last_error: Option<&LastError>) -> Self {
        Self {
            status,
            has_last_error: last_error.is_some(),
        }
    }

    pub fn from_state(state: &RunState, last_error: Option<&LastError>) -> Self {
        Self::new(state.status(), last_error)
    }
}

/// Heuristic selection of the current plan step from a run state snapshot.
///
/// Pure and memory-free: the current position is recomputed from the latest
/// snapshot on every call, never cached, so the rendered plan can never
/// drift from backend truth. Rules in priority order:
///
/// 1. empty plan selects index 0;
/// 2. a terminal status selects the last step (the plan is over);
/// 3. BLOCKED, or any last-error hint, selects the first approval step;
/// 4. otherwise the first non-approval step that is not a leading
///    bootstrap (`create_and_tick_once`) step;
/// 5. failing that, the first non-approval step, else index 0.
///
/// Rule 4 assumes the bootstrap step already completed by the time anyone
/// consults the plan. The backend never confirms that, so this is a best
/// guess about operator intent, kept deliberately as a guess.
pub fn select_current_step(steps: &[RunPlanStep], snapshot: &StatusSnapshot) -> usize {
    if steps.is_empty() {
        return 0;
    }

    if snapshot.status.is_terminal() {
        return steps.len() - 1;
    }

    if snapshot.status.is_blocked() || snapshot.has_last_error {
        if let Some(idx) = steps.iter().position(|s| s.requires_approval) {
            return idx;
        }
    }

    let next_actionable = steps.iter().enumerate().position(|(idx, s)| {
        !s.requires_approval && !(idx == 0 && s.action_type == StepAction::CreateAndTickOnce)
    });
    if let Some(idx) = next_actionable {
        return idx;
    }

    steps.iter().position(|s| !s.requires_approval).unwrap_or(0)
}
