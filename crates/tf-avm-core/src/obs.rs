//! Structured lifecycle events for generation, correction and scoring.
//!
//! Every event carries an `event = "<area>.<action>"` field so log
//! pipelines can filter on it. Levels follow `RUST_LOG`.

use tracing::{info, warn};

use crate::correction::LoopState;

/// RAII guard that keeps a task-scoped span entered.
///
/// ```ignore
/// let _span = TaskSpan::enter("task-42");
/// // events below carry task_id = "task-42"
/// ```
pub struct TaskSpan {
    _span: tracing::span::EnteredSpan,
}

impl TaskSpan {
    pub fn enter(task_id: &str) -> Self {
        let span = tracing::info_span!("tf_avm.task", task_id = %task_id);
        Self {
            _span: span.entered(),
        }
    }
}

/// A project was rendered.
pub fn emit_project_generated(project: &str, modules: usize, files: usize) {
    info!(
        event = "project.generated",
        project = %project,
        modules = modules,
        files = files,
    );
}

/// A correction was requested from the collaborator.
pub fn emit_correction_attempt(task_id: &str, iteration: u32, issues: usize) {
    info!(
        event = "correction.attempt",
        task_id = %task_id,
        iteration = iteration,
        issues = issues,
    );
}

pub fn emit_correction_finished(task_id: &str, state: LoopState, iterations: u32, fixes: usize) {
    info!(
        event = "correction.finished",
        task_id = %task_id,
        state = ?state,
        iterations = iterations,
        fixes = fixes,
    );
}

pub fn emit_reward_scored(total: f64, has_root: bool) {
    info!(event = "reward.scored", total = total, has_root = has_root);
}

/// An external tool could not give an answer and its check was treated as
/// passing.
pub fn emit_tool_downgraded(tool: &str, reason: &str) {
    warn!(event = "tool.downgraded", tool = %tool, reason = %reason);
}
