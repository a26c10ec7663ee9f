//! Bounded validate / correct loop over generated projects.
//!
//! This module provides:
//! - issue classification from validator messages, in fixed priority order
//! - code-block extraction from free-text collaborator responses
//! - the [`SelfCorrector`] state machine

mod classify;

pub use classify::{classify, extract_code_block, ErrorKind, ValidationIssue};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::Result;
use crate::generator::validate_structure;
use crate::obs;
use crate::project::{ProjectOutput, ROOT_FILE};
use crate::trace::TaskTracer;

/// Free-text generation capability used to obtain corrected code.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Bounded correction policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionPolicy {
    /// Maximum number of correction requests per run.
    pub max_iterations: u32,
}

impl Default for CorrectionPolicy {
    fn default() -> Self {
        Self { max_iterations: 3 }
    }
}

/// Loop state. `Succeeded`, `Failed` and `Partial` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Validating,
    RequestingCorrection,
    Succeeded,
    Failed,
    /// Budget exhausted or collaborator gave up after at least one applied
    /// correction.
    Partial,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Succeeded | LoopState::Failed | LoopState::Partial)
    }
}

/// Result of one loop run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionOutcome {
    pub success: bool,
    pub final_state: LoopState,
    pub original: ProjectOutput,
    /// Present only when at least one correction was applied.
    pub corrected: Option<ProjectOutput>,
    /// Every issue seen, across all iterations.
    pub issues: Vec<ValidationIssue>,
    /// Kinds addressed by applied corrections, first occurrence order.
    pub fixes_applied: Vec<ErrorKind>,
    /// Correction requests made.
    pub iterations: u32,
}

impl CorrectionOutcome {
    /// The corrected project when one exists, else the original.
    pub fn best(&self) -> &ProjectOutput {
        self.corrected.as_ref().unwrap_or(&self.original)
    }
}

/// Validate every configuration file and classify each failure.
pub fn validate_project(project: &ProjectOutput) -> Vec<ValidationIssue> {
    project
        .config_files()
        .filter_map(|file| {
            let check = validate_structure(&file.content);
            if check.valid {
                None
            } else {
                classify(&file.name, &check.message)
            }
        })
        .collect()
}

/// Prompt asking the collaborator to fix every listed issue.
pub fn correction_prompt(issues: &[ValidationIssue], current_root: Option<&str>) -> String {
    let listing: Vec<String> = issues
        .iter()
        .map(|i| format!("- {}: {}", i.file, i.message))
        .collect();

    let mut prompt = format!(
        "The generated Terraform code has the following errors:\n\n{}\n\n\
         Please fix these errors and regenerate the corrected code. Focus on:\n\
         1. Adding any missing required arguments\n\
         2. Fixing resource references\n\
         3. Correcting syntax errors\n\n",
        listing.join("\n")
    );
    if let Some(root) = current_root {
        prompt.push_str(&format!("Current {ROOT_FILE}:\n```hcl\n{root}\n```\n\n"));
    }
    prompt.push_str(&format!("Provide the corrected {ROOT_FILE} content in a single ```hcl code block."));
    prompt
}

/// Drives the validate / correct state machine.
pub struct SelfCorrector {
    generator: Arc<dyn TextGenerator>,
    policy: CorrectionPolicy,
}

impl SelfCorrector {
    pub fn new(generator: Arc<dyn TextGenerator>, policy: CorrectionPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> &CorrectionPolicy {
        &self.policy
    }

    /// Run the loop to a terminal state. Never errors; collaborator failures
    /// end the run as `Failed` or `Partial`.
    pub async fn run(&self, project: &ProjectOutput, tracer: &TaskTracer) -> CorrectionOutcome {
        let mut current = project.clone();
        let mut corrected: Option<ProjectOutput> = None;
        let mut issues_seen: Vec<ValidationIssue> = Vec::new();
        let mut fixes_applied: Vec<ErrorKind> = Vec::new();
        let mut iterations = 0u32;
        let mut state = LoopState::Validating;
        let mut pending: Vec<ValidationIssue> = Vec::new();

        while !state.is_terminal() {
            state = match state {
                LoopState::Validating => {
                    pending = validate_project(&current);
                    if pending.is_empty() {
                        LoopState::Succeeded
                    } else {
                        issues_seen.extend(pending.iter().cloned());
                        if iterations >= self.policy.max_iterations {
                            exhausted(&corrected)
                        } else {
                            LoopState::RequestingCorrection
                        }
                    }
                }
                LoopState::RequestingCorrection => {
                    iterations += 1;
                    tracer.action(
                        "self_correction_attempt",
                        Some(&to_map(json!({
                            "iteration": iterations,
                            "errors": pending.iter().map(|i| i.message.clone()).collect::<Vec<_>>(),
                        }))),
                        None,
                    );
                    obs::emit_correction_attempt(tracer.task_id(), iterations, pending.len());

                    match self.request_correction(&current, &pending, tracer).await {
                        Some(code) => {
                            current = current.with_root_replaced(&code);
                            corrected = Some(current.clone());
                            for issue in &pending {
                                if !fixes_applied.contains(&issue.kind) {
                                    fixes_applied.push(issue.kind);
                                }
                            }
                            LoopState::Validating
                        }
                        None => exhausted(&corrected),
                    }
                }
                terminal => terminal,
            };
        }

        let success = state == LoopState::Succeeded;
        let reward = if success {
            1.0
        } else if !fixes_applied.is_empty() {
            0.5
        } else {
            -0.5
        };
        tracer.reward(
            reward,
            to_map(json!({
                "self_correction": true,
                "iterations": iterations,
                "errors_fixed": fixes_applied.len(),
                "errors_remaining": if success { 0 } else { pending.len() },
            })),
        );
        obs::emit_correction_finished(tracer.task_id(), state, iterations, fixes_applied.len());

        CorrectionOutcome {
            success,
            final_state: state,
            original: project.clone(),
            corrected,
            issues: issues_seen,
            fixes_applied,
            iterations,
        }
    }

    async fn request_correction(
        &self,
        current: &ProjectOutput,
        issues: &[ValidationIssue],
        tracer: &TaskTracer,
    ) -> Option<String> {
        let prompt = correction_prompt(issues, current.root().map(|f| f.content.as_str()));
        match self.generator.generate(&prompt).await {
            Ok(response) => {
                let code = extract_code_block(&response);
                if code.is_none() {
                    warn!(event = "correction.no_code_block", task_id = %tracer.task_id());
                }
                code
            }
            Err(err) => {
                warn!(event = "correction.generator_failed", task_id = %tracer.task_id(), error = %err);
                tracer.action(
                    "self_correction_failed",
                    None,
                    Some(&to_map(json!({ "error": err.to_string() }))),
                );
                None
            }
        }
    }
}

fn exhausted(corrected: &Option<ProjectOutput>) -> LoopState {
    if corrected.is_some() {
        LoopState::Partial
    } else {
        LoopState::Failed
    }
}

fn to_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
