use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Map;
use tf_avm_core::project::{PROVIDERS_FILE, ROOT_FILE};
use tf_avm_core::{
    AvmError, CorrectionPolicy, ErrorKind, GeneratedFile, LoopState, MemorySink, ProjectOutput,
    SelfCorrector, TaskTracer, TextGenerator, TraceEvent,
};

const PROVIDERS: &str = "terraform {\n  required_version = \">= 1.9.0\"\n}\n";

const MISSING_VERSION: &str = r#"resource "azurerm_resource_group" "main" {
  name     = "rg-demo"
  location = "eastus"
}

module "key_vault" {
  source              = "Azure/avm-res-keyvault-vault/azurerm"
  resource_group_name = azurerm_resource_group.main.name
}
"#;

const UNDEFINED_REFERENCE: &str = r#"resource "azurerm_resource_group" "main" {
  name     = "rg-demo"
  location = "eastus"
}

module "key_vault" {
  source              = "Azure/avm-res-keyvault-vault/azurerm"
  version             = "~> 0.9"
  resource_group_name = azurerm_resource_group.main.name
  depends_on          = [module.network]
}
"#;

const FIXED: &str = r#"resource "azurerm_resource_group" "main" {
  name     = "rg-demo"
  location = "eastus"
}

module "key_vault" {
  source              = "Azure/avm-res-keyvault-vault/azurerm"
  version             = "~> 0.9"
  resource_group_name = azurerm_resource_group.main.name
  depends_on          = [azurerm_resource_group.main]
}
"#;

/// Replays canned responses and records every prompt it saw.
struct Scripted {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(replies: Vec<Result<String, String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for Scripted {
    async fn generate(&self, prompt: &str) -> tf_avm_core::Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        match self.replies.lock().unwrap().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(e)) => Err(AvmError::Generation(e)),
            None => Ok("I have nothing more to add.".to_string()),
        }
    }
}

fn hcl(code: &str) -> Result<String, String> {
    Ok(format!("Here is the fix:\n\n```hcl\n{code}```\n"))
}

fn project(root: &str) -> ProjectOutput {
    ProjectOutput::new(
        vec![
            GeneratedFile::new(ROOT_FILE, root),
            GeneratedFile::new(PROVIDERS_FILE, PROVIDERS),
        ],
        "demo",
    )
}

fn tracer(sink: &Arc<MemorySink>, task_id: &str) -> TaskTracer {
    TaskTracer::start(sink.clone(), task_id, &Map::new())
}

#[tokio::test]
async fn two_step_repair_succeeds_and_records_fixes() {
    let generator = Scripted::new(vec![hcl(UNDEFINED_REFERENCE), hcl(FIXED)]);
    let corrector = SelfCorrector::new(generator.clone(), CorrectionPolicy::default());
    let sink = Arc::new(MemorySink::new());

    let outcome = corrector
        .run(&project(MISSING_VERSION), &tracer(&sink, "task-repair"))
        .await;

    assert!(outcome.success);
    assert_eq!(outcome.final_state, LoopState::Succeeded);
    assert_eq!(outcome.iterations, 2);
    assert_eq!(
        outcome.fixes_applied,
        vec![ErrorKind::MissingArgument, ErrorKind::UndefinedReference]
    );

    let corrected = outcome.corrected.as_ref().unwrap();
    assert_eq!(corrected.root().unwrap().content, FIXED.trim());
    assert_eq!(corrected.file(PROVIDERS_FILE).unwrap().content, PROVIDERS);
    assert_eq!(corrected.summary.matches("[Self-corrected]").count(), 1);
    assert_eq!(outcome.original, project(MISSING_VERSION));

    let prompts = generator.prompts();
    assert!(prompts[0].contains("Missing required argument: \"version\""));
    assert!(prompts[1].contains("Reference to undefined resource \"network\""));

    let events = sink.events_for("task-repair");
    let attempts = events
        .iter()
        .filter(|e| matches!(e, TraceEvent::Action { action, .. } if action == "self_correction_attempt"))
        .count();
    assert_eq!(attempts, 2);
    assert!(events
        .iter()
        .any(|e| matches!(e, TraceEvent::Reward { reward, .. } if *reward == 1.0)));
}

#[tokio::test]
async fn loop_is_bounded_when_every_correction_is_still_broken() {
    let generator = Scripted::new(vec![
        hcl(MISSING_VERSION),
        hcl(MISSING_VERSION),
        hcl(MISSING_VERSION),
        hcl(MISSING_VERSION),
        hcl(MISSING_VERSION),
    ]);
    let policy = CorrectionPolicy { max_iterations: 3 };
    let corrector = SelfCorrector::new(generator.clone(), policy);

    let outcome = corrector
        .run(&project(MISSING_VERSION), &TaskTracer::disabled())
        .await;

    assert!(!outcome.success);
    assert_eq!(outcome.final_state, LoopState::Partial);
    assert_eq!(outcome.iterations, 3);
    assert_eq!(generator.prompts().len(), 3);
    assert!(outcome.corrected.is_some());
    assert_eq!(outcome.issues.len(), 4);
}

#[tokio::test]
async fn response_without_code_block_fails() {
    let generator = Scripted::new(vec![Ok("Sorry, I cannot help with that.".to_string())]);
    let corrector = SelfCorrector::new(generator, CorrectionPolicy::default());
    let sink = Arc::new(MemorySink::new());

    let outcome = corrector
        .run(&project(MISSING_VERSION), &tracer(&sink, "task-silent"))
        .await;

    assert_eq!(outcome.final_state, LoopState::Failed);
    assert_eq!(outcome.iterations, 1);
    assert!(outcome.corrected.is_none());
    assert!(outcome.fixes_applied.is_empty());
    assert_eq!(outcome.best(), &outcome.original);
    assert!(sink
        .events_for("task-silent")
        .iter()
        .any(|e| matches!(e, TraceEvent::Reward { reward, .. } if *reward == -0.5)));
}

#[tokio::test]
async fn collaborator_error_after_a_fix_ends_partial() {
    let generator = Scripted::new(vec![
        hcl(UNDEFINED_REFERENCE),
        Err("upstream unavailable".to_string()),
    ]);
    let corrector = SelfCorrector::new(generator, CorrectionPolicy::default());
    let sink = Arc::new(MemorySink::new());

    let outcome = corrector
        .run(&project(MISSING_VERSION), &tracer(&sink, "task-flaky"))
        .await;

    assert_eq!(outcome.final_state, LoopState::Partial);
    assert!(!outcome.success);
    assert_eq!(outcome.fixes_applied, vec![ErrorKind::MissingArgument]);
    assert_eq!(
        outcome.best().root().unwrap().content,
        UNDEFINED_REFERENCE.trim()
    );

    let events = sink.events_for("task-flaky");
    assert!(events
        .iter()
        .any(|e| matches!(e, TraceEvent::Action { action, .. } if action == "self_correction_failed")));
    assert!(events
        .iter()
        .any(|e| matches!(e, TraceEvent::Reward { reward, .. } if *reward == 0.5)));
}

#[tokio::test]
async fn concurrent_runs_keep_task_ids_apart() {
    let sink = Arc::new(MemorySink::new());
    let runs = (0..4).map(|i| {
        let sink = sink.clone();
        async move {
            let generator = Scripted::new(vec![hcl(FIXED)]);
            let corrector = SelfCorrector::new(generator, CorrectionPolicy::default());
            let task = tracer(&sink, &format!("task-{i}"));
            corrector.run(&project(MISSING_VERSION), &task).await
        }
    });
    let outcomes = futures::future::join_all(runs).await;
    assert!(outcomes.iter().all(|o| o.success));

    for i in 0..4 {
        let events = sink.events_for(&format!("task-{i}"));
        // start, one attempt, reward
        assert_eq!(events.len(), 3);
    }
}
