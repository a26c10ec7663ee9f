//! Task telemetry at the system boundary.
//!
//! Every payload passes through [`sanitize`] before it reaches a
//! [`TelemetrySink`]. Sinks are shared across concurrent tasks, so each
//! [`TraceEvent`] carries its own task id and no task identity is ever stored
//! in the sink. The per-task [`TaskTracer`] owns the id.

use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

/// Replacement for redacted values.
pub const REDACTED: &str = "***REDACTED***";

/// Maximum characters of task output forwarded to a sink.
pub const OUTPUT_TRUNCATION_LENGTH: usize = 500;

/// Keys whose values never leave the process.
pub const BLOCKLISTED_KEYS: [&str; 8] = [
    "api_key",
    "password",
    "secret",
    "token",
    "connection_string",
    "client_secret",
    "sas_token",
    "access_key",
];

const SENSITIVE_VALUE_MARKERS: [&str; 4] = ["password=", "key=", "token=", "secret="];

/// Redact blocklisted keys and credential-looking string values.
///
/// Only top-level entries are inspected; a redacted value is replaced
/// whole, never partially masked.
pub fn sanitize(data: &Map<String, Value>) -> Map<String, Value> {
    data.iter()
        .map(|(key, value)| {
            let lower_key = key.to_lowercase();
            let sensitive_key = BLOCKLISTED_KEYS.contains(&lower_key.as_str());
            let sensitive_value = value.as_str().is_some_and(|s| {
                let lower = s.to_lowercase();
                SENSITIVE_VALUE_MARKERS.iter().any(|m| lower.contains(m))
            });
            if sensitive_key || sensitive_value {
                (key.clone(), Value::String(REDACTED.to_string()))
            } else {
                (key.clone(), value.clone())
            }
        })
        .collect()
}

fn truncate(text: &str) -> String {
    text.chars().take(OUTPUT_TRUNCATION_LENGTH).collect()
}

/// One telemetry event, already sanitized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceEvent {
    Start {
        task_id: String,
        input: Map<String, Value>,
        at: DateTime<Utc>,
    },
    Action {
        task_id: String,
        action: String,
        input: Option<Map<String, Value>>,
        output: Option<Map<String, Value>>,
        at: DateTime<Utc>,
    },
    Reward {
        task_id: String,
        reward: f64,
        metadata: Map<String, Value>,
        at: DateTime<Utc>,
    },
    End {
        task_id: String,
        success: bool,
        output: Option<String>,
        at: DateTime<Utc>,
    },
}

impl TraceEvent {
    pub fn task_id(&self) -> &str {
        match self {
            TraceEvent::Start { task_id, .. }
            | TraceEvent::Action { task_id, .. }
            | TraceEvent::Reward { task_id, .. }
            | TraceEvent::End { task_id, .. } => task_id,
        }
    }
}

/// Receiver of sanitized trace events. Must tolerate concurrent callers.
pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: TraceEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl TelemetrySink for NoopSink {
    fn emit(&self, _event: TraceEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl TelemetrySink for LogSink {
    fn emit(&self, event: TraceEvent) {
        let payload = serde_json::to_string(&event).unwrap_or_default();
        match &event {
            TraceEvent::Start { task_id, .. } => {
                info!(event = "telemetry.start", task_id = %task_id, payload = %payload);
            }
            TraceEvent::Action {
                task_id, action, ..
            } => {
                info!(event = "telemetry.action", task_id = %task_id, action = %action, payload = %payload);
            }
            TraceEvent::Reward {
                task_id, reward, ..
            } => {
                info!(event = "telemetry.reward", task_id = %task_id, reward = *reward, payload = %payload);
            }
            TraceEvent::End {
                task_id, success, ..
            } => {
                info!(event = "telemetry.end", task_id = %task_id, success = *success);
            }
        }
    }
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TraceEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TraceEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn events_for(&self, task_id: &str) -> Vec<TraceEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.task_id() == task_id)
            .collect()
    }
}

impl TelemetrySink for MemorySink {
    fn emit(&self, event: TraceEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Task-scoped handle onto a shared sink.
#[derive(Clone)]
pub struct TaskTracer {
    task_id: String,
    sink: Arc<dyn TelemetrySink>,
}

impl std::fmt::Debug for TaskTracer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskTracer")
            .field("task_id", &self.task_id)
            .finish_non_exhaustive()
    }
}

impl TaskTracer {
    /// Begin a task and emit its start event.
    pub fn start(
        sink: Arc<dyn TelemetrySink>,
        task_id: impl Into<String>,
        input: &Map<String, Value>,
    ) -> Self {
        let tracer = Self {
            task_id: task_id.into(),
            sink,
        };
        tracer.sink.emit(TraceEvent::Start {
            task_id: tracer.task_id.clone(),
            input: sanitize(input),
            at: Utc::now(),
        });
        tracer
    }

    /// A tracer that emits nowhere.
    pub fn disabled() -> Self {
        Self {
            task_id: String::new(),
            sink: Arc::new(NoopSink),
        }
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn action(
        &self,
        action: &str,
        input: Option<&Map<String, Value>>,
        output: Option<&Map<String, Value>>,
    ) {
        self.sink.emit(TraceEvent::Action {
            task_id: self.task_id.clone(),
            action: action.to_string(),
            input: input.map(sanitize),
            output: output.map(sanitize),
            at: Utc::now(),
        });
    }

    pub fn reward(&self, reward: f64, metadata: Map<String, Value>) {
        self.sink.emit(TraceEvent::Reward {
            task_id: self.task_id.clone(),
            reward,
            metadata,
            at: Utc::now(),
        });
    }

    /// Finish the task. Output is truncated before it is forwarded.
    pub fn end(self, success: bool, output: Option<&str>) {
        self.sink.emit(TraceEvent::End {
            task_id: self.task_id.clone(),
            success,
            output: output.filter(|o| !o.is_empty()).map(truncate),
            at: Utc::now(),
        });
    }

    /// Run a tool future, recording its invocation, completion or error as
    /// `tool:<name>`, `tool:<name>:complete` and `tool:<name>:error` actions.
    pub async fn trace_tool<T, E, F>(&self, tool: &str, args: &str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        T: std::fmt::Debug,
        E: Display,
    {
        let mut input = Map::new();
        input.insert("args".to_string(), Value::String(truncate(args)));
        self.action(&format!("tool:{tool}"), Some(&input), None);

        let result = fut.await;
        let mut output = Map::new();
        match &result {
            Ok(value) => {
                output.insert("result".to_string(), Value::String(truncate(&format!("{value:?}"))));
                self.action(&format!("tool:{tool}:complete"), None, Some(&output));
            }
            Err(err) => {
                output.insert("error".to_string(), Value::String(truncate(&err.to_string())));
                self.action(&format!("tool:{tool}:error"), None, Some(&output));
            }
        }
        result
    }
}
