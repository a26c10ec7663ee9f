use std::sync::Arc;

use proptest::prelude::*;
use serde_json::{json, Map, Value};
use tf_avm_core::rollout::{bucket, ENABLED_VAR, FRACTION_VAR};
use tf_avm_core::trace::{BLOCKLISTED_KEYS, OUTPUT_TRUNCATION_LENGTH, REDACTED};
use tf_avm_core::{sanitize, MemorySink, RolloutGate, TaskTracer, TraceEvent};

fn mixed_case(key: &str, mask: u32) -> String {
    key.chars()
        .enumerate()
        .map(|(i, c)| {
            if mask & (1 << (i % 32)) != 0 {
                c.to_ascii_uppercase()
            } else {
                c
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn blocklisted_keys_never_leak(
        key_index in 0usize..8,
        mask in any::<u32>(),
        secret in "[a-zA-Z0-9]{1,32}",
        noise in proptest::collection::btree_map("[a-z]{3,8}", "[a-z ]{0,16}", 0..5),
    ) {
        let key = mixed_case(BLOCKLISTED_KEYS[key_index], mask);
        let mut input: Map<String, Value> = noise
            .into_iter()
            .filter(|(k, _)| !BLOCKLISTED_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k, Value::String(v)))
            .collect();
        input.insert(key.clone(), Value::String(secret.clone()));

        let output = sanitize(&input);
        prop_assert_eq!(output.len(), input.len());
        prop_assert_ne!(&output[&key], &Value::String(secret));
        prop_assert_eq!(&output[&key], &Value::String(REDACTED.to_string()));
    }

    #[test]
    fn credential_markers_redact_whole_value(
        prefix in "[a-z ]{0,10}",
        marker in prop::sample::select(vec!["password=", "KEY=", "Token=", "secret="]),
        suffix in "[a-z0-9]{0,10}",
    ) {
        let mut input = Map::new();
        input.insert("note".to_string(), Value::String(format!("{prefix}{marker}{suffix}")));
        let output = sanitize(&input);
        prop_assert_eq!(output["note"].as_str(), Some(REDACTED));
    }

    #[test]
    fn rollout_assignment_is_deterministic(session in ".{0,64}", fraction in 0.0f64..=1.0) {
        let gate = RolloutGate::new(true, fraction).unwrap();
        prop_assert_eq!(gate.assign(Some(session.as_str())), gate.assign(Some(session.as_str())));
        prop_assert!(bucket(&session) < 100);
    }

    #[test]
    fn full_rollout_assigns_every_session(session in ".{0,64}") {
        let gate = RolloutGate::new(true, 1.0).unwrap();
        prop_assert!(gate.assign(Some(session.as_str())));
    }
}

#[test]
fn rollout_from_lookup_reads_both_variables() {
    let gate = RolloutGate::from_lookup(|key| match key {
        k if k == ENABLED_VAR => Some("true".to_string()),
        k if k == FRACTION_VAR => Some("0.25".to_string()),
        _ => None,
    })
    .unwrap();
    assert!(gate.enabled);
    assert_eq!(gate.fraction, 0.25);

    let session = "session-123";
    assert_eq!(gate.assign(Some(session)), bucket(session) < 25);
}

#[test]
fn nested_values_are_not_inspected() {
    let input = json!({ "config": { "password": "hunter2" } });
    let output = sanitize(input.as_object().unwrap());
    assert_eq!(output["config"]["password"], "hunter2");
}

#[test]
fn tracer_sanitizes_and_truncates_at_the_boundary() {
    let sink = Arc::new(MemorySink::new());
    let input = json!({ "prompt": "make a vnet", "api_key": "sk-123" });
    let tracer = TaskTracer::start(sink.clone(), "task-7", input.as_object().unwrap());
    tracer.action(
        "lookup",
        Some(json!({ "conn": "AccountKey=abc;" }).as_object().unwrap()),
        None,
    );
    tracer.end(true, Some(&"x".repeat(OUTPUT_TRUNCATION_LENGTH * 2)));

    let events = sink.events_for("task-7");
    assert_eq!(events.len(), 3);
    match &events[0] {
        TraceEvent::Start { input, .. } => {
            assert_eq!(input["api_key"], REDACTED);
            assert_eq!(input["prompt"], "make a vnet");
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[1] {
        TraceEvent::Action { input, .. } => {
            assert_eq!(input.as_ref().unwrap()["conn"], REDACTED);
        }
        other => panic!("unexpected event {other:?}"),
    }
    match &events[2] {
        TraceEvent::End { output, success, .. } => {
            assert!(*success);
            assert_eq!(output.as_ref().unwrap().chars().count(), OUTPUT_TRUNCATION_LENGTH);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test]
async fn trace_tool_records_completion_and_errors() {
    let sink = Arc::new(MemorySink::new());
    let tracer = TaskTracer::start(sink.clone(), "task-tools", &Map::new());

    let ok: Result<u32, String> = tracer.trace_tool("lookup", "vm", async { Ok(3) }).await;
    assert_eq!(ok, Ok(3));
    let err: Result<u32, String> = tracer
        .trace_tool("fetch", "x", async { Err("boom".to_string()) })
        .await;
    assert!(err.is_err());

    let actions: Vec<String> = sink
        .events_for("task-tools")
        .into_iter()
        .filter_map(|e| match e {
            TraceEvent::Action { action, .. } => Some(action),
            _ => None,
        })
        .collect();
    assert_eq!(
        actions,
        vec!["tool:lookup", "tool:lookup:complete", "tool:fetch", "tool:fetch:error"]
    );
}
