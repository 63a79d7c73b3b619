//! Integration tests for the tool-calling cycle
//!
//! ```text
//!   query ──▶ gen ──tool_calls──▶ invoker
//!              ▲                    │
//!              └────tool_results────┘
//! ```
//!
//! `gen` stands in for a model: it asks for tools for a fixed number of rounds,
//! then replies with what it learned.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use wavegraph::{
    ComponentDescriptor, ComponentError, EventKind, EventLog, FnTool, Graph, InputSocket,
    OutputSocket, Pipeline, RunConfig, SocketType, SocketValues, Tool, ToolCall, ToolInvoker,
    ToolResult, WaveError,
};

fn tools() -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(FnTool::sync("add", |args| {
            let a = args["a"].as_i64().unwrap_or_default();
            let b = args["b"].as_i64().unwrap_or_default();
            Ok(json!(a + b))
        })),
        Arc::new(FnTool::new("slow_echo", |args| async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            Ok::<_, ComponentError>(args)
        })),
        Arc::new(FnTool::sync("broken", |_| Err(ComponentError::new("backend unavailable")))),
    ]
}

/// Generator that requests `calls` each round until `rounds` rounds are done
///
/// `rounds = None` never stops asking.
fn generator(rounds: Option<usize>, calls: Vec<ToolCall>) -> ComponentDescriptor {
    let fired = Arc::new(AtomicUsize::new(0));
    ComponentDescriptor::builder("Generator")
        .input(InputSocket::required("query", SocketType::Str))
        .input(InputSocket::optional(
            "tool_results",
            SocketType::list(SocketType::named("ToolResult")),
        ))
        .output(OutputSocket::new("tool_calls", SocketType::list(SocketType::named("ToolCall"))).conditional())
        .output(OutputSocket::new("reply", SocketType::Str).conditional())
        .suspending(move |inputs| {
            let round = fired.fetch_add(1, Ordering::SeqCst);
            generate(round, rounds, calls.clone(), inputs)
        })
        .unwrap()
}

async fn generate(
    round: usize,
    rounds: Option<usize>,
    calls: Vec<ToolCall>,
    inputs: SocketValues,
) -> Result<SocketValues, ComponentError> {
    let results: Vec<ToolResult> = match inputs.get("tool_results") {
        Some(value) => serde_json::from_value(value.clone())?,
        None => Vec::new(),
    };

    if rounds.is_some_and(|limit| round >= limit) {
        let summary: Vec<String> = results
            .iter()
            .map(|r| format!("{}{}", if r.error { "!" } else { "" }, r.result))
            .collect();
        let query = inputs.get("query").and_then(Value::as_str).unwrap_or_default();
        return Ok(SocketValues::from([(
            "reply".to_string(),
            json!(format!("{}: {}", query, summary.join(","))),
        )]));
    }

    let calls: Vec<ToolCall> = calls
        .into_iter()
        .enumerate()
        .map(|(i, call)| call.with_id(format!("r{}c{}", round, i)))
        .collect();
    Ok(SocketValues::from([(
        "tool_calls".to_string(),
        serde_json::to_value(calls)?,
    )]))
}

fn tool_loop(gen: ComponentDescriptor, invoker: ToolInvoker) -> Graph {
    let mut graph = Graph::new();
    graph.add_component("gen", gen).unwrap();
    graph.add_component("invoker", invoker.into_descriptor().unwrap()).unwrap();
    graph.connect("gen.tool_calls", "invoker.tool_calls").unwrap();
    graph.connect("invoker.tool_results", "gen.tool_results").unwrap();
    graph
}

fn query() -> BTreeMap<String, Value> {
    BTreeMap::from([("gen.query".to_string(), json!("sum"))])
}

#[tokio::test]
async fn test_loop_terminates_after_two_rounds() {
    let calls = vec![ToolCall::new("add", json!({"a": 2, "b": 3}))];
    let pipeline = Pipeline::new(tool_loop(generator(Some(2), calls), ToolInvoker::new(tools()))).unwrap();

    let output = pipeline
        .run(query(), &RunConfig::default().with_max_iterations(5))
        .await
        .unwrap();

    assert_eq!(output.get("gen.reply"), Some(&json!("sum: 5")));
    assert_eq!(output.runs_of("invoker"), 2);
    assert_eq!(output.runs_of("gen"), 3);
    assert_eq!(output.waves, 5);
}

#[tokio::test]
async fn test_non_terminating_loop_hits_max_iterations() {
    let calls = vec![ToolCall::new("add", json!({"a": 1, "b": 1}))];
    let log = EventLog::new();
    let pipeline = Pipeline::new(tool_loop(generator(None, calls), ToolInvoker::new(tools())))
        .unwrap()
        .with_event_log(log.clone());

    let err = pipeline
        .run(query(), &RunConfig::default().with_max_iterations(5))
        .await
        .unwrap_err();

    match err {
        WaveError::MaxIterationsExceeded {
            component,
            count,
            limit,
            wave,
        } => {
            assert_eq!(component, "gen");
            assert_eq!(count, 5);
            assert_eq!(limit, 5);
            assert_eq!(wave, 11);
        }
        other => panic!("expected MaxIterationsExceeded, got {other}"),
    }
    assert!(matches!(
        log.events().last().map(|e| &e.kind),
        Some(EventKind::RunFailed { .. })
    ));
}

#[tokio::test]
async fn test_results_keep_call_order() {
    let calls = vec![
        ToolCall::new("slow_echo", json!("first")),
        ToolCall::new("add", json!({"a": 1, "b": 1})),
    ];
    let pipeline = Pipeline::new(tool_loop(generator(Some(1), calls), ToolInvoker::new(tools()))).unwrap();

    let output = pipeline
        .run(query(), &RunConfig::default().include_outputs_from("invoker"))
        .await
        .unwrap();

    let results: Vec<ToolResult> =
        serde_json::from_value(output.get("invoker.tool_results").cloned().unwrap()).unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].origin.tool_name, "slow_echo");
    assert_eq!(results[0].origin.id.as_deref(), Some("r0c0"));
    assert_eq!(results[1].result, json!(2));
    assert_eq!(output.get("gen.reply"), Some(&json!("sum: \"first\",2")));
}

#[tokio::test]
async fn test_tool_failure_returns_error_result() {
    let calls = vec![
        ToolCall::new("broken", Value::Null),
        ToolCall::new("missing_tool", Value::Null),
    ];
    let pipeline = Pipeline::new(tool_loop(generator(Some(1), calls), ToolInvoker::new(tools()))).unwrap();

    let output = pipeline.run(query(), &RunConfig::default()).await.unwrap();
    let reply = output.get("gen.reply").and_then(Value::as_str).unwrap();
    assert!(reply.contains("!\"ERROR: Tool 'broken' failed: backend unavailable\""));
    assert!(reply.contains("missing_tool"));
}

#[tokio::test]
async fn test_raise_on_failure_fails_the_run() {
    let calls = vec![ToolCall::new("broken", Value::Null).with_id("x")];
    let invoker = ToolInvoker::new(tools()).raise_on_failure(true);
    let pipeline = Pipeline::new(tool_loop(generator(Some(1), calls), invoker)).unwrap();

    let err = pipeline.run(query(), &RunConfig::default()).await.unwrap_err();
    match &err {
        WaveError::ComponentExecution {
            component, source, ..
        } => {
            assert_eq!(component, "invoker");
            assert!(source.message().contains("WAVE-038"));
            assert!(source.message().contains("backend unavailable"));
        }
        other => panic!("expected ComponentExecution, got {other}"),
    }
}

#[tokio::test]
async fn test_sequential_tool_calls_give_same_results() {
    let calls = vec![
        ToolCall::new("slow_echo", json!("a")),
        ToolCall::new("add", json!({"a": 4, "b": 5})),
    ];
    let invoker = ToolInvoker::new(tools()).concurrent(false);
    let pipeline = Pipeline::new(tool_loop(generator(Some(1), calls), invoker)).unwrap();

    let output = pipeline.run(query(), &RunConfig::default().sequential()).await.unwrap();
    assert_eq!(output.get("gen.reply"), Some(&json!("sum: \"a\",9")));
}
