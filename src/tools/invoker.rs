//! Component that dispatches tool calls and feeds results back into the graph
//!
//! ```text
//!   gen.tool_calls ──▶ invoker.tool_calls
//!   invoker.tool_results ──▶ gen.tool_results
//! ```
//!
//! Results keep the order of the incoming calls, whatever order the tools
//! finish in.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{Tool, ToolCall, ToolResult};
use crate::component::{
    Component, ComponentDescriptor, InputSocket, OutputSocket, SocketType, SocketValues,
    SuspendingComponent,
};
use crate::error::{ComponentError, Result, WaveError};

pub struct ToolInvoker {
    tools: FxHashMap<String, Arc<dyn Tool>>,
    raise_on_failure: bool,
    concurrent: bool,
}

impl ToolInvoker {
    pub const TYPE: &'static str = "ToolInvoker";
    pub const INPUT: &'static str = "tool_calls";
    pub const OUTPUT: &'static str = "tool_results";

    /// Later tools replace earlier ones with the same name
    pub fn new(tools: impl IntoIterator<Item = Arc<dyn Tool>>) -> Self {
        let tools = tools
            .into_iter()
            .map(|tool| (tool.name().to_string(), tool))
            .collect();
        Self {
            tools,
            raise_on_failure: false,
            concurrent: true,
        }
    }

    /// Fail the firing on the first failed call instead of returning an error result
    pub fn raise_on_failure(mut self, raise: bool) -> Self {
        self.raise_on_failure = raise;
        self
    }

    /// Run the calls of one firing concurrently (default) or one after another
    pub fn concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn into_descriptor(self) -> Result<ComponentDescriptor> {
        ComponentDescriptor::suspending(self)
    }

    fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    async fn invoke_one(&self, call: ToolCall) -> std::result::Result<ToolResult, WaveError> {
        let Some(tool) = self.tools.get(&call.tool_name) else {
            let reason = format!("unknown tool (available: {})", self.tool_names().join(", "));
            return self.failed(call, reason);
        };

        debug!(tool = %call.tool_name, call_id = call.id_or_empty(), "invoking tool");
        match tool.invoke(call.arguments.clone()).await {
            Ok(result) => Ok(ToolResult::success(call, result)),
            Err(e) => self.failed(call, e.to_string()),
        }
    }

    fn failed(&self, call: ToolCall, reason: String) -> std::result::Result<ToolResult, WaveError> {
        if self.raise_on_failure {
            return Err(WaveError::ToolFailed {
                tool: call.tool_name.clone(),
                call_id: call.id_or_empty().to_string(),
                reason,
            });
        }
        warn!(
            tool = %call.tool_name,
            call_id = call.id_or_empty(),
            error = %reason,
            "Tool call failed, returning error result"
        );
        let message = format!("ERROR: Tool '{}' failed: {}", call.tool_name, reason);
        Ok(ToolResult::failure(call, message))
    }
}

impl Component for ToolInvoker {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn input_sockets(&self) -> Vec<InputSocket> {
        vec![InputSocket::required(
            Self::INPUT,
            SocketType::list(SocketType::named("ToolCall")),
        )]
    }

    fn output_sockets(&self) -> Vec<OutputSocket> {
        vec![OutputSocket::new(
            Self::OUTPUT,
            SocketType::list(SocketType::named("ToolResult")),
        )]
    }

    fn params(&self) -> Value {
        json!({
            "tools": self.tool_names(),
            "raise_on_failure": self.raise_on_failure,
            "concurrent": self.concurrent,
        })
    }
}

#[async_trait]
impl SuspendingComponent for ToolInvoker {
    async fn run(&self, mut inputs: SocketValues) -> std::result::Result<SocketValues, ComponentError> {
        let calls: Vec<ToolCall> = match inputs.remove(Self::INPUT) {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };

        let outcomes = if self.concurrent {
            join_all(calls.into_iter().map(|call| self.invoke_one(call))).await
        } else {
            let mut outcomes = Vec::with_capacity(calls.len());
            for call in calls {
                let outcome = self.invoke_one(call).await;
                let failed = outcome.is_err();
                outcomes.push(outcome);
                if failed {
                    break;
                }
            }
            outcomes
        };

        let results = outcomes.into_iter().collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(SocketValues::from([(
            Self::OUTPUT.to_string(),
            serde_json::to_value(results)?,
        )]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::FnTool;
    use std::time::Duration;

    fn tools() -> Vec<Arc<dyn Tool>> {
        vec![
            Arc::new(FnTool::new("slow", |args| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok::<_, ComponentError>(json!({"slow": args}))
            })),
            Arc::new(FnTool::sync("fast", |args| Ok(json!({"fast": args})))),
            Arc::new(FnTool::sync("broken", |_| Err(ComponentError::new("disk full")))),
        ]
    }

    fn calls(names: &[&str]) -> SocketValues {
        let calls: Vec<ToolCall> = names
            .iter()
            .enumerate()
            .map(|(i, name)| ToolCall::new(*name, json!(i)).with_id(format!("c{}", i)))
            .collect();
        SocketValues::from([(
            ToolInvoker::INPUT.to_string(),
            serde_json::to_value(calls).unwrap(),
        )])
    }

    fn results(out: &SocketValues) -> Vec<ToolResult> {
        serde_json::from_value(out[ToolInvoker::OUTPUT].clone()).unwrap()
    }

    #[tokio::test]
    async fn results_keep_request_order() {
        let invoker = ToolInvoker::new(tools());
        let out = invoker.run(calls(&["slow", "fast"])).await.unwrap();
        let res = results(&out);
        assert_eq!(res.len(), 2);
        assert_eq!(res[0].origin.tool_name, "slow");
        assert_eq!(res[0].result, json!({"slow": 0}));
        assert_eq!(res[1].result, json!({"fast": 1}));
        assert!(res.iter().all(|r| !r.error));
    }

    #[tokio::test]
    async fn failures_become_error_results() {
        let invoker = ToolInvoker::new(tools()).concurrent(false);
        let out = invoker.run(calls(&["broken", "missing", "fast"])).await.unwrap();
        let res = results(&out);
        assert!(res[0].error);
        assert!(res[0].result.as_str().unwrap().contains("disk full"));
        assert!(res[1].error);
        assert!(res[1].result.as_str().unwrap().contains("unknown tool"));
        assert!(!res[2].error);
    }

    #[tokio::test]
    async fn raise_on_failure_fails_the_firing() {
        let invoker = ToolInvoker::new(tools()).raise_on_failure(true);
        let err = invoker.run(calls(&["fast", "broken"])).await.unwrap_err();
        assert!(err.message().contains("WAVE-038"));
        assert!(err.message().contains("broken"));
    }

    #[tokio::test]
    async fn empty_call_list_yields_empty_results() {
        let invoker = ToolInvoker::new(tools());
        let out = invoker.run(calls(&[])).await.unwrap();
        assert!(results(&out).is_empty());
    }

    #[test]
    fn descriptor_exposes_tool_sockets() {
        let desc = ToolInvoker::new(tools()).into_descriptor().unwrap();
        assert_eq!(desc.type_name(), "ToolInvoker");
        assert!(desc.input("tool_calls").unwrap().required);
        assert_eq!(desc.output("tool_results").unwrap().ty.to_string(), "list[ToolResult]");
        assert_eq!(desc.params()["tools"], json!(["broken", "fast", "slow"]));
    }
}
