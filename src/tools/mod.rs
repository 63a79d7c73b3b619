//! Tool invocation for agentic loops
//!
//! - `call` - [`ToolCall`] requests and [`ToolResult`] replies
//! - `tool` - the [`Tool`] capability and closure-backed [`FnTool`]
//! - `invoker` - [`ToolInvoker`], the graph component that dispatches calls

mod call;
mod invoker;
mod tool;

pub use call::{ToolCall, ToolResult};
pub use invoker::ToolInvoker;
pub use tool::{FnTool, Tool};
