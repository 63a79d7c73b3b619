//! Wavegraph - typed component-graph execution engine
//!
//! Components declare typed input and output sockets; a [`Graph`] wires them
//! together (cycles allowed), and a [`Pipeline`] runs the graph in waves:
//! every ready component fires, the wave finishes, outputs are routed, and the
//! next wave starts.
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        DOMAIN MODEL                          │
//! │  component/ Sockets, SocketType, descriptors, registry       │
//! │  graph/     Graph, edges, topology, validation, serde        │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      APPLICATION LAYER                       │
//! │  runtime/   Wave scheduling and execution (Pipeline)         │
//! │  tools/     Tool calls for agentic loops (ToolInvoker)       │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    INFRASTRUCTURE LAYER                      │
//! │  event/     Run audit trail (EventLog, EventKind)            │
//! │  util/      Name validation, string interner                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`component`] | Component contract, socket types, builtins, `ComponentRegistry` |
//! | [`graph`] | Graph construction, reachability, SCCs, validation, YAML/JSON |
//! | [`runtime`] | `Pipeline::run`, readiness, wave barrier, limits, cancellation |
//! | [`tools`] | `ToolCall`/`ToolResult`, `Tool` trait, `ToolInvoker` component |
//! | [`event`] | Event sourcing for run audit |
//! | [`util`] | Identifier validation, string interning |
//! | [`config`] | `~/.config/wavegraph/config.toml` + env overrides |
//! | [`error`] | Error types with codes and fix suggestions |
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut graph = Graph::new();
//! graph.add_component("a", add_one)?;
//! graph.add_component("b", double)?;
//! graph.connect("a.y", "b.x")?;
//!
//! let pipeline = Pipeline::new(graph)?;
//! let output = pipeline
//!     .run(BTreeMap::from([("a.x".into(), json!(5))]), &RunConfig::default())
//!     .await?;
//! assert_eq!(output.get("b.y"), Some(&json!(12)));
//! ```

// ═══════════════════════════════════════════════════════════════
// DOMAIN MODEL - components and graphs
// ═══════════════════════════════════════════════════════════════
pub mod component;
pub mod graph;

// ═══════════════════════════════════════════════════════════════
// APPLICATION LAYER - Execution logic
// ═══════════════════════════════════════════════════════════════
pub mod runtime;
pub mod tools;

// ═══════════════════════════════════════════════════════════════
// INFRASTRUCTURE LAYER - events, utilities
// ═══════════════════════════════════════════════════════════════
pub mod event;
pub mod util;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{ComponentError, ErrorCategory, FixSuggestion, ValidationIssue, WaveError};

// Config types
pub use config::EngineConfig;

// Component contract
pub use component::{
    BlockingComponent, Component, ComponentDescriptor, ComponentRegistry, InputSocket,
    OutputSocket, SocketType, SocketValues, SuspendingComponent,
};

// Graph types
pub use graph::{Endpoint, Graph, GraphSpec};

// Runtime types
pub use runtime::{ExecutionMode, Pipeline, RunConfig, RunOutput};

// Tools
pub use tools::{FnTool, Tool, ToolCall, ToolInvoker, ToolResult};

// Event types
pub use event::{Event, EventKind, EventLog};
