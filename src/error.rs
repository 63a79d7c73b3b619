// The #[error] attribute from thiserror uses struct fields via string interpolation,
// but Rust's unused_assignments lint doesn't recognize this.
#![allow(unused_assignments)]

//! Wavegraph Error Types with Error Codes
//!
//! Error code ranges:
//! - WAVE-000-019: Construction errors (add_component, connect, registry, config)
//! - WAVE-020-029: Validation errors (aggregated, never fail-fast)
//! - WAVE-030-049: Run errors (component failures, limits, cancellation, timeouts)
//!
//! Construction errors are raised before any mutation, so a failed
//! `add_component`/`connect` leaves the graph exactly as it was.

use std::fmt;

use thiserror::Error;

use crate::component::SocketDirection;

pub type Result<T> = std::result::Result<T, WaveError>;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Coarse classification of a [`WaveError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Raised while building the graph
    Construction,
    /// Raised by `Graph::validate`
    Validation,
    /// Raised while a pipeline runs
    Run,
}

/// One problem found by `Graph::validate`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// A required input socket can never receive a value
    UnresolvedInput { component: String, socket: String },
    /// A component with only optional inputs that nothing can ever trigger
    NeverRuns { component: String },
    /// A cycle with no conditional output socket on any of its edges
    UnbreakableCycle { components: Vec<String> },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedInput { component, socket } => {
                write!(f, "unresolved required input {}.{}", component, socket)
            }
            Self::NeverRuns { component } => {
                write!(f, "component '{}' can never be triggered", component)
            }
            Self::UnbreakableCycle { components } => write!(
                f,
                "cycle [{}] has no conditional output to break it",
                components.join(" → ")
            ),
        }
    }
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    if issues.len() == 1 {
        return issues[0].to_string();
    }
    format!(
        "{} problems: {}",
        issues.len(),
        issues
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    )
}

/// Failure raised by a component's run (or a tool it calls)
///
/// Components return this from `run`; the engine wraps it into
/// [`WaveError::ComponentExecution`] together with the component name and wave.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ComponentError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ComponentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an underlying error, keeping it reachable via `source()`
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ComponentError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ComponentError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for ComponentError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(format!("invalid socket value: {}", err), err)
    }
}

impl From<WaveError> for ComponentError {
    fn from(err: WaveError) -> Self {
        Self::with_source(err.to_string(), err)
    }
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum WaveError {
    // ═══════════════════════════════════════════
    // CONSTRUCTION ERRORS (000-019)
    // ═══════════════════════════════════════════
    #[error("[WAVE-001] Invalid component name '{name}': must match ^[A-Za-z_][A-Za-z0-9_]*$")]
    InvalidComponentName { name: String },

    #[error("[WAVE-002] Component '{name}' already exists in the graph")]
    DuplicateName { name: String },

    #[error("[WAVE-003] Component type '{component}' declares socket '{socket}' more than once")]
    DuplicateSocket { component: String, socket: String },

    #[error("[WAVE-004] Component '{name}' not found in the graph")]
    ComponentNotFound { name: String },

    #[error("[WAVE-005] Component '{component}' has no {direction} socket '{socket}'")]
    SocketNotFound {
        component: String,
        socket: String,
        direction: SocketDirection,
    },

    #[error("[WAVE-006] Cannot connect {sender} ({sender_type}) to {receiver} ({receiver_type})")]
    TypeMismatch {
        sender: String,
        sender_type: String,
        receiver: String,
        receiver_type: String,
    },

    #[error("[WAVE-007] Input {receiver} is not variadic and already receives from {existing}")]
    Cardinality { receiver: String, existing: String },

    #[error("[WAVE-008] Connection {sender} → {receiver} already exists")]
    DuplicateEdge { sender: String, receiver: String },

    #[error("[WAVE-009] Malformed endpoint '{endpoint}': expected 'component.socket'")]
    MalformedEndpoint { endpoint: String },

    #[error("[WAVE-010] Cannot infer connection {sender} → {receiver}: {reason}")]
    AmbiguousConnection {
        sender: String,
        receiver: String,
        reason: String,
    },

    #[error("[WAVE-011] Invalid socket name '{socket}' on component type '{component}'")]
    InvalidSocketName { component: String, socket: String },

    #[error("[WAVE-012] Unknown component type '{type_name}'")]
    UnknownComponentType { type_name: String },

    #[error("[WAVE-013] Invalid parameters for component type '{type_name}': {reason}")]
    InvalidParams { type_name: String, reason: String },

    #[error("[WAVE-014] Invalid type expression '{expr}': {reason}")]
    InvalidTypeExpr { expr: String, reason: String },

    #[error("[WAVE-015] Graph serialization error: {reason}")]
    Serialization { reason: String },

    #[error("[WAVE-016] Configuration error: {reason}")]
    ConfigError { reason: String },

    // ═══════════════════════════════════════════
    // VALIDATION ERRORS (020-029)
    // ═══════════════════════════════════════════
    #[error("[WAVE-020] Graph validation failed: {}", format_issues(.issues))]
    ValidationFailed { issues: Vec<ValidationIssue> },

    // ═══════════════════════════════════════════
    // RUN ERRORS (030-049)
    // ═══════════════════════════════════════════
    #[error("[WAVE-030] Component '{component}' failed in wave {wave} (run #{iteration}): {source}")]
    ComponentExecution {
        component: String,
        wave: u32,
        iteration: u32,
        #[source]
        source: ComponentError,
    },

    #[error("[WAVE-031] Component '{component}' exceeded max iterations: ran {count} times (limit {limit}) before wave {wave}")]
    MaxIterationsExceeded {
        component: String,
        count: u32,
        limit: u32,
        wave: u32,
    },

    #[error("[WAVE-032] Run cancelled at wave {wave}")]
    Cancelled { wave: u32 },

    #[error("[WAVE-033] Run timed out after {elapsed_ms}ms (limit {timeout_ms}ms) at wave {wave}")]
    Timeout {
        wave: u32,
        timeout_ms: u64,
        elapsed_ms: u64,
    },

    #[error("[WAVE-034] Component '{component}' timed out after {timeout_ms}ms in wave {wave}")]
    ComponentTimeout {
        component: String,
        wave: u32,
        timeout_ms: u64,
    },

    #[error("[WAVE-035] Missing required run input {socket}")]
    MissingRunInput { socket: String },

    #[error("[WAVE-036] Invalid run input {socket}: {reason}")]
    InvalidRunInput { socket: String, reason: String },

    #[error("[WAVE-037] Invalid run configuration: {reason}")]
    InvalidRunConfig { reason: String },

    #[error("[WAVE-038] Tool '{tool}' failed for call '{call_id}': {reason}")]
    ToolFailed {
        tool: String,
        call_id: String,
        reason: String,
    },
}

impl WaveError {
    /// Get the error code (e.g., "WAVE-001")
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidComponentName { .. } => "WAVE-001",
            Self::DuplicateName { .. } => "WAVE-002",
            Self::DuplicateSocket { .. } => "WAVE-003",
            Self::ComponentNotFound { .. } => "WAVE-004",
            Self::SocketNotFound { .. } => "WAVE-005",
            Self::TypeMismatch { .. } => "WAVE-006",
            Self::Cardinality { .. } => "WAVE-007",
            Self::DuplicateEdge { .. } => "WAVE-008",
            Self::MalformedEndpoint { .. } => "WAVE-009",
            Self::AmbiguousConnection { .. } => "WAVE-010",
            Self::InvalidSocketName { .. } => "WAVE-011",
            Self::UnknownComponentType { .. } => "WAVE-012",
            Self::InvalidParams { .. } => "WAVE-013",
            Self::InvalidTypeExpr { .. } => "WAVE-014",
            Self::Serialization { .. } => "WAVE-015",
            Self::ConfigError { .. } => "WAVE-016",
            Self::ValidationFailed { .. } => "WAVE-020",
            Self::ComponentExecution { .. } => "WAVE-030",
            Self::MaxIterationsExceeded { .. } => "WAVE-031",
            Self::Cancelled { .. } => "WAVE-032",
            Self::Timeout { .. } => "WAVE-033",
            Self::ComponentTimeout { .. } => "WAVE-034",
            Self::MissingRunInput { .. } => "WAVE-035",
            Self::InvalidRunInput { .. } => "WAVE-036",
            Self::InvalidRunConfig { .. } => "WAVE-037",
            Self::ToolFailed { .. } => "WAVE-038",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ValidationFailed { .. } => ErrorCategory::Validation,
            Self::ComponentExecution { .. }
            | Self::MaxIterationsExceeded { .. }
            | Self::Cancelled { .. }
            | Self::Timeout { .. }
            | Self::ComponentTimeout { .. }
            | Self::MissingRunInput { .. }
            | Self::InvalidRunInput { .. }
            | Self::InvalidRunConfig { .. }
            | Self::ToolFailed { .. } => ErrorCategory::Run,
            _ => ErrorCategory::Construction,
        }
    }

    /// Name of the component a run error originates from, if any
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::ComponentExecution { component, .. }
            | Self::MaxIterationsExceeded { component, .. }
            | Self::ComponentTimeout { component, .. } => Some(component),
            _ => None,
        }
    }

    /// Wave number a run error was raised in, if any
    pub fn wave(&self) -> Option<u32> {
        match self {
            Self::ComponentExecution { wave, .. }
            | Self::MaxIterationsExceeded { wave, .. }
            | Self::Cancelled { wave }
            | Self::Timeout { wave, .. }
            | Self::ComponentTimeout { wave, .. } => Some(*wave),
            _ => None,
        }
    }

    /// `(component, socket)` pairs reported as unresolved by validation
    pub fn unresolved_inputs(&self) -> Vec<(&str, &str)> {
        match self {
            Self::ValidationFailed { issues } => issues
                .iter()
                .filter_map(|issue| match issue {
                    ValidationIssue::UnresolvedInput { component, socket } => {
                        Some((component.as_str(), socket.as_str()))
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl FixSuggestion for WaveError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            Self::InvalidComponentName { .. } => {
                Some("Use letters, digits and underscores, not starting with a digit")
            }
            Self::DuplicateName { .. } => Some("Pick a unique name or remove the existing component first"),
            Self::DuplicateSocket { .. } => Some("Give every input and output socket a distinct name"),
            Self::ComponentNotFound { .. } => Some("Add the component before connecting it"),
            Self::SocketNotFound { .. } => Some("Check the socket name against the component's declared sockets"),
            Self::TypeMismatch { .. } => {
                Some("Connect sockets with compatible types or widen the receiver type (union/any)")
            }
            Self::Cardinality { .. } => {
                Some("Declare the input socket variadic or route the senders through a joiner")
            }
            Self::DuplicateEdge { .. } => Some("Remove the repeated connect call"),
            Self::MalformedEndpoint { .. } => Some("Use the form 'component.socket'"),
            Self::AmbiguousConnection { .. } => {
                Some("Name the sockets explicitly with connect(\"a.out\", \"b.in\")")
            }
            Self::InvalidSocketName { .. } => Some("Socket names follow the same rules as component names"),
            Self::UnknownComponentType { .. } => {
                Some("Register a factory for the type in the ComponentRegistry")
            }
            Self::InvalidParams { .. } => Some("Check the params object of the component"),
            Self::InvalidTypeExpr { .. } => {
                Some("Use int, float, str, bool, null, any, list[T], map[T], union[A, B], optional[T] or a type name")
            }
            Self::Serialization { .. } => Some("Check the document against the wavegraph/graph@1 format"),
            Self::ConfigError { .. } => Some("Check the config file syntax and environment variables"),
            Self::ValidationFailed { .. } => {
                Some("Connect or expose every required input and give each cycle a conditional output")
            }
            Self::ComponentExecution { .. } => Some("Inspect the component's underlying error"),
            Self::MaxIterationsExceeded { .. } => {
                Some("Make sure the loop-breaker stops emitting its conditional output, or raise max_iterations")
            }
            Self::Cancelled { .. } => None,
            Self::Timeout { .. } => Some("Raise the run timeout or speed up slow components"),
            Self::ComponentTimeout { .. } => Some("Raise component_timeout or speed up the component"),
            Self::MissingRunInput { .. } => Some("Pass a value for every required graph input"),
            Self::InvalidRunInput { .. } => Some("Check the input key and value type against Pipeline::inputs()"),
            Self::InvalidRunConfig { .. } => Some("Limits must be greater than zero"),
            Self::ToolFailed { .. } => {
                Some("Fix the tool or disable raise_on_failure to return the error to the caller")
            }
        }
    }
}
