//! Run event log
//!
//! - Event: envelope with id + timestamp + kind
//! - EventKind: run, wave and component levels
//! - EventLog: thread-safe, append-only, cheap to clone (shared handle)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID
    pub id: u64,
    /// Milliseconds since the log was created
    pub timestamp_ms: u64,
    pub kind: EventKind,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    // ═══════════════════════════════════════════
    // RUN LEVEL
    // ═══════════════════════════════════════════
    RunStarted {
        run_id: String,
        components: usize,
    },
    RunCompleted {
        run_id: String,
        waves: u32,
        total_duration_ms: u64,
    },
    RunFailed {
        run_id: String,
        error: String,
        component: Option<Arc<str>>,
        wave: Option<u32>,
    },
    RunCancelled {
        run_id: String,
        wave: u32,
    },

    // ═══════════════════════════════════════════
    // WAVE LEVEL
    // ═══════════════════════════════════════════
    WaveStarted {
        wave: u32,
        components: Vec<Arc<str>>,
    },
    WaveCompleted {
        wave: u32,
        duration_ms: u64,
    },

    // ═══════════════════════════════════════════
    // COMPONENT LEVEL
    // ═══════════════════════════════════════════
    ComponentStarted {
        component: Arc<str>,
        wave: u32,
        /// 1-based firing count within the run
        iteration: u32,
        inputs: Value,
    },
    ComponentCompleted {
        component: Arc<str>,
        wave: u32,
        iteration: u32,
        outputs: Value,
        duration_ms: u64,
    },
    ComponentFailed {
        component: Arc<str>,
        wave: u32,
        iteration: u32,
        error: String,
        duration_ms: u64,
    },
}

impl EventKind {
    pub fn component(&self) -> Option<&str> {
        match self {
            Self::ComponentStarted { component, .. }
            | Self::ComponentCompleted { component, .. }
            | Self::ComponentFailed { component, .. } => Some(component),
            _ => None,
        }
    }

    pub fn wave(&self) -> Option<u32> {
        match self {
            Self::WaveStarted { wave, .. }
            | Self::WaveCompleted { wave, .. }
            | Self::ComponentStarted { wave, .. }
            | Self::ComponentCompleted { wave, .. }
            | Self::ComponentFailed { wave, .. }
            | Self::RunCancelled { wave, .. } => Some(*wave),
            Self::RunFailed { wave, .. } => *wave,
            _ => None,
        }
    }

    pub fn is_run_event(&self) -> bool {
        matches!(
            self,
            Self::RunStarted { .. }
                | Self::RunCompleted { .. }
                | Self::RunFailed { .. }
                | Self::RunCancelled { .. }
        )
    }

    /// snake_case name, same as the serialized `type` tag
    pub fn label(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run_started",
            Self::RunCompleted { .. } => "run_completed",
            Self::RunFailed { .. } => "run_failed",
            Self::RunCancelled { .. } => "run_cancelled",
            Self::WaveStarted { .. } => "wave_started",
            Self::WaveCompleted { .. } => "wave_completed",
            Self::ComponentStarted { .. } => "component_started",
            Self::ComponentCompleted { .. } => "component_completed",
            Self::ComponentFailed { .. } => "component_failed",
        }
    }
}

/// Thread-safe, append-only event log
#[derive(Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append an event, returning its ID
    ///
    /// Every event is also logged at debug level under the `wavegraph::event`
    /// target.
    pub fn emit(&self, kind: EventKind) -> u64 {
        debug!(
            target: "wavegraph::event",
            event = kind.label(),
            component = kind.component(),
            wave = kind.wave(),
            "event"
        );
        // id is taken under the write lock so ids and positions agree
        let mut events = self.events.write();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        events.push(Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        });
        id
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Events of one component, in emission order
    pub fn filter_component(&self, component: &str) -> Vec<Event> {
        self.filter(|kind| kind.component() == Some(component))
    }

    pub fn filter_wave(&self, wave: u32) -> Vec<Event> {
        self.filter(|kind| kind.wave() == Some(wave))
    }

    pub fn run_events(&self) -> Vec<Event> {
        self.filter(EventKind::is_run_event)
    }

    fn filter(&self, keep: impl Fn(&EventKind) -> bool) -> Vec<Event> {
        self.events
            .read()
            .iter()
            .filter(|e| keep(&e.kind))
            .cloned()
            .collect()
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.events.write().clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLog").field("len", &self.len()).finish()
    }
}
