//! Wave executor: runs one wave's firings and waits for all of them
//!
//! - Suspending components are awaited on the runtime (JoinSet)
//! - Blocking components go to `spawn_blocking`, bounded by a semaphore
//! - A panic, a timeout or a cancellation becomes a [`FiringFailure`]; the
//!   executor itself never fails
//!
//! Outcomes are returned sorted by component name, whatever order they
//! finished in.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use super::{ExecutionMode, RunConfig};
use crate::component::{
    BlockingComponent, ComponentDescriptor, RunCapability, SocketValues, SuspendingComponent,
};
use crate::error::ComponentError;
use crate::event::{EventKind, EventLog};

/// One component firing, inputs already taken from the context
pub struct Firing {
    pub name: Arc<str>,
    pub descriptor: Arc<ComponentDescriptor>,
    pub inputs: SocketValues,
    /// 1-based firing number within the run
    pub iteration: u32,
}

#[derive(Debug)]
pub enum FiringFailure {
    Component(ComponentError),
    TimedOut(Duration),
    Panicked(String),
    Cancelled,
}

#[derive(Debug)]
pub struct FiringOutcome {
    pub name: Arc<str>,
    pub iteration: u32,
    pub result: Result<SocketValues, FiringFailure>,
    pub duration: Duration,
}

#[derive(Clone)]
pub struct WaveExecutor {
    blocking_pool: Arc<Semaphore>,
    component_timeout: Option<Duration>,
    mode: ExecutionMode,
    cancel: CancellationToken,
    event_log: EventLog,
}

impl WaveExecutor {
    pub fn new(config: &RunConfig, cancel: CancellationToken, event_log: EventLog) -> Self {
        Self {
            blocking_pool: Arc::new(Semaphore::new(config.blocking_permits())),
            component_timeout: config.component_timeout,
            mode: config.mode,
            cancel,
            event_log,
        }
    }

    /// Run every firing of the wave and return once all have settled
    pub async fn execute_wave(&self, wave: u32, firings: Vec<Firing>) -> Vec<FiringOutcome> {
        let mut outcomes = match self.mode {
            ExecutionMode::Sequential => {
                let mut outcomes = Vec::with_capacity(firings.len());
                for firing in firings {
                    outcomes.push(self.clone().fire(wave, firing).await);
                }
                outcomes
            }
            ExecutionMode::Concurrent => self.fire_all(wave, firings).await,
        };
        outcomes.sort_by(|a, b| a.name.cmp(&b.name));
        outcomes
    }

    async fn fire_all(&self, wave: u32, firings: Vec<Firing>) -> Vec<FiringOutcome> {
        let mut expected: Vec<(Arc<str>, u32)> = Vec::with_capacity(firings.len());
        let mut join_set = JoinSet::new();

        for firing in firings {
            expected.push((Arc::clone(&firing.name), firing.iteration));
            let this = self.clone();
            join_set.spawn(async move { this.fire(wave, firing).await });
        }

        let mut outcomes = Vec::with_capacity(expected.len());
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => error!(wave, error = %e, "firing task ended without an outcome"),
            }
        }

        // a task lost to runtime shutdown still has to show up as a failure
        let settled: FxHashSet<Arc<str>> = outcomes.iter().map(|o| Arc::clone(&o.name)).collect();
        for (name, iteration) in expected {
            if !settled.contains(&name) {
                outcomes.push(FiringOutcome {
                    name,
                    iteration,
                    result: Err(FiringFailure::Panicked("firing task was aborted".to_string())),
                    duration: Duration::ZERO,
                });
            }
        }
        outcomes
    }

    async fn fire(self, wave: u32, firing: Firing) -> FiringOutcome {
        let Firing {
            name,
            descriptor,
            inputs,
            iteration,
        } = firing;
        let start = Instant::now();

        self.event_log.emit(EventKind::ComponentStarted {
            component: Arc::clone(&name),
            wave,
            iteration,
            inputs: serde_json::to_value(&inputs).unwrap_or(Value::Null),
        });
        debug!(component = %name, wave, iteration, kind = %descriptor.kind(), "firing");

        let result = match descriptor.run_capability().clone() {
            RunCapability::Suspending(component) => self.run_suspending(component, inputs).await,
            RunCapability::Blocking(component) => self.run_blocking(component, inputs).await,
        };
        let duration = start.elapsed();
        let duration_ms = duration.as_millis() as u64;

        match &result {
            Ok(outputs) => {
                self.event_log.emit(EventKind::ComponentCompleted {
                    component: Arc::clone(&name),
                    wave,
                    iteration,
                    outputs: serde_json::to_value(outputs).unwrap_or(Value::Null),
                    duration_ms,
                });
            }
            Err(failure) => {
                self.event_log.emit(EventKind::ComponentFailed {
                    component: Arc::clone(&name),
                    wave,
                    iteration,
                    error: failure.to_string(),
                    duration_ms,
                });
            }
        }

        FiringOutcome {
            name,
            iteration,
            result,
            duration,
        }
    }

    async fn run_suspending(
        &self,
        component: Arc<dyn SuspendingComponent>,
        inputs: SocketValues,
    ) -> Result<SocketValues, FiringFailure> {
        let run = AssertUnwindSafe(async move { component.run(inputs).await }).catch_unwind();
        let bounded = async {
            match self.component_timeout {
                Some(limit) => match tokio::time::timeout(limit, run).await {
                    Ok(settled) => settle(settled),
                    Err(_) => Err(FiringFailure::TimedOut(limit)),
                },
                None => settle(run.await),
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FiringFailure::Cancelled),
            result = bounded => result,
        }
    }

    /// Blocking work cannot be interrupted: once started it runs to the end,
    /// even past a timeout, and keeps its pool permit until then.
    async fn run_blocking(
        &self,
        component: Arc<dyn BlockingComponent>,
        inputs: SocketValues,
    ) -> Result<SocketValues, FiringFailure> {
        let permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(FiringFailure::Cancelled),
            permit = Arc::clone(&self.blocking_pool).acquire_owned() => {
                permit.map_err(|_| FiringFailure::Cancelled)?
            }
        };

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            component.run(inputs)
        });

        let joined = match self.component_timeout {
            Some(limit) => match tokio::time::timeout(limit, handle).await {
                Ok(joined) => joined,
                Err(_) => return Err(FiringFailure::TimedOut(limit)),
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(outputs)) => Ok(outputs),
            Ok(Err(e)) => Err(FiringFailure::Component(e)),
            Err(e) if e.is_panic() => Err(FiringFailure::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(FiringFailure::Panicked(e.to_string())),
        }
    }
}

fn settle(
    caught: std::thread::Result<Result<SocketValues, ComponentError>>,
) -> Result<SocketValues, FiringFailure> {
    match caught {
        Ok(Ok(outputs)) => Ok(outputs),
        Ok(Err(e)) => Err(FiringFailure::Component(e)),
        Err(payload) => Err(FiringFailure::Panicked(panic_message(payload))),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

impl std::fmt::Display for FiringFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Component(e) => write!(f, "{}", e),
            Self::TimedOut(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
            Self::Panicked(msg) => write!(f, "panicked: {}", msg),
            Self::Cancelled => f.write_str("cancelled"),
        }
    }
}
