//! Pipeline - runs a validated graph
//!
//! One run is a sequence of waves:
//!
//! ```text
//! ready set ──► limits ──► take inputs ──► fire all ──► barrier ──► publish
//!     ▲                                                               │
//!     └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Outputs of a wave are published only after every firing of that wave
//! settled, and only if none of them failed. The run ends when no component
//! is ready.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::executor::{Firing, FiringFailure, FiringOutcome, WaveExecutor};
use super::{ExecutionContext, RunConfig, Schedule, Scheduler};
use crate::component::{InputSocket, OutputSocket, SocketValues};
use crate::error::{ComponentError, Result, WaveError};
use crate::event::{EventKind, EventLog};
use crate::graph::Graph;

/// Result of a successful run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutput {
    pub run_id: String,
    /// `"component.socket"` → last value emitted on that socket
    pub outputs: BTreeMap<String, Value>,
    pub waves: u32,
    /// Firings per component
    pub component_runs: BTreeMap<String, u32>,
}

impl RunOutput {
    pub fn get(&self, endpoint: &str) -> Option<&Value> {
        self.outputs.get(endpoint)
    }

    /// Outputs regrouped by component: `component → socket → value`
    pub fn by_component(&self) -> BTreeMap<String, BTreeMap<String, Value>> {
        let mut grouped: BTreeMap<String, BTreeMap<String, Value>> = BTreeMap::new();
        for (key, value) in &self.outputs {
            if let Some((component, socket)) = key.split_once('.') {
                grouped
                    .entry(component.to_string())
                    .or_default()
                    .insert(socket.to_string(), value.clone());
            }
        }
        grouped
    }

    pub fn runs_of(&self, component: &str) -> u32 {
        self.component_runs.get(component).copied().unwrap_or(0)
    }
}

/// A validated graph, ready to run any number of times
#[derive(Debug)]
pub struct Pipeline {
    graph: Graph,
    schedule: Schedule,
    event_log: EventLog,
}

impl Pipeline {
    /// Validate the graph and wrap it
    pub fn new(graph: Graph) -> Result<Self> {
        graph.validate()?;
        let schedule = Schedule::new(&graph);
        Ok(Self {
            graph,
            schedule,
            event_log: EventLog::new(),
        })
    }

    /// Record run events into a shared log
    pub fn with_event_log(mut self, event_log: EventLog) -> Self {
        self.event_log = event_log;
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn inputs(&self) -> BTreeMap<String, BTreeMap<String, InputSocket>> {
        self.graph.inputs()
    }

    pub fn outputs(&self) -> BTreeMap<String, BTreeMap<String, OutputSocket>> {
        self.graph.outputs()
    }

    /// Run to quiescence
    ///
    /// `inputs` maps `"component.socket"` to a value. On error nothing is
    /// returned: partial outputs are discarded.
    #[instrument(skip_all, fields(components = self.graph.len()))]
    pub async fn run(&self, inputs: BTreeMap<String, Value>, config: &RunConfig) -> Result<RunOutput> {
        config.validate()?;

        let scheduler = Scheduler::new(&self.graph, &self.schedule);
        let mut ctx = ExecutionContext::new();
        scheduler.seed(&mut ctx, inputs)?;

        let run_id = ctx.run_id().to_string();
        // child token: an internal abort never cancels the caller's token
        let cancel = config
            .cancellation
            .as_ref()
            .map(CancellationToken::child_token)
            .unwrap_or_default();
        let executor = WaveExecutor::new(config, cancel.clone(), self.event_log.clone());

        self.event_log.emit(EventKind::RunStarted {
            run_id: run_id.clone(),
            components: self.graph.len(),
        });
        info!(run_id = %run_id, "run started");

        let started = Instant::now();
        let result = self
            .drive(&scheduler, &mut ctx, &executor, config, &cancel, started)
            .await;

        match result {
            Ok(()) => {
                let output = self.collect(&ctx, config);
                self.event_log.emit(EventKind::RunCompleted {
                    run_id,
                    waves: output.waves,
                    total_duration_ms: started.elapsed().as_millis() as u64,
                });
                info!(waves = output.waves, "run completed");
                Ok(output)
            }
            Err(WaveError::Cancelled { wave }) => {
                self.event_log.emit(EventKind::RunCancelled { run_id, wave });
                info!(wave, "run cancelled");
                Err(WaveError::Cancelled { wave })
            }
            Err(e) => {
                cancel.cancel();
                self.event_log.emit(EventKind::RunFailed {
                    run_id,
                    error: e.to_string(),
                    component: e.component().map(Arc::from),
                    wave: e.wave(),
                });
                warn!(error = %e, "run failed");
                Err(e)
            }
        }
    }

    /// Run on a fresh runtime, for callers without one
    ///
    /// Fails with `InvalidRunConfig` when called from inside a runtime.
    pub fn run_blocking(&self, inputs: BTreeMap<String, Value>, config: &RunConfig) -> Result<RunOutput> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(WaveError::InvalidRunConfig {
                reason: "run_blocking called inside an async runtime; await run() instead".to_string(),
            });
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| WaveError::InvalidRunConfig {
                reason: format!("cannot start runtime: {}", e),
            })?;
        runtime.block_on(self.run(inputs, config))
    }

    async fn drive(
        &self,
        scheduler: &Scheduler<'_>,
        ctx: &mut ExecutionContext,
        executor: &WaveExecutor,
        config: &RunConfig,
        cancel: &CancellationToken,
        started: Instant,
    ) -> Result<()> {
        let deadline = config.timeout.map(|t| started + t);

        loop {
            let ready = scheduler.ready_set(ctx);
            if ready.is_empty() {
                return Ok(());
            }

            let wave = ctx.wave() + 1;
            if cancel.is_cancelled() {
                return Err(WaveError::Cancelled { wave });
            }
            scheduler.check_limits(&ready, ctx, config, wave)?;
            ctx.begin_wave();

            let firings: Vec<Firing> = ready
                .iter()
                .filter_map(|name| {
                    let descriptor = Arc::clone(self.graph.component_arc(name)?);
                    let (inputs, iteration) = ctx.take_inputs(name, &descriptor);
                    Some(Firing {
                        name: Arc::clone(name),
                        descriptor,
                        inputs,
                        iteration,
                    })
                })
                .collect();

            self.event_log.emit(EventKind::WaveStarted {
                wave,
                components: ready.clone(),
            });
            let wave_start = Instant::now();

            let outcomes = match deadline {
                Some(deadline) => {
                    tokio::select! {
                        outcomes = executor.execute_wave(wave, firings) => outcomes,
                        _ = tokio::time::sleep_until(deadline.into()) => {
                            cancel.cancel();
                            return Err(timeout_error(wave, config.timeout, started));
                        }
                    }
                }
                None => executor.execute_wave(wave, firings).await,
            };

            if cancel.is_cancelled() {
                return Err(WaveError::Cancelled { wave });
            }
            let outputs = self.settle_wave(scheduler, wave, outcomes)?;
            for (name, values) in outputs {
                scheduler.publish(ctx, &name, values);
            }

            self.event_log.emit(EventKind::WaveCompleted {
                wave,
                duration_ms: wave_start.elapsed().as_millis() as u64,
            });

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(timeout_error(wave, config.timeout, started));
            }
        }
    }

    /// All-or-nothing: the first failure by component name fails the wave
    fn settle_wave(
        &self,
        scheduler: &Scheduler<'_>,
        wave: u32,
        outcomes: Vec<FiringOutcome>,
    ) -> Result<Vec<(Arc<str>, SocketValues)>> {
        let mut settled = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            let FiringOutcome {
                name,
                iteration,
                result,
                ..
            } = outcome;
            let checked = result.and_then(|values| {
                scheduler
                    .check_outputs(&name, &values)
                    .map(|()| values)
                    .map_err(FiringFailure::Component)
            });
            match checked {
                Ok(values) => settled.push((name, values)),
                Err(failure) => return Err(firing_error(&name, wave, iteration, failure)),
            }
        }
        Ok(settled)
    }

    fn collect(&self, ctx: &ExecutionContext, config: &RunConfig) -> RunOutput {
        let mut outputs = BTreeMap::new();
        for endpoint in self.graph.output_endpoints() {
            if let Some(value) = ctx.output(&endpoint) {
                outputs.insert(endpoint.to_string(), value.clone());
            }
        }
        for component in &config.include_outputs_from {
            for (endpoint, value) in ctx.outputs_of(component) {
                outputs.insert(endpoint.to_string(), value.clone());
            }
        }
        RunOutput {
            run_id: ctx.run_id().to_string(),
            outputs,
            waves: ctx.wave(),
            component_runs: ctx.fire_counts(),
        }
    }
}

fn timeout_error(wave: u32, timeout: Option<Duration>, started: Instant) -> WaveError {
    WaveError::Timeout {
        wave,
        timeout_ms: timeout.map_or(0, |t| t.as_millis() as u64),
        elapsed_ms: started.elapsed().as_millis() as u64,
    }
}

fn firing_error(name: &str, wave: u32, iteration: u32, failure: FiringFailure) -> WaveError {
    match failure {
        FiringFailure::Component(source) => WaveError::ComponentExecution {
            component: name.to_string(),
            wave,
            iteration,
            source,
        },
        FiringFailure::TimedOut(limit) => WaveError::ComponentTimeout {
            component: name.to_string(),
            wave,
            timeout_ms: limit.as_millis() as u64,
        },
        FiringFailure::Panicked(message) => WaveError::ComponentExecution {
            component: name.to_string(),
            wave,
            iteration,
            source: ComponentError::new(format!("panicked: {}", message)),
        },
        FiringFailure::Cancelled => WaveError::Cancelled { wave },
    }
}
