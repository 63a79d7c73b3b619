//! Runtime Module - wave-barrier execution of a validated graph
//!
//! - `config`: per-run limits and switches (RunConfig)
//! - `context`: pending inputs, fire counts and outputs of one run
//! - `scheduler`: readiness, deferral, iteration limits, value routing
//! - `executor`: dispatch of one wave (suspending + blocking components)
//! - `pipeline`: the run loop and its result

mod config;
mod context;
mod executor;
mod pipeline;
mod scheduler;

pub use config::{ExecutionMode, RunConfig, DEFAULT_MAX_ITERATIONS};
pub use context::ExecutionContext;
pub use executor::{Firing, FiringFailure, FiringOutcome, WaveExecutor};
pub use pipeline::{Pipeline, RunOutput};
pub use scheduler::{Schedule, Scheduler};
