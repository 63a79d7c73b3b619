//! Per-run configuration

use std::collections::{BTreeMap, BTreeSet};
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::{Result, WaveError};

/// Default cap on how many times one component may fire in a run
pub const DEFAULT_MAX_ITERATIONS: u32 = 100;

/// How a wave's firings are dispatched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// All ready components of a wave in flight together
    #[default]
    Concurrent,
    /// One firing at a time, in name order
    Sequential,
}

/// Limits and switches for one `Pipeline::run`
///
/// ```rust,ignore
/// let config = RunConfig::default()
///     .with_max_iterations(5)
///     .with_timeout(Duration::from_secs(30))
///     .include_outputs_from("retriever");
/// ```
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub max_iterations: u32,
    /// Wall-clock bound for the whole run
    pub timeout: Option<Duration>,
    /// Bound for a single component firing
    pub component_timeout: Option<Duration>,
    /// Blocking firings in flight at once; `None` means available parallelism
    pub concurrency_limit: Option<usize>,
    pub mode: ExecutionMode,
    /// Components whose every output socket is returned, connected or not
    pub include_outputs_from: BTreeSet<String>,
    /// Per-component overrides of `max_iterations`
    pub component_limits: BTreeMap<String, u32>,
    pub cancellation: Option<CancellationToken>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            timeout: None,
            component_timeout: None,
            concurrency_limit: None,
            mode: ExecutionMode::Concurrent,
            include_outputs_from: BTreeSet::new(),
            component_limits: BTreeMap::new(),
            cancellation: None,
        }
    }
}

impl RunConfig {
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_component_timeout(mut self, timeout: Duration) -> Self {
        self.component_timeout = Some(timeout);
        self
    }

    pub fn with_concurrency_limit(mut self, limit: usize) -> Self {
        self.concurrency_limit = Some(limit);
        self
    }

    pub fn sequential(mut self) -> Self {
        self.mode = ExecutionMode::Sequential;
        self
    }

    pub fn concurrent(mut self) -> Self {
        self.mode = ExecutionMode::Concurrent;
        self
    }

    pub fn include_outputs_from(mut self, component: impl Into<String>) -> Self {
        self.include_outputs_from.insert(component.into());
        self
    }

    pub fn with_component_limit(mut self, component: impl Into<String>, limit: u32) -> Self {
        self.component_limits.insert(component.into(), limit);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Iteration cap for one component
    pub fn limit_for(&self, component: &str) -> u32 {
        self.component_limits
            .get(component)
            .copied()
            .unwrap_or(self.max_iterations)
    }

    /// Permits for the blocking pool
    pub fn blocking_permits(&self) -> usize {
        self.concurrency_limit.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(4)
        })
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(WaveError::InvalidRunConfig { reason });
        if self.max_iterations == 0 {
            return invalid("max_iterations must be at least 1".into());
        }
        if let Some((name, _)) = self.component_limits.iter().find(|(_, limit)| **limit == 0) {
            return invalid(format!("iteration limit for '{}' must be at least 1", name));
        }
        if self.concurrency_limit == Some(0) {
            return invalid("concurrency_limit must be at least 1".into());
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return invalid("timeout must be greater than zero".into());
        }
        if self.component_timeout.is_some_and(|t| t.is_zero()) {
            return invalid("component_timeout must be greater than zero".into());
        }
        Ok(())
    }
}
