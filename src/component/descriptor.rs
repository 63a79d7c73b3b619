//! Component contract and the descriptor the graph stores
//!
//! A component declares its sockets through [`Component`] and implements
//! exactly one run flavor:
//! - [`SuspendingComponent`]: async, awaited on the runtime
//! - [`BlockingComponent`]: sync, dispatched to the blocking pool
//!
//! [`ComponentDescriptor`] freezes the declared sockets once, checks them,
//! and keeps the run capability behind an `Arc` so descriptors clone cheaply.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::{InputSocket, OutputSocket, SocketValues};
use crate::error::{ComponentError, Result, WaveError};
use crate::util::validate_socket_name;

/// Socket declarations shared by both run flavors
pub trait Component: Send + Sync {
    /// Type name used by the registry and in serialized graphs
    fn type_name(&self) -> &str;

    fn input_sockets(&self) -> Vec<InputSocket>;

    fn output_sockets(&self) -> Vec<OutputSocket>;

    /// Construction parameters, round-tripped through graph serialization
    fn params(&self) -> Value {
        Value::Object(Map::new())
    }
}

/// Component whose run awaits (network calls, timers, other async work)
#[async_trait]
pub trait SuspendingComponent: Component {
    async fn run(&self, inputs: SocketValues) -> std::result::Result<SocketValues, ComponentError>;
}

/// Component whose run occupies its thread until done
pub trait BlockingComponent: Component {
    fn run(&self, inputs: SocketValues) -> std::result::Result<SocketValues, ComponentError>;
}

/// How the engine has to drive a component
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionKind {
    Blocking,
    Suspending,
}

impl fmt::Display for ExecutionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking => f.write_str("blocking"),
            Self::Suspending => f.write_str("suspending"),
        }
    }
}

#[derive(Clone)]
pub enum RunCapability {
    Blocking(Arc<dyn BlockingComponent>),
    Suspending(Arc<dyn SuspendingComponent>),
}

impl RunCapability {
    pub fn kind(&self) -> ExecutionKind {
        match self {
            Self::Blocking(_) => ExecutionKind::Blocking,
            Self::Suspending(_) => ExecutionKind::Suspending,
        }
    }
}

/// Frozen description of one component: type, sockets, params and runner
#[derive(Clone)]
pub struct ComponentDescriptor {
    type_name: String,
    inputs: BTreeMap<String, InputSocket>,
    outputs: BTreeMap<String, OutputSocket>,
    params: Value,
    run: RunCapability,
}

impl ComponentDescriptor {
    pub fn suspending<C: SuspendingComponent + 'static>(component: C) -> Result<Self> {
        let component = Arc::new(component);
        Self::assemble(
            component.type_name().to_string(),
            component.input_sockets(),
            component.output_sockets(),
            component.params(),
            RunCapability::Suspending(component),
        )
    }

    pub fn blocking<C: BlockingComponent + 'static>(component: C) -> Result<Self> {
        let component = Arc::new(component);
        Self::assemble(
            component.type_name().to_string(),
            component.input_sockets(),
            component.output_sockets(),
            component.params(),
            RunCapability::Blocking(component),
        )
    }

    /// Check socket names (valid identifiers, unique per direction) and freeze
    pub(crate) fn assemble(
        type_name: String,
        inputs: Vec<InputSocket>,
        outputs: Vec<OutputSocket>,
        params: Value,
        run: RunCapability,
    ) -> Result<Self> {
        let duplicate = |socket: &str| WaveError::DuplicateSocket {
            component: type_name.clone(),
            socket: socket.to_string(),
        };

        let mut input_map = BTreeMap::new();
        for socket in inputs {
            validate_socket_name(&type_name, &socket.name)?;
            if input_map.contains_key(&socket.name) {
                return Err(duplicate(&socket.name));
            }
            input_map.insert(socket.name.clone(), socket);
        }

        let mut output_map = BTreeMap::new();
        for socket in outputs {
            validate_socket_name(&type_name, &socket.name)?;
            if output_map.contains_key(&socket.name) {
                return Err(duplicate(&socket.name));
            }
            output_map.insert(socket.name.clone(), socket);
        }

        Ok(Self {
            type_name,
            inputs: input_map,
            outputs: output_map,
            params,
            run,
        })
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn input_sockets(&self) -> &BTreeMap<String, InputSocket> {
        &self.inputs
    }

    pub fn output_sockets(&self) -> &BTreeMap<String, OutputSocket> {
        &self.outputs
    }

    pub fn input(&self, socket: &str) -> Option<&InputSocket> {
        self.inputs.get(socket)
    }

    pub fn output(&self, socket: &str) -> Option<&OutputSocket> {
        self.outputs.get(socket)
    }

    pub fn params(&self) -> &Value {
        &self.params
    }

    pub fn run_capability(&self) -> &RunCapability {
        &self.run
    }

    pub fn kind(&self) -> ExecutionKind {
        self.run.kind()
    }

    pub fn required_inputs(&self) -> impl Iterator<Item = &InputSocket> {
        self.inputs.values().filter(|s| s.required)
    }
}

impl fmt::Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("type_name", &self.type_name)
            .field("inputs", &self.inputs.keys().collect::<Vec<_>>())
            .field("outputs", &self.outputs.keys().collect::<Vec<_>>())
            .field("kind", &self.kind())
            .finish()
    }
}
