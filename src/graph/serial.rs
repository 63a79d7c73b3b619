//! Graph serialization
//!
//! ```yaml
//! schema: wavegraph/graph@1
//! components:
//!   greeting: { type: Constant, params: { value: "hi", type: str } }
//!   echo:     { type: PassThrough, params: { type: str } }
//! connections:
//!   - { sender: greeting.value, receiver: echo.value }
//! outputs: [echo.value]
//! ```
//!
//! Loading replays the construction calls, so a serialized graph goes through
//! the same checks as one built in code.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Graph;
use crate::component::ComponentRegistry;
use crate::error::{Result, WaveError};

pub const GRAPH_SCHEMA: &str = "wavegraph/graph@1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GraphSpec {
    pub schema: String,
    #[serde(default)]
    pub components: BTreeMap<String, ComponentSpec>,
    #[serde(default)]
    pub connections: Vec<ConnectionSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentSpec {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default = "empty_object")]
    pub params: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConnectionSpec {
    pub sender: String,
    pub receiver: String,
}

impl GraphSpec {
    pub fn from_yaml(source: &str) -> Result<Self> {
        serde_yaml::from_str(source).map_err(|e| WaveError::Serialization {
            reason: e.to_string(),
        })
    }

    pub fn from_json(source: &str) -> Result<Self> {
        serde_json::from_str(source).map_err(|e| WaveError::Serialization {
            reason: e.to_string(),
        })
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| WaveError::Serialization {
            reason: e.to_string(),
        })
    }

    /// Rebuild the graph; fails on the first construction error
    pub fn build(&self, registry: &ComponentRegistry) -> Result<Graph> {
        if self.schema != GRAPH_SCHEMA {
            return Err(WaveError::Serialization {
                reason: format!("unsupported schema '{}', expected '{}'", self.schema, GRAPH_SCHEMA),
            });
        }

        let mut graph = Graph::new();
        for (name, component) in &self.components {
            let descriptor = registry.create(&component.type_name, &component.params)?;
            graph.add_component(name, descriptor)?;
        }
        for connection in &self.connections {
            graph.connect(&connection.sender, &connection.receiver)?;
        }
        for endpoint in &self.inputs {
            graph.expose_input(endpoint)?;
        }
        for endpoint in &self.outputs {
            graph.expose_output(endpoint)?;
        }
        Ok(graph)
    }
}

impl Graph {
    /// Describe the graph as plain data: components, connections, exposed sockets
    pub fn to_serializable(&self) -> GraphSpec {
        GraphSpec {
            schema: GRAPH_SCHEMA.to_string(),
            components: self
                .components()
                .map(|(name, desc)| {
                    (
                        name.to_string(),
                        ComponentSpec {
                            type_name: desc.type_name().to_string(),
                            params: desc.params().clone(),
                        },
                    )
                })
                .collect(),
            connections: self
                .edges()
                .iter()
                .map(|edge| ConnectionSpec {
                    sender: edge.sender.to_string(),
                    receiver: edge.receiver.to_string(),
                })
                .collect(),
            inputs: self.declared_inputs().iter().map(ToString::to_string).collect(),
            outputs: self.declared_outputs().iter().map(ToString::to_string).collect(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self.to_serializable()).unwrap_or(Value::Null)
    }

    pub fn from_serializable(spec: &GraphSpec, registry: &ComponentRegistry) -> Result<Self> {
        spec.build(registry)
    }

    pub fn from_value(value: Value, registry: &ComponentRegistry) -> Result<Self> {
        let spec: GraphSpec = serde_json::from_value(value).map_err(|e| WaveError::Serialization {
            reason: e.to_string(),
        })?;
        spec.build(registry)
    }
}
