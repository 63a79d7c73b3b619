//! Input and output socket descriptors

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SocketType;

/// Values flowing in or out of one component firing, keyed by socket name
pub type SocketValues = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocketDirection {
    Input,
    Output,
}

impl fmt::Display for SocketDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Input => f.write_str("input"),
            Self::Output => f.write_str("output"),
        }
    }
}

/// Declared input of a component
///
/// A required socket must hold a value before the component can fire.
/// Optional sockets fall back to `default` when set, otherwise they are left
/// out of the firing's input map.
///
/// A variadic socket accepts any number of incoming edges and receives the
/// values queued during a wave as one list, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputSocket {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SocketType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub variadic: bool,
}

impl InputSocket {
    pub fn required(name: impl Into<String>, ty: SocketType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            default: None,
            variadic: false,
        }
    }

    pub fn optional(name: impl Into<String>, ty: SocketType) -> Self {
        Self {
            required: false,
            ..Self::required(name, ty)
        }
    }

    /// Optional socket that receives `default` when nothing arrived
    pub fn with_default(name: impl Into<String>, ty: SocketType, default: Value) -> Self {
        Self {
            default: Some(default),
            ..Self::optional(name, ty)
        }
    }

    /// Mark the socket variadic
    ///
    /// The declared type is the element type; the component receives a list.
    pub fn variadic(mut self) -> Self {
        self.variadic = true;
        self
    }

    /// Type of the value the component actually receives
    pub fn received_type(&self) -> SocketType {
        if self.variadic {
            SocketType::list(self.ty.clone())
        } else {
            self.ty.clone()
        }
    }
}

/// Declared output of a component
///
/// A conditional output may be left out of a firing's result. Edges leaving
/// a conditional output are the only ones allowed to close a cycle: the
/// loop stops once the component stops emitting on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputSocket {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SocketType,
    #[serde(default)]
    pub conditional: bool,
}

impl OutputSocket {
    pub fn new(name: impl Into<String>, ty: SocketType) -> Self {
        Self {
            name: name.into(),
            ty,
            conditional: false,
        }
    }

    pub fn conditional(mut self) -> Self {
        self.conditional = true;
        self
    }
}
