//! Built-in components, available from `ComponentRegistry::with_builtins`
//!
//! | type          | inputs                    | outputs              |
//! |---------------|---------------------------|----------------------|
//! | `Constant`    | none                      | `value: T`           |
//! | `PassThrough` | `value: T`                | `value: T`           |
//! | `ListJoiner`  | `values: list[T]` (many)  | `values: list[T]`    |
//!
//! `T` comes from the `type` param and defaults to `any`.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{
    BlockingComponent, Component, ComponentDescriptor, InputSocket, OutputSocket, SocketType,
    SocketValues, SuspendingComponent,
};
use crate::error::{ComponentError, Result, WaveError};

fn type_param(type_name: &str, params: &Value) -> Result<SocketType> {
    match params.get("type") {
        None | Some(Value::Null) => Ok(SocketType::Any),
        Some(Value::String(expr)) => expr.parse(),
        Some(other) => Err(WaveError::InvalidParams {
            type_name: type_name.to_string(),
            reason: format!("'type' must be a type expression string, got {}", other),
        }),
    }
}

/// Emits a fixed value once per run
pub struct Constant {
    value: Value,
    ty: SocketType,
}

impl Constant {
    pub const TYPE: &'static str = "Constant";

    pub fn new(value: Value, ty: SocketType) -> Self {
        Self { value, ty }
    }

    pub fn from_params(params: &Value) -> Result<ComponentDescriptor> {
        let ty = type_param(Self::TYPE, params)?;
        let value = params.get("value").cloned().ok_or_else(|| WaveError::InvalidParams {
            type_name: Self::TYPE.to_string(),
            reason: "missing 'value'".to_string(),
        })?;
        if !ty.accepts(&value) {
            return Err(WaveError::InvalidParams {
                type_name: Self::TYPE.to_string(),
                reason: format!("value {} is not a {}", value, ty),
            });
        }
        ComponentDescriptor::suspending(Self::new(value, ty))
    }
}

impl Component for Constant {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn input_sockets(&self) -> Vec<InputSocket> {
        Vec::new()
    }

    fn output_sockets(&self) -> Vec<OutputSocket> {
        vec![OutputSocket::new("value", self.ty.clone())]
    }

    fn params(&self) -> Value {
        json!({ "value": self.value, "type": self.ty.to_string() })
    }
}

#[async_trait]
impl SuspendingComponent for Constant {
    async fn run(&self, _inputs: SocketValues) -> std::result::Result<SocketValues, ComponentError> {
        Ok(SocketValues::from([("value".to_string(), self.value.clone())]))
    }
}

/// Forwards its input unchanged
pub struct PassThrough {
    ty: SocketType,
}

impl PassThrough {
    pub const TYPE: &'static str = "PassThrough";

    pub fn new(ty: SocketType) -> Self {
        Self { ty }
    }

    pub fn from_params(params: &Value) -> Result<ComponentDescriptor> {
        ComponentDescriptor::suspending(Self::new(type_param(Self::TYPE, params)?))
    }
}

impl Component for PassThrough {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn input_sockets(&self) -> Vec<InputSocket> {
        vec![InputSocket::required("value", self.ty.clone())]
    }

    fn output_sockets(&self) -> Vec<OutputSocket> {
        vec![OutputSocket::new("value", self.ty.clone())]
    }

    fn params(&self) -> Value {
        json!({ "type": self.ty.to_string() })
    }
}

#[async_trait]
impl SuspendingComponent for PassThrough {
    async fn run(&self, mut inputs: SocketValues) -> std::result::Result<SocketValues, ComponentError> {
        let value = inputs
            .remove("value")
            .ok_or_else(|| ComponentError::new("missing input 'value'"))?;
        Ok(SocketValues::from([("value".to_string(), value)]))
    }
}

/// Concatenates every list it receives during a wave into one list
pub struct ListJoiner {
    item: SocketType,
}

impl ListJoiner {
    pub const TYPE: &'static str = "ListJoiner";

    pub fn new(item: SocketType) -> Self {
        Self { item }
    }

    pub fn from_params(params: &Value) -> Result<ComponentDescriptor> {
        ComponentDescriptor::blocking(Self::new(type_param(Self::TYPE, params)?))
    }
}

impl Component for ListJoiner {
    fn type_name(&self) -> &str {
        Self::TYPE
    }

    fn input_sockets(&self) -> Vec<InputSocket> {
        vec![InputSocket::required("values", SocketType::list(self.item.clone())).variadic()]
    }

    fn output_sockets(&self) -> Vec<OutputSocket> {
        vec![OutputSocket::new("values", SocketType::list(self.item.clone()))]
    }

    fn params(&self) -> Value {
        json!({ "type": self.item.to_string() })
    }
}

impl BlockingComponent for ListJoiner {
    fn run(&self, mut inputs: SocketValues) -> std::result::Result<SocketValues, ComponentError> {
        let Some(Value::Array(lists)) = inputs.remove("values") else {
            return Err(ComponentError::new("'values' must be a list of lists"));
        };
        let mut joined = Vec::new();
        for list in lists {
            match list {
                Value::Array(items) => joined.extend(items),
                other => return Err(ComponentError::new(format!("expected a list, got {}", other))),
            }
        }
        Ok(SocketValues::from([("values".to_string(), Value::Array(joined))]))
    }
}
