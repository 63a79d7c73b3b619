//! Closure-backed components
//!
//! ```rust,ignore
//! let doubler = ComponentDescriptor::builder("Doubler")
//!     .input(InputSocket::required("x", SocketType::Int))
//!     .output(OutputSocket::new("y", SocketType::Int))
//!     .blocking(|inputs| {
//!         let x = inputs["x"].as_i64().unwrap_or_default();
//!         Ok(SocketValues::from([("y".into(), json!(x * 2))]))
//!     })?;
//! ```

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::{Map, Value};

use super::{
    BlockingComponent, Component, ComponentDescriptor, InputSocket, OutputSocket, RunCapability,
    SocketValues, SuspendingComponent,
};
use crate::error::{ComponentError, Result};

type RunResult = std::result::Result<SocketValues, ComponentError>;
type BlockingFn = dyn Fn(SocketValues) -> RunResult + Send + Sync;
type SuspendingFn = dyn Fn(SocketValues) -> BoxFuture<'static, RunResult> + Send + Sync;

#[derive(Clone)]
struct Signature {
    type_name: String,
    inputs: Vec<InputSocket>,
    outputs: Vec<OutputSocket>,
    params: Value,
}

struct FnBlocking {
    signature: Signature,
    f: Box<BlockingFn>,
}

struct FnSuspending {
    signature: Signature,
    f: Box<SuspendingFn>,
}

macro_rules! impl_component_for_signature {
    ($ty:ty) => {
        impl Component for $ty {
            fn type_name(&self) -> &str {
                &self.signature.type_name
            }
            fn input_sockets(&self) -> Vec<InputSocket> {
                self.signature.inputs.clone()
            }
            fn output_sockets(&self) -> Vec<OutputSocket> {
                self.signature.outputs.clone()
            }
            fn params(&self) -> Value {
                self.signature.params.clone()
            }
        }
    };
}

impl_component_for_signature!(FnBlocking);
impl_component_for_signature!(FnSuspending);

impl BlockingComponent for FnBlocking {
    fn run(&self, inputs: SocketValues) -> RunResult {
        (self.f)(inputs)
    }
}

#[async_trait]
impl SuspendingComponent for FnSuspending {
    async fn run(&self, inputs: SocketValues) -> RunResult {
        (self.f)(inputs).await
    }
}

/// Builder for components defined by a closure
pub struct ComponentBuilder {
    signature: Signature,
}

impl ComponentDescriptor {
    pub fn builder(type_name: impl Into<String>) -> ComponentBuilder {
        ComponentBuilder {
            signature: Signature {
                type_name: type_name.into(),
                inputs: Vec::new(),
                outputs: Vec::new(),
                params: Value::Object(Map::new()),
            },
        }
    }
}

impl ComponentBuilder {
    pub fn input(mut self, socket: InputSocket) -> Self {
        self.signature.inputs.push(socket);
        self
    }

    pub fn output(mut self, socket: OutputSocket) -> Self {
        self.signature.outputs.push(socket);
        self
    }

    pub fn params(mut self, params: Value) -> Self {
        self.signature.params = params;
        self
    }

    pub fn blocking<F>(self, f: F) -> Result<ComponentDescriptor>
    where
        F: Fn(SocketValues) -> RunResult + Send + Sync + 'static,
    {
        let signature = self.signature;
        let component = FnBlocking {
            signature: signature.clone(),
            f: Box::new(f),
        };
        ComponentDescriptor::assemble(
            signature.type_name,
            signature.inputs,
            signature.outputs,
            signature.params,
            RunCapability::Blocking(Arc::new(component)),
        )
    }

    pub fn suspending<F, Fut>(self, f: F) -> Result<ComponentDescriptor>
    where
        F: Fn(SocketValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = RunResult> + Send + 'static,
    {
        let signature = self.signature;
        let component = FnSuspending {
            signature: signature.clone(),
            f: Box::new(move |inputs| f(inputs).boxed()),
        };
        ComponentDescriptor::assemble(
            signature.type_name,
            signature.inputs,
            signature.outputs,
            signature.params,
            RunCapability::Suspending(Arc::new(component)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ExecutionKind, SocketType};
    use serde_json::json;

    fn doubled(inputs: &SocketValues) -> SocketValues {
        let x = inputs.get("x").and_then(Value::as_i64).unwrap_or_default();
        SocketValues::from([("y".to_string(), json!(x * 2))])
    }

    #[test]
    fn blocking_closure_runs() {
        let desc = ComponentDescriptor::builder("Doubler")
            .input(InputSocket::required("x", SocketType::Int))
            .output(OutputSocket::new("y", SocketType::Int))
            .blocking(|inputs| Ok(doubled(&inputs)))
            .unwrap();
        assert_eq!(desc.kind(), ExecutionKind::Blocking);

        let RunCapability::Blocking(c) = desc.run_capability() else {
            panic!("expected blocking");
        };
        let out = c.run(SocketValues::from([("x".to_string(), json!(4))])).unwrap();
        assert_eq!(out["y"], json!(8));
    }

    #[tokio::test]
    async fn suspending_closure_runs() {
        let desc = ComponentDescriptor::builder("AsyncDoubler")
            .input(InputSocket::required("x", SocketType::Int))
            .output(OutputSocket::new("y", SocketType::Int))
            .params(json!({"factor": 2}))
            .suspending(|inputs| async move { Ok::<_, ComponentError>(doubled(&inputs)) })
            .unwrap();
        assert_eq!(desc.kind(), ExecutionKind::Suspending);
        assert_eq!(desc.params(), &json!({"factor": 2}));

        let RunCapability::Suspending(c) = desc.run_capability() else {
            panic!("expected suspending");
        };
        let out = c.run(SocketValues::from([("x".to_string(), json!(5))])).await.unwrap();
        assert_eq!(out["y"], json!(10));
    }
}
