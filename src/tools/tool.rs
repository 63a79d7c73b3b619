//! Tool capability trait

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;

use crate::error::ComponentError;

type ToolResultValue = std::result::Result<Value, ComponentError>;
type ToolFn = dyn Fn(Value) -> BoxFuture<'static, ToolResultValue> + Send + Sync;

/// Something a [`ToolInvoker`](super::ToolInvoker) can dispatch a call to
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn invoke(&self, arguments: Value) -> ToolResultValue;
}

/// Tool backed by a closure
pub struct FnTool {
    name: String,
    description: String,
    f: Arc<ToolFn>,
}

impl FnTool {
    /// Tool whose body is an async closure
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResultValue> + Send + 'static,
    {
        Self {
            name: name.into(),
            description: String::new(),
            f: Arc::new(move |args| f(args).boxed()),
        }
    }

    /// Tool whose body is a plain function
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Value) -> ToolResultValue + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Self::new(name, move |args| {
            let f = Arc::clone(&f);
            async move { f(args) }
        })
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl Tool for FnTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn invoke(&self, arguments: Value) -> ToolResultValue {
        (self.f)(arguments).await
    }
}

impl std::fmt::Debug for FnTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnTool").field("name", &self.name).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn async_and_sync_tools_invoke() {
        let echo = FnTool::new("echo", |args| async move { Ok::<_, ComponentError>(args) })
            .with_description("returns its arguments");
        assert_eq!(echo.name(), "echo");
        assert_eq!(echo.description(), "returns its arguments");
        assert_eq!(echo.invoke(json!({"x": 1})).await.unwrap(), json!({"x": 1}));

        let fail = FnTool::sync("fail", |_| Err(ComponentError::new("nope")));
        assert_eq!(fail.invoke(Value::Null).await.unwrap_err().message(), "nope");
    }
}
