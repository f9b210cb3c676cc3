use std::{collections::BTreeMap, future::Future, pin::Pin, sync::Arc, time::Instant};

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use crate::tools::{
    error::ToolError,
    ports::ToolHandler,
    types::{ToolDescriptor, ToolOutput, ToolResponse},
};

pub type ToolFuture = Pin<Box<dyn Future<Output = Result<ToolOutput, ToolError>> + Send>>;
pub type TypedToolHandler<A> = dyn Fn(A) -> ToolFuture + Send + Sync;

pub fn boxed<F>(future: F) -> ToolFuture
where
    F: Future<Output = Result<ToolOutput, ToolError>> + Send + 'static,
{
    Box::pin(future)
}

/// Decodes and validates JSON arguments into `A` before calling a closure.
pub struct TypedTool<A> {
    name: String,
    handler: Arc<TypedToolHandler<A>>,
}

impl<A> TypedTool<A> {
    pub fn new(name: impl Into<String>, handler: Arc<TypedToolHandler<A>>) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }

    fn invalid(&self, message: impl Into<String>) -> ToolError {
        ToolError::InvalidArguments {
            tool: self.name.clone(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl<A> ToolHandler for TypedTool<A>
where
    A: DeserializeOwned + Validate + Send + 'static,
{
    async fn invoke(&self, arguments: Value) -> Result<ToolOutput, ToolError> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        let args: A =
            serde_json::from_value(arguments).map_err(|err| self.invalid(err.to_string()))?;
        args.validate()
            .map_err(|err| self.invalid(err.to_string()))?;
        (self.handler)(args).await
    }
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: Arc<dyn ToolHandler>,
}

/// Name-keyed tool catalog. Built once at startup and read-only afterwards.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        descriptor: ToolDescriptor,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<(), ToolError> {
        if descriptor.name.trim().is_empty() {
            return Err(ToolError::Registration(
                "tool name cannot be empty".to_string(),
            ));
        }
        if self.tools.contains_key(&descriptor.name) {
            return Err(ToolError::Registration(format!(
                "tool {} is already registered",
                descriptor.name
            )));
        }

        tracing::debug!(
            target: "tools",
            tool = %descriptor.name,
            destructive = descriptor.destructive,
            "tool_registered"
        );
        self.tools.insert(
            descriptor.name.clone(),
            RegisteredTool {
                descriptor,
                handler,
            },
        );
        Ok(())
    }

    /// Registers a closure over typed arguments; the input schema comes from `A`.
    pub fn register_typed<A, F, Fut>(
        &mut self,
        name: &str,
        description: &str,
        destructive: bool,
        handler: F,
    ) -> Result<(), ToolError>
    where
        A: DeserializeOwned + JsonSchema + Validate + Send + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolOutput, ToolError>> + Send + 'static,
    {
        let input_schema = serde_json::to_value(schemars::schema_for!(A))?;
        let handler: Arc<TypedToolHandler<A>> =
            Arc::new(move |args: A| -> ToolFuture { boxed(handler(args)) });
        self.register(
            ToolDescriptor {
                name: name.to_string(),
                description: description.to_string(),
                input_schema,
                destructive,
            },
            Arc::new(TypedTool::new(name, handler)),
        )
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .values()
            .map(|tool| tool.descriptor.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn call(&self, name: &str, arguments: Value) -> ToolResponse {
        let Some(tool) = self.tools.get(name) else {
            let err = ToolError::UnknownTool(name.to_string());
            tracing::warn!(target: "tools", tool = name, "unknown_tool_requested");
            return ToolResponse::failure(&err);
        };

        let started = Instant::now();
        match tool.handler.invoke(arguments).await {
            Ok(output) => {
                tracing::info!(
                    target: "tools",
                    tool = name,
                    success = output.success,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tool_call_finished"
                );
                ToolResponse::from_output(output)
            }
            Err(err) => {
                tracing::warn!(
                    target: "tools",
                    tool = name,
                    error_kind = err.kind(),
                    error = %err,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "tool_call_failed"
                );
                ToolResponse::failure(&err)
            }
        }
    }
}
