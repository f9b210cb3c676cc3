use async_trait::async_trait;
use serde_json::Value;

use crate::tools::{error::ToolError, types::ToolOutput};

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, arguments: Value) -> Result<ToolOutput, ToolError>;
}
