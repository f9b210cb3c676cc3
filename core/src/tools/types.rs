use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::tools::error::ToolError;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
    /// The tool changes directory state.
    pub destructive: bool,
}

/// What a handler produced. `success` is false when the operation ran to a
/// well-formed but unsuccessful result, such as a provisioning run that stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub success: bool,
    pub message: Option<String>,
    pub data: Value,
    pub error: Option<String>,
}

impl ToolOutput {
    pub fn data(data: impl Serialize) -> Result<Self, ToolError> {
        Ok(Self {
            success: true,
            message: None,
            data: serde_json::to_value(data)?,
            error: None,
        })
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn unsuccessful(mut self, error: Option<String>) -> Self {
        self.success = false;
        self.error = error;
        self
    }
}

/// Envelope returned for every tool call.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub request_id: Uuid,
}

impl ToolResponse {
    pub fn from_output(output: ToolOutput) -> Self {
        Self {
            success: output.success,
            data: Some(output.data),
            message: output.message,
            error: output.error,
            error_kind: None,
            timestamp: OffsetDateTime::now_utc(),
            request_id: Uuid::now_v7(),
        }
    }

    pub fn failure(err: &ToolError) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(err.to_string()),
            error_kind: Some(err.kind().to_string()),
            timestamp: OffsetDateTime::now_utc(),
            request_id: Uuid::now_v7(),
        }
    }
}
