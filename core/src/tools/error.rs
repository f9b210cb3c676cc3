use thiserror::Error;

use crate::fleet::FleetError;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid arguments for {tool}: {message}")]
    InvalidArguments { tool: String, message: String },
    #[error("tool registration rejected: {0}")]
    Registration(String),
    #[error("failed to encode tool output: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("{0}")]
    Fleet(#[from] FleetError),
}

impl ToolError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownTool(_) => "unknown_tool",
            Self::InvalidArguments { .. } => "invalid_arguments",
            Self::Registration(_) => "registration",
            Self::Encoding(_) => "encoding",
            Self::Fleet(err) => err.kind.as_str(),
        }
    }
}
