use serde::{Deserialize, Serialize, de::Error as _};
use serde_json::Value;

use crate::tools::{ToolDescriptor, ToolResponse};

#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    ListTools {
        id: Value,
    },
    CallTool {
        id: Value,
        name: String,
        arguments: Value,
    },
    Exit,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: WireMessageType,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireMessageType {
    ListTools,
    CallTool,
    Exit,
}

pub fn parse_client_message(line: &str) -> Result<ClientMessage, serde_json::Error> {
    let wire: WireMessage = serde_json::from_str(line)?;
    let message = match wire.kind {
        WireMessageType::Exit => {
            if wire.id.is_some() || wire.name.is_some() || wire.arguments.is_some() {
                return Err(serde_json::Error::custom("exit message takes no fields"));
            }
            ClientMessage::Exit
        }
        WireMessageType::ListTools => {
            if wire.name.is_some() || wire.arguments.is_some() {
                return Err(serde_json::Error::custom(
                    "list_tools message only takes an id",
                ));
            }
            ClientMessage::ListTools {
                id: required_id(wire.id)?,
            }
        }
        WireMessageType::CallTool => ClientMessage::CallTool {
            id: required_id(wire.id)?,
            name: wire
                .name
                .filter(|name| !name.trim().is_empty())
                .ok_or_else(|| serde_json::Error::custom("call_tool message requires a name"))?,
            arguments: wire.arguments.unwrap_or(Value::Null),
        },
    };
    Ok(message)
}

fn required_id(id: Option<Value>) -> Result<Value, serde_json::Error> {
    match id {
        Some(id @ (Value::String(_) | Value::Number(_))) => Ok(id),
        Some(_) => Err(serde_json::Error::custom(
            "message id must be a string or number",
        )),
        None => Err(serde_json::Error::custom("message requires an id")),
    }
}

/// Best-effort id lookup on a line that failed to parse, so the error reply
/// can still be correlated.
pub fn recover_request_id(line: &str) -> Option<Value> {
    let value: Value = serde_json::from_str(line).ok()?;
    match value.get("id")? {
        id @ (Value::String(_) | Value::Number(_)) => Some(id.clone()),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Tools {
        id: Value,
        tools: Vec<ToolDescriptor>,
    },
    ToolResult {
        id: Value,
        result: ToolResponse,
    },
    Error {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<Value>,
        message: String,
    },
}

pub fn encode_server_message(message: &ServerMessage) -> Result<String, serde_json::Error> {
    serde_json::to_string(message)
}
