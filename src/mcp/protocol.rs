/// MCP (Model Context Protocol) message structures and JSON-RPC handling
///
/// This module defines the JSON-RPC message format that MCP clients use to
/// talk to the habit streak server, and how command errors map onto it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::CommandError;

/// MCP protocol version we support
pub const MCP_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 request message
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (always "2.0")
    #[allow(dead_code)]
    pub jsonrpc: String,
    /// Unique identifier for this request; absent on notifications
    #[serde(default)]
    pub id: Value,
    /// The method to call (e.g., "tools/call")
    pub method: String,
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response message
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0")
    pub jsonrpc: String,
    /// Request ID that we're responding to
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error information
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i32,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP tool call parameters
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call (e.g., "mark_complete")
    pub name: String,
    /// Arguments, deserialized into the tool's params type
    #[serde(default)]
    pub arguments: Value,
}

/// MCP tool call result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    /// Whether this is an error result
    pub is_error: bool,
}

/// Content returned by a tool
#[derive(Debug, Serialize)]
pub struct ToolContent {
    /// Type of content (always "text")
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// MCP tool definition
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema for the tool's input parameters
    pub input_schema: Value,
}

/// MCP server capabilities
#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    pub list_changed: bool,
}

/// MCP initialization response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// JSON-RPC error codes
pub mod error_codes {
    /// Parse error - Invalid JSON was received by the server
    pub const PARSE_ERROR: i32 = -32700;
    /// Invalid Request - The JSON sent is not a valid Request object
    pub const INVALID_REQUEST: i32 = -32600;
    /// Method not found - The requested method doesn't exist
    pub const METHOD_NOT_FOUND: i32 = -32601;
    /// Invalid parameters - Method exists but parameters are wrong
    pub const INVALID_PARAMS: i32 = -32602;
    /// Internal error - Internal JSON-RPC error
    pub const INTERNAL_ERROR: i32 = -32603;

    // Application codes live in -32000 to -32099
    /// Habit or group does not exist, or belongs to someone else
    pub const NOT_FOUND: i32 = -32001;
    /// The subscription tier's habit or group limit is reached
    pub const LIMIT_REACHED: i32 = -32002;
    /// Input validation failed
    pub const VALIDATION_ERROR: i32 = -32003;
    /// Database or storage operation failed
    pub const STORAGE_ERROR: i32 = -32004;
    /// The subscription tier does not include the feature
    pub const FEATURE_UNAVAILABLE: i32 = -32005;
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Value, code: i32, message: String, data: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError { code, message, data }),
        }
    }

    /// Error response for a failed command
    pub fn from_command_error(id: Value, error: &CommandError) -> Self {
        Self::error(id, command_error_code(error), command_error_message(error), None)
    }
}

impl ToolCallResult {
    /// Create a successful tool result with text content
    pub fn success(text: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: false,
        }
    }

    /// Create an error tool result
    pub fn error(error_message: String) -> Self {
        Self {
            content: vec![ToolContent {
                content_type: "text".to_string(),
                text: format!("Error: {}", error_message),
            }],
            is_error: true,
        }
    }
}

/// JSON-RPC code for a command error
///
/// Authorization failures share the not-found code.
pub fn command_error_code(error: &CommandError) -> i32 {
    match error {
        CommandError::NotFound(_) | CommandError::Authorization(_) => error_codes::NOT_FOUND,
        CommandError::Validation(_) => error_codes::VALIDATION_ERROR,
        CommandError::LimitReached(_) => error_codes::LIMIT_REACHED,
        CommandError::FeatureUnavailable(_) => error_codes::FEATURE_UNAVAILABLE,
        CommandError::Storage(_) => error_codes::STORAGE_ERROR,
    }
}

/// Message shown to the client for a command error
///
/// Not-found and not-authorized read the same so a caller cannot probe for
/// other owners' habits. Storage details stay in the server log.
pub fn command_error_message(error: &CommandError) -> String {
    match error {
        CommandError::NotFound(what) | CommandError::Authorization(what) => format!("Not found: {}", what),
        CommandError::Storage(_) => "Storage error, please retry".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DomainError, Feature};

    #[test]
    fn test_not_found_and_unauthorized_look_the_same() {
        let missing = CommandError::NotFound("habit 42".to_string());
        let foreign = CommandError::Authorization("habit 42".to_string());

        assert_eq!(command_error_code(&missing), command_error_code(&foreign));
        assert_eq!(command_error_message(&missing), command_error_message(&foreign));
    }

    #[test]
    fn test_error_codes() {
        let invalid = CommandError::Validation(DomainError::InvalidDate("x".to_string()));
        assert_eq!(command_error_code(&invalid), error_codes::VALIDATION_ERROR);
        assert_eq!(
            command_error_code(&CommandError::FeatureUnavailable(Feature::Export)),
            error_codes::FEATURE_UNAVAILABLE
        );
    }

    #[test]
    fn test_tool_result_serializes_camel_case() {
        let value = serde_json::to_value(ToolCallResult::error("boom".to_string())).unwrap();
        assert_eq!(value["isError"], true);
        assert_eq!(value["content"][0]["type"], "text");
    }
}
