//! Wire types for the editor integration protocol.
//!
//! Every frame is exactly one line of UTF-8 JSON: a JSON-RPC 2.0 request,
//! response, or notification terminated by a single newline. Streamed
//! events are `session/update` notifications tagged by a `sessionUpdate`
//! discriminator.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::session::ToolArgs;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

/// Inbound JSON-RPC request envelope
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Outbound JSON-RPC response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, code: i32, message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(ErrorObject {
                code,
                message: message.into(),
                data,
            }),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Outbound notification envelope (no id, no response expected)
#[derive(Debug, Serialize)]
pub struct Notification {
    pub jsonrpc: &'static str,
    pub method: &'static str,
    pub params: SessionNotification,
}

impl Notification {
    pub fn session_update(session_id: impl Into<String>, update: SessionUpdate) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: "session/update",
            params: SessionNotification {
                session_id: session_id.into(),
                update,
            },
        }
    }
}

/// Parameters of a `session/update` notification
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionNotification {
    #[serde(rename = "sessionId")]
    pub session_id: String,
    pub update: SessionUpdate,
}

/// One streamed event, tagged by its discriminator string
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "sessionUpdate", rename_all = "snake_case")]
pub enum SessionUpdate {
    AgentMessageChunk {
        content: ContentChunk,
    },
    UserMessageChunk {
        content: ContentChunk,
    },
    ToolCall {
        #[serde(rename = "toolCall")]
        tool_call: ToolCallUpdate,
    },
    ToolResult {
        #[serde(rename = "toolResult")]
        tool_result: ToolResultUpdate,
    },
}

impl SessionUpdate {
    pub fn agent_text(text: impl Into<String>) -> Self {
        SessionUpdate::AgentMessageChunk {
            content: ContentChunk::Text { text: text.into() },
        }
    }

    pub fn user_text(text: impl Into<String>) -> Self {
        SessionUpdate::UserMessageChunk {
            content: ContentChunk::Text { text: text.into() },
        }
    }

    pub fn tool_call(id: impl Into<String>, name: impl Into<String>, args: ToolArgs) -> Self {
        SessionUpdate::ToolCall {
            tool_call: ToolCallUpdate {
                id: id.into(),
                name: name.into(),
                args,
            },
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, result: impl Into<String>) -> Self {
        SessionUpdate::ToolResult {
            tool_result: ToolResultUpdate {
                tool_call_id: tool_call_id.into(),
                result: result.into(),
            },
        }
    }
}

/// Text content chunk inside an update
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentChunk {
    Text { text: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolCallUpdate {
    pub id: String,
    pub name: String,
    pub args: ToolArgs,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolResultUpdate {
    #[serde(rename = "toolCallId")]
    pub tool_call_id: String,
    pub result: String,
}

// ---- Method parameters ----

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: u32,
    #[serde(default)]
    pub client_capabilities: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionParams {
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub mcp_servers: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadSessionParams {
    pub session_id: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default)]
    pub mcp_servers: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptParams {
    pub session_id: String,
    #[serde(default)]
    pub prompt: Vec<ContentBlock>,
}

/// A content block in a prompt request. Only text and resource links are
/// understood; anything else is tolerated and ignored.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ResourceLink {
        uri: String,
        #[serde(default)]
        name: String,
        #[serde(default, rename = "mimeType")]
        mime_type: String,
        #[serde(default)]
        title: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        size: Option<i64>,
    },
    #[serde(other)]
    Unknown,
}

// ---- Method results ----

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: u32,
    pub agent_capabilities: AgentCapabilities,
    pub auth_methods: Vec<Value>,
}

impl Default for InitializeResult {
    fn default() -> Self {
        Self {
            protocol_version: 1,
            agent_capabilities: AgentCapabilities {
                load_session: true,
                prompt_capabilities: PromptCapabilities {
                    audio: false,
                    embedded_context: false,
                    image: false,
                },
            },
            auth_methods: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    pub load_session: bool,
    pub prompt_capabilities: PromptCapabilities,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptCapabilities {
    pub audio: bool,
    pub embedded_context: bool,
    pub image: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSessionResult {
    pub session_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResult {
    pub stop_reason: String,
}

impl PromptResult {
    pub fn end_turn() -> Self {
        Self {
            stop_reason: "end_turn".to_string(),
        }
    }
}
