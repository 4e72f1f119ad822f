//! LLM client abstraction layer.
//!
//! Backends are stateless request/response translators: given the full
//! message history and the catalog of available tools, they return a single
//! assistant message that either answers in text or requests tool calls.
//!
//! # Adding a New Provider
//!
//! 1. Implement the [`LlmClient`] trait
//! 2. Add it to [`create_client`]
//! 3. Add any config fields in `config.rs`

use async_trait::async_trait;

use crate::config::Config;
use crate::error::Error;
use crate::session::{Message, Role, ToolArgs, ToolCall};
use crate::tools::ToolDescriptor;
use crate::Result;

/// LLM client trait — swappable backend abstraction.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send the ordered message history and available tool descriptors,
    /// get back one assistant message.
    async fn chat(&self, messages: &[Message], tools: &[ToolDescriptor]) -> Result<Message>;
}

/// Create an LLM client from configuration.
pub fn create_client(config: &Config) -> Result<Box<dyn LlmClient>> {
    match config.provider.as_str() {
        "mock" => Ok(Box::new(MockLlmClient::default())),
        other => Err(Error::Config(format!("Unknown provider: {other}"))),
    }
}

/// Canned-response client used when no real backend is configured, and as
/// a building block in tests. It can be set up to request a single tool
/// call and to answer differently once a tool result is in the history.
pub struct MockLlmClient {
    pub response_content: String,
    pub tool_response: String,
    pub return_tool_call: bool,
    pub tool_name_to_call: String,
    pub tool_args_to_call: ToolArgs,
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self {
            response_content: "Mock response.".to_string(),
            tool_response: "Mock response after tool call.".to_string(),
            return_tool_call: false,
            tool_name_to_call: String::new(),
            tool_args_to_call: ToolArgs::new(),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn chat(&self, messages: &[Message], _tools: &[ToolDescriptor]) -> Result<Message> {
        // Once a tool result is present, answer with the configured
        // post-tool response instead of requesting the tool again.
        if messages.last().map(|m| m.role) == Some(Role::Tool) {
            return Ok(Message::assistant(self.tool_response.clone()));
        }

        if self.return_tool_call {
            let call = ToolCall {
                id: "mock_call_1".to_string(),
                name: self.tool_name_to_call.clone(),
                args: self.tool_args_to_call.clone(),
            };
            return Ok(Message::assistant_with_tools("", vec![call]));
        }

        Ok(Message::assistant(self.response_content.clone()))
    }
}

/// Scripted client for tests — pops a queue of canned assistant messages.
#[cfg(test)]
pub struct ScriptedLlmClient {
    responses: std::sync::Mutex<std::collections::VecDeque<Message>>,
}

#[cfg(test)]
impl ScriptedLlmClient {
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into()),
        }
    }

    /// Text-only replies, one per round.
    pub fn texts(texts: Vec<&str>) -> Self {
        Self::new(texts.into_iter().map(Message::assistant).collect())
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn chat(&self, _messages: &[Message], _tools: &[ToolDescriptor]) -> Result<Message> {
        let mut responses = self.responses.lock().unwrap();
        responses
            .pop_front()
            .ok_or_else(|| Error::Llm("No more scripted responses".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_client_text() {
        let client = MockLlmClient::default();
        let reply = client.chat(&[Message::user("hi")], &[]).await.unwrap();
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Mock response.");
        assert!(reply.tool_calls.is_empty());
    }

    #[tokio::test]
    async fn test_mock_client_tool_call_then_answer() {
        let mut args = ToolArgs::new();
        args.insert("command".to_string(), json!("ls"));
        let client = MockLlmClient {
            return_tool_call: true,
            tool_name_to_call: "execute_command".to_string(),
            tool_args_to_call: args,
            ..MockLlmClient::default()
        };

        let reply = client
            .chat(&[Message::user("list files")], &[])
            .await
            .unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "execute_command");

        // After a tool-role message the mock answers with the post-tool text.
        let history = vec![
            Message::user("list files"),
            reply.clone(),
            Message::tool_result(&reply.tool_calls[0], "a.txt"),
        ];
        let followup = client.chat(&history, &[]).await.unwrap();
        assert_eq!(followup.content, "Mock response after tool call.");
    }

    #[tokio::test]
    async fn test_scripted_client_exhaustion() {
        let client = ScriptedLlmClient::texts(vec!["one"]);
        assert!(client.chat(&[], &[]).await.is_ok());
        assert!(client.chat(&[], &[]).await.is_err());
    }
}
