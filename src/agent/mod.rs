//! Agent module — the orchestration loop.
//!
//! Turns one user input into a fully resolved assistant turn: the loop
//! talks to the LLM backend, executes any tool calls it requests, feeds
//! the results back, and persists the session at turn boundaries. A
//! [`TurnObserver`] decouples the loop from its presentation, so the same
//! logic drives both the terminal front-end and the protocol server.

pub mod llm;

pub use llm::{create_client, LlmClient, MockLlmClient};

use std::sync::Arc;

use tracing::debug;

use crate::config::Config;
use crate::error::Error;
use crate::session::{Message, Mode, Session, SessionStore, ToolCall, ToolVerbosity};
use crate::tools::{self, Tool, ToolDescriptor};
use crate::Result;

/// Observer of turn events. All methods default to no-ops; tool execution
/// is approved unless overridden.
pub trait TurnObserver {
    /// Assistant produced text content
    fn on_assistant_message(&mut self, _text: &str) {}

    /// Backend requested a tool invocation
    fn on_tool_call(&mut self, _call: &ToolCall) {}

    /// A tool invocation resolved to a textual result
    fn on_tool_result(&mut self, _call: &ToolCall, _result: &str) {}

    /// Confirmation gate consulted in prompt mode before executing a tool
    fn should_execute_tool(&mut self, _call: &ToolCall) -> bool {
        true
    }

    /// Non-fatal problem worth surfacing (e.g. a failed session save)
    fn on_warning(&mut self, _text: &str) {}
}

/// The agent drives the LLM and tool capabilities against a session.
///
/// One `process_user_input` invocation owns its session for the duration
/// of the turn; the agent itself holds no conversational state.
pub struct Agent {
    llm: Box<dyn LlmClient>,
    available_tools: Vec<Box<dyn Tool>>,
    store: Arc<dyn SessionStore>,
    pub mode: Mode,
    pub verbosity: ToolVerbosity,
    pub toolset: String,
}

impl Agent {
    /// Create an agent from configuration, resolving the named toolset.
    pub fn new(
        config: &Config,
        toolset: &str,
        mode: Mode,
        verbosity: ToolVerbosity,
        client: Box<dyn LlmClient>,
        store: Arc<dyn SessionStore>,
    ) -> Result<Self> {
        let available_tools = tools::active_tools(config, toolset)?;
        Ok(Self::from_parts(
            client,
            available_tools,
            mode,
            verbosity,
            toolset.to_string(),
            store,
        ))
    }

    /// Assemble an agent from already-built parts.
    pub fn from_parts(
        llm: Box<dyn LlmClient>,
        available_tools: Vec<Box<dyn Tool>>,
        mode: Mode,
        verbosity: ToolVerbosity,
        toolset: String,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            llm,
            available_tools,
            mode,
            verbosity,
            toolset,
            store,
        }
    }

    fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.available_tools.iter().map(|t| t.descriptor()).collect()
    }

    /// Convert one user input into a fully resolved assistant turn.
    ///
    /// Appends the user message, then alternates LLM rounds and tool
    /// execution until the backend answers without tool calls. Tool
    /// failures become conversation content; only an LLM failure aborts
    /// the turn. The session is persisted after each tool batch and after
    /// the final answer.
    pub async fn process_user_input(
        &self,
        session: &mut Session,
        user_text: &str,
        observer: &mut dyn TurnObserver,
    ) -> Result<()> {
        session.push(Message::user(user_text));

        let descriptors = self.descriptors();
        loop {
            let assistant = self
                .llm
                .chat(&session.messages, &descriptors)
                .await
                .map_err(|e| Error::Llm(format!("LLM chat failed: {e}")))?;

            let content = assistant.content.clone();
            let tool_calls = assistant.tool_calls.clone();
            session.push(assistant);

            if !content.is_empty() {
                observer.on_assistant_message(&content);
            }

            if tool_calls.is_empty() {
                self.save_session(session, observer);
                return Ok(());
            }

            for call in &tool_calls {
                observer.on_tool_call(call);
                let result = self.run_tool_call(call, observer).await;
                observer.on_tool_result(call, &result);
                session.push(Message::tool_result(call, result));
            }

            self.save_session(session, observer);
            // Send the tool results back to the LLM.
        }
    }

    /// Resolve and execute one tool call, folding every failure into the
    /// textual result.
    async fn run_tool_call(&self, call: &ToolCall, observer: &mut dyn TurnObserver) -> String {
        if self.mode == Mode::Prompt && !observer.should_execute_tool(call) {
            return "User denied tool execution.".to_string();
        }

        let Some(tool) = self
            .available_tools
            .iter()
            .find(|t| t.name() == call.name)
        else {
            return format!(
                "Error executing tool {}: tool '{}' not found in the available toolset",
                call.name, call.name
            );
        };

        debug!(tool = %call.name, "executing tool call");
        match tool.execute(&call.args).await {
            Ok(result) => result,
            Err(e) => format!("Error executing tool {}: {e}", call.name),
        }
    }

    fn save_session(&self, session: &Session, observer: &mut dyn TurnObserver) {
        if let Err(e) = self.store.save(session) {
            observer.on_warning(&format!("failed to save session: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::llm::ScriptedLlmClient;
    use super::*;
    use crate::session::{Role, ToolArgs};
    use crate::tools::{DummyTool, FailingTool};
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingObserver {
        events: Vec<String>,
        deny_tools: bool,
        warnings: Vec<String>,
    }

    impl TurnObserver for RecordingObserver {
        fn on_assistant_message(&mut self, text: &str) {
            self.events.push(format!("assistant:{text}"));
        }

        fn on_tool_call(&mut self, call: &ToolCall) {
            self.events.push(format!("call:{}", call.name));
        }

        fn on_tool_result(&mut self, call: &ToolCall, result: &str) {
            self.events.push(format!("result:{}:{result}", call.name));
        }

        fn should_execute_tool(&mut self, _call: &ToolCall) -> bool {
            !self.deny_tools
        }

        fn on_warning(&mut self, text: &str) {
            self.warnings.push(text.to_string());
        }
    }

    fn tool_call(id: &str, name: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            args: ToolArgs::new(),
        }
    }

    fn agent_with(
        client: ScriptedLlmClient,
        tools: Vec<Box<dyn Tool>>,
        mode: Mode,
        dir: &std::path::Path,
    ) -> Agent {
        Agent::from_parts(
            Box::new(client),
            tools,
            mode,
            ToolVerbosity::None,
            "default".to_string(),
            Arc::new(crate::session::FileSessionStore::new(dir)),
        )
    }

    #[tokio::test]
    async fn test_text_only_turn() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::texts(vec!["4"]),
            vec![],
            Mode::Auto,
            tmp.path(),
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver::default();
        agent
            .process_user_input(&mut session, "2+2?", &mut obs)
            .await
            .unwrap();

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "2+2?");
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert_eq!(session.messages[1].content, "4");
        assert!(session.messages[1].tool_calls.is_empty());
        assert_eq!(obs.events, ["assistant:4"]);
        assert!(tmp.path().join("t.json").exists());
    }

    #[tokio::test]
    async fn test_tool_round_interleaving() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::new(vec![
                Message::assistant_with_tools("", vec![tool_call("tc_1", "dummy")]),
                Message::assistant("done"),
            ]),
            vec![Box::new(DummyTool {
                name: "dummy".to_string(),
                result: "ok".to_string(),
            })],
            Mode::Auto,
            tmp.path(),
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver::default();
        agent
            .process_user_input(&mut session, "go", &mut obs)
            .await
            .unwrap();

        let roles: Vec<Role> = session.messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, [Role::User, Role::Assistant, Role::Tool, Role::Assistant]);
        assert_eq!(session.messages[2].content, "ok");
        assert_eq!(session.messages[2].tool_calls.len(), 1);
        assert_eq!(session.messages[2].tool_calls[0].id, "tc_1");
        assert_eq!(obs.events, ["call:dummy", "result:dummy:ok", "assistant:done"]);
    }

    #[tokio::test]
    async fn test_multiple_tool_calls_in_order() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::new(vec![
                Message::assistant_with_tools(
                    "",
                    vec![tool_call("tc_1", "dummy"), tool_call("tc_2", "dummy")],
                ),
                Message::assistant("done"),
            ]),
            vec![Box::new(DummyTool {
                name: "dummy".to_string(),
                result: "ok".to_string(),
            })],
            Mode::Auto,
            tmp.path(),
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver::default();
        agent
            .process_user_input(&mut session, "go", &mut obs)
            .await
            .unwrap();

        // One tool-role message per call, ids echoed in order
        assert_eq!(session.messages[2].tool_calls[0].id, "tc_1");
        assert_eq!(session.messages[3].tool_calls[0].id, "tc_2");
    }

    #[tokio::test]
    async fn test_missing_tool_becomes_error_content() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::new(vec![
                Message::assistant_with_tools("", vec![tool_call("tc_1", "nonexistent")]),
                Message::assistant("sorry"),
            ]),
            vec![],
            Mode::Auto,
            tmp.path(),
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver::default();
        agent
            .process_user_input(&mut session, "go", &mut obs)
            .await
            .unwrap();

        assert_eq!(session.messages[2].role, Role::Tool);
        assert!(session.messages[2].content.contains("Error"));
        assert!(session.messages[2].content.contains("nonexistent"));
    }

    #[tokio::test]
    async fn test_failing_tool_becomes_error_content() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::new(vec![
                Message::assistant_with_tools("", vec![tool_call("tc_1", "failing_tool")]),
                Message::assistant("sorry"),
            ]),
            vec![Box::new(FailingTool)],
            Mode::Auto,
            tmp.path(),
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver::default();
        agent
            .process_user_input(&mut session, "go", &mut obs)
            .await
            .unwrap();

        assert!(session.messages[2]
            .content
            .starts_with("Error executing tool failing_tool:"));
    }

    #[tokio::test]
    async fn test_prompt_mode_denial() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::new(vec![
                Message::assistant_with_tools("", vec![tool_call("tc_1", "dummy")]),
                Message::assistant("ok then"),
            ]),
            vec![Box::new(DummyTool {
                name: "dummy".to_string(),
                result: "should not run".to_string(),
            })],
            Mode::Prompt,
            tmp.path(),
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver {
            deny_tools: true,
            ..RecordingObserver::default()
        };
        agent
            .process_user_input(&mut session, "go", &mut obs)
            .await
            .unwrap();

        assert_eq!(session.messages[2].content, "User denied tool execution.");
    }

    #[tokio::test]
    async fn test_auto_mode_skips_confirmation_gate() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::new(vec![
                Message::assistant_with_tools("", vec![tool_call("tc_1", "dummy")]),
                Message::assistant("done"),
            ]),
            vec![Box::new(DummyTool {
                name: "dummy".to_string(),
                result: "ran".to_string(),
            })],
            Mode::Auto,
            tmp.path(),
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver {
            deny_tools: true,
            ..RecordingObserver::default()
        };
        agent
            .process_user_input(&mut session, "go", &mut obs)
            .await
            .unwrap();

        // The gate only applies in prompt mode
        assert_eq!(session.messages[2].content, "ran");
    }

    #[tokio::test]
    async fn test_llm_failure_aborts_turn() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(ScriptedLlmClient::texts(vec![]), vec![], Mode::Auto, tmp.path());

        let mut session = Session::new("t");
        let mut obs = RecordingObserver::default();
        let result = agent
            .process_user_input(&mut session, "hello", &mut obs)
            .await;

        assert!(result.is_err());
        // The user message stays; no assistant message was appended
        assert_eq!(session.messages.len(), 1);
        assert_eq!(session.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_save_failure_warns_but_turn_succeeds() {
        let tmp = TempDir::new().unwrap();
        // Root the store at a regular file so creating the session
        // directory fails on save.
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let agent = agent_with(
            ScriptedLlmClient::texts(vec!["4"]),
            vec![],
            Mode::Auto,
            &blocker,
        );

        let mut session = Session::new("t");
        let mut obs = RecordingObserver::default();
        agent
            .process_user_input(&mut session, "2+2?", &mut obs)
            .await
            .unwrap();

        assert_eq!(session.messages.len(), 2);
        assert_eq!(obs.events, ["assistant:4"]);
        assert_eq!(obs.warnings.len(), 1);
        assert!(obs.warnings[0].starts_with("failed to save session:"));
    }

    #[tokio::test]
    async fn test_session_persisted_after_tool_batch() {
        let tmp = TempDir::new().unwrap();
        let agent = agent_with(
            ScriptedLlmClient::new(vec![
                Message::assistant_with_tools("", vec![tool_call("tc_1", "dummy")]),
                Message::assistant("done"),
            ]),
            vec![Box::new(DummyTool {
                name: "dummy".to_string(),
                result: "ok".to_string(),
            })],
            Mode::Auto,
            tmp.path(),
        );

        let mut session = Session::new("persisted");
        let mut obs = RecordingObserver::default();
        agent
            .process_user_input(&mut session, "go", &mut obs)
            .await
            .unwrap();

        let store = crate::session::FileSessionStore::new(tmp.path());
        let loaded = store.load("persisted").unwrap();
        assert_eq!(loaded.messages.len(), 4);
        assert!(obs.warnings.is_empty());
    }
}
