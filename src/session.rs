//! Conversation sessions - messages, metadata, and persistence

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;
use crate::Result;

/// String-keyed JSON arguments passed opaquely from the backend to a tool.
pub type ToolArgs = serde_json::Map<String, Value>;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
}

/// A single tool invocation requested by the model.
///
/// The `id` is generated by the backend and must round-trip unchanged
/// between the call and the tool-role message that answers it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "tool_call_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub args: ToolArgs,
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,

    /// Tool calls made by the assistant, or the single call a tool-role
    /// message answers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

impl Message {
    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create a plain assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    /// Create an assistant message carrying tool calls
    pub fn assistant_with_tools(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls,
        }
    }

    /// Create a tool-role message answering `call`, echoing its id and name
    pub fn tool_result(call: &ToolCall, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: vec![ToolCall {
                id: call.id.clone(),
                name: call.name.clone(),
                args: ToolArgs::new(),
            }],
        }
    }
}

/// Whether tool execution requires confirmation before running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Auto,
    #[default]
    Prompt,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Auto => write!(f, "auto"),
            Mode::Prompt => write!(f, "prompt"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(Mode::Auto),
            "prompt" => Ok(Mode::Prompt),
            other => Err(Error::Config(format!(
                "Invalid mode '{other}'. Must be 'auto' or 'prompt'."
            ))),
        }
    }
}

/// Level of detail for tool execution output. Presentation hint only,
/// never sent to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolVerbosity {
    #[default]
    None,
    Info,
    All,
}

impl std::fmt::Display for ToolVerbosity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToolVerbosity::None => write!(f, "none"),
            ToolVerbosity::Info => write!(f, "info"),
            ToolVerbosity::All => write!(f, "all"),
        }
    }
}

impl std::str::FromStr for ToolVerbosity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(ToolVerbosity::None),
            "info" => Ok(ToolVerbosity::Info),
            "all" => Ok(ToolVerbosity::All),
            other => Err(Error::Config(format!(
                "Invalid tool verbosity '{other}'. Must be 'none', 'info', or 'all'."
            ))),
        }
    }
}

/// A named, persistable conversation plus its metadata.
///
/// Messages are append-only during a turn; metadata fields may be updated
/// between turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub name: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub toolset: String,
    #[serde(default)]
    pub tool_verbosity: ToolVerbosity,
    #[serde(default)]
    pub acp: bool,
}

impl Session {
    /// Create an empty session
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Vec::new(),
            mode: Mode::default(),
            toolset: String::new(),
            tool_verbosity: ToolVerbosity::default(),
            acp: false,
        }
    }

    /// Append a message to the conversation history
    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }
}

/// Durable session storage. Storage key = session name; the format must
/// round-trip all `Session` fields.
pub trait SessionStore: Send + Sync {
    fn load(&self, name: &str) -> Result<Session>;
    fn save(&self, session: &Session) -> Result<()>;
}

/// Stores each session as a pretty-printed JSON file under a directory.
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Default store location under the current working directory
    pub fn default_dir() -> PathBuf {
        PathBuf::from(".tandem").join("sessions")
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, name: &str) -> Result<Session> {
        let path = self.path_for(name);
        let data = std::fs::read_to_string(&path)
            .map_err(|e| Error::Session(format!("could not read session file {path:?}: {e}")))?;
        serde_json::from_str(&data)
            .map_err(|e| Error::Session(format!("could not parse session file {path:?}: {e}")))
    }

    fn save(&self, session: &Session) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Session(format!("could not create session directory: {e}")))?;
        let data = serde_json::to_string_pretty(session)?;
        std::fs::write(self.path_for(&session.name), data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn call(id: &str, name: &str) -> ToolCall {
        let mut args = ToolArgs::new();
        args.insert("path".to_string(), json!("a.txt"));
        ToolCall {
            id: id.to_string(),
            name: name.to_string(),
            args,
        }
    }

    #[test]
    fn test_message_constructors() {
        let msg = Message::user("Hello");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "Hello");
        assert!(msg.tool_calls.is_empty());

        let tc = call("tc_1", "read_file");
        let result = Message::tool_result(&tc, "contents");
        assert_eq!(result.role, Role::Tool);
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].id, "tc_1");
        assert_eq!(result.tool_calls[0].name, "read_file");
        assert!(result.tool_calls[0].args.is_empty());
    }

    #[test]
    fn test_tool_call_wire_field_names() {
        let tc = call("tc_9", "exec");
        let json = serde_json::to_value(&tc).unwrap();
        assert_eq!(json["tool_call_id"], "tc_9");
        assert_eq!(json["name"], "exec");
        assert_eq!(json["args"]["path"], "a.txt");
    }

    #[test]
    fn test_plain_message_omits_tool_calls() {
        let json = serde_json::to_string(&Message::assistant("hi")).unwrap();
        assert!(!json.contains("tool_calls"));
    }

    #[test]
    fn test_session_save_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = FileSessionStore::new(tmp.path());

        let mut sess = Session::new("roundtrip");
        sess.mode = Mode::Auto;
        sess.toolset = "default".to_string();
        sess.tool_verbosity = ToolVerbosity::All;
        sess.acp = true;
        sess.push(Message::user("2+2?"));
        sess.push(Message::assistant_with_tools("", vec![call("tc_1", "calc")]));
        sess.push(Message::tool_result(&call("tc_1", "calc"), "4"));
        sess.push(Message::assistant("4"));

        store.save(&sess).unwrap();
        let loaded = store.load("roundtrip").unwrap();

        assert_eq!(loaded.name, sess.name);
        assert_eq!(loaded.mode, Mode::Auto);
        assert_eq!(loaded.toolset, "default");
        assert_eq!(loaded.tool_verbosity, ToolVerbosity::All);
        assert!(loaded.acp);
        assert_eq!(loaded.messages.len(), sess.messages.len());
        for (a, b) in loaded.messages.iter().zip(sess.messages.iter()) {
            assert_eq!(a.role, b.role);
            assert_eq!(a.content, b.content);
            assert_eq!(a.tool_calls.len(), b.tool_calls.len());
            for (x, y) in a.tool_calls.iter().zip(b.tool_calls.iter()) {
                assert_eq!(x.id, y.id);
                assert_eq!(x.name, y.name);
                assert_eq!(x.args, y.args);
            }
        }
    }

    #[test]
    fn test_load_missing_session() {
        let tmp = TempDir::new().unwrap();
        let store = FileSessionStore::new(tmp.path());
        assert!(store.load("nope").is_err());
    }
}
