//! Editor integration protocol server.
//!
//! Exposes sessions and the orchestration loop over newline-delimited
//! JSON-RPC on a reader/writer pair (stdio in production, buffers in
//! tests). A minimal subset of the Agent Client Protocol is implemented:
//!
//! - `initialize`
//! - `session/new`
//! - `session/load` (replays history as `session/update` notifications)
//! - `session/prompt` (streams agent_message_chunk, tool_call, and
//!   tool_result notifications)
//!
//! Dispatch is strictly single-threaded: one inbound frame is fully
//! processed, including the entire LLM/tool round trip, before the next
//! is read. Nothing but protocol frames may be written to the writer, so
//! all logging goes through `tracing` (stderr).

pub mod wire;

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;
use tracing::{debug, trace, warn};
use url::Url;

use crate::agent::{Agent, TurnObserver};
use crate::error::Error;
use crate::session::{Role, Session, SessionStore, ToolCall};
use crate::Result;
use wire::{
    ContentBlock, InitializeParams, InitializeResult, LoadSessionParams, NewSessionParams,
    NewSessionResult, Notification, PromptParams, PromptResult, Request, Response, SessionUpdate,
    INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, PARSE_ERROR,
};

/// Size cap for file contents inlined from a `file://` resource link.
const MAX_INLINE_RESOURCE_BYTES: usize = 50_000;

/// Serialize one frame and write it atomically: bytes, newline, flush,
/// all under the writer lock. A line-oriented peer blocks until it sees
/// the terminator, so partial or unflushed frames would wedge it.
fn write_frame<W: Write, T: serde::Serialize>(writer: &Mutex<W>, frame: &T) -> Result<()> {
    let data = serde_json::to_vec(frame)?;
    let mut w = writer.lock().unwrap_or_else(|e| e.into_inner());
    w.write_all(&data)?;
    w.write_all(b"\n")?;
    w.flush()?;
    Ok(())
}

/// The protocol server: session registry, framing, and method dispatch.
pub struct AcpServer<R: BufRead, W: Write> {
    agent: Agent,
    store: Arc<dyn SessionStore>,
    sessions: Mutex<HashMap<String, Session>>,
    session_id_seq: u64,
    reader: R,
    writer: Arc<Mutex<W>>,
}

impl<R: BufRead, W: Write> AcpServer<R, W> {
    pub fn new(agent: Agent, store: Arc<dyn SessionStore>, reader: R, writer: W) -> Self {
        Self {
            agent,
            store,
            sessions: Mutex::new(HashMap::new()),
            session_id_seq: 0,
            reader,
            writer: Arc::new(Mutex::new(writer)),
        }
    }

    /// Read and dispatch frames until end-of-input.
    ///
    /// A line that fails to parse gets a -32700 response and the loop
    /// continues; an I/O failure on either side of the pipe is fatal
    /// because line framing cannot be resynchronized.
    pub async fn run(&mut self) -> Result<()> {
        let mut line = String::new();
        loop {
            line.clear();
            let n = self.reader.read_line(&mut line)?;
            if n == 0 {
                debug!("end of input, shutting down");
                return Ok(());
            }

            let payload = line.trim();
            if payload.is_empty() {
                continue;
            }
            trace!(payload, "received frame");

            let req: Request = match serde_json::from_str(payload) {
                Ok(req) => req,
                Err(e) => {
                    debug!(error = %e, "unparsable frame");
                    // The request id is unknown here, so the response id is null.
                    self.respond_err(Value::Null, PARSE_ERROR, "Parse error", None)?;
                    continue;
                }
            };

            let id = req.id.clone().unwrap_or(Value::Null);
            debug!(method = %req.method, "dispatching");
            match req.method.as_str() {
                "initialize" => self.handle_initialize(id, req.params)?,
                "session/new" => self.handle_session_new(id, req.params)?,
                "session/load" => self.handle_session_load(id, req.params)?,
                "session/prompt" => self.handle_session_prompt(id, req.params).await?,
                _ => self.respond_err(id, METHOD_NOT_FOUND, "Method not found", None)?,
            }
        }
    }

    fn respond_ok(&self, id: Value, result: Value) -> Result<()> {
        write_frame(&self.writer, &Response::ok(id, result))
    }

    fn respond_err(&self, id: Value, code: i32, message: &str, data: Option<Value>) -> Result<()> {
        write_frame(&self.writer, &Response::err(id, code, message, data))
    }

    fn notify(&self, session_id: &str, update: SessionUpdate) -> Result<()> {
        write_frame(&self.writer, &Notification::session_update(session_id, update))
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_session_id(&mut self) -> String {
        self.session_id_seq += 1;
        let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("sess_{nanos}_{}", self.session_id_seq)
    }

    fn handle_initialize(&self, id: Value, params: Value) -> Result<()> {
        // Client capabilities are accepted but nothing is negotiated yet.
        let _params: InitializeParams = serde_json::from_value(params).unwrap_or_default();
        self.respond_ok(id, serde_json::to_value(InitializeResult::default())?)
    }

    fn handle_session_new(&mut self, id: Value, params: Value) -> Result<()> {
        let _params: NewSessionParams = serde_json::from_value(params).unwrap_or_default();

        let sid = self.next_session_id();
        let mut session = Session::new(sid.clone());
        session.mode = self.agent.mode;
        session.toolset = self.agent.toolset.clone();
        session.tool_verbosity = self.agent.verbosity;
        session.acp = true;

        self.registry().insert(sid.clone(), session);
        debug!(session_id = %sid, "created session");

        self.respond_ok(id, serde_json::to_value(NewSessionResult { session_id: sid })?)
    }

    fn handle_session_load(&self, id: Value, params: Value) -> Result<()> {
        let params: LoadSessionParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return self.respond_err(
                    id,
                    INVALID_PARAMS,
                    "Invalid params",
                    Some(Value::String(e.to_string())),
                )
            }
        };

        let session = match self.store.load(&params.session_id) {
            Ok(session) => session,
            Err(e) => {
                return self.respond_err(
                    id,
                    INVALID_PARAMS,
                    "Invalid params",
                    Some(Value::String(format!("session not found: {e}"))),
                )
            }
        };

        self.registry()
            .insert(params.session_id.clone(), session.clone());

        debug!(session_id = %params.session_id, messages = session.messages.len(), "replaying session");
        self.replay(&params.session_id, &session)?;

        self.respond_ok(id, Value::Null)
    }

    /// Replay a loaded session's history, in original order, as
    /// notifications. Fully flushed before the load response is sent.
    fn replay(&self, session_id: &str, session: &Session) -> Result<()> {
        for msg in &session.messages {
            match msg.role {
                Role::User => {
                    self.notify(session_id, SessionUpdate::user_text(msg.content.clone()))?;
                }
                Role::Assistant => {
                    if !msg.content.is_empty() {
                        self.notify(session_id, SessionUpdate::agent_text(msg.content.clone()))?;
                    }
                    for call in &msg.tool_calls {
                        self.notify(
                            session_id,
                            SessionUpdate::tool_call(&call.id, &call.name, call.args.clone()),
                        )?;
                    }
                }
                Role::Tool => {
                    // The single echoed call identifies which invocation
                    // this result answers.
                    if let Some(call) = msg.tool_calls.first() {
                        self.notify(
                            session_id,
                            SessionUpdate::tool_result(&call.id, msg.content.clone()),
                        )?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn handle_session_prompt(&mut self, id: Value, params: Value) -> Result<()> {
        let params: PromptParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => {
                return self.respond_err(
                    id,
                    INVALID_PARAMS,
                    "Invalid params",
                    Some(Value::String(e.to_string())),
                )
            }
        };

        // Take the session out of the registry for the duration of the
        // turn; dispatch is serialized, so nothing else can observe the
        // gap.
        let Some(mut session) = self.registry().remove(&params.session_id) else {
            return self.respond_err(
                id,
                INVALID_PARAMS,
                "Invalid params",
                Some(Value::String("unknown sessionId".to_string())),
            );
        };

        let user_text = extract_user_text(&params.prompt);
        trace!(session_id = %params.session_id, text = %user_text, "prompt text extracted");

        let mut sink = UpdateSink {
            session_id: &params.session_id,
            writer: self.writer.as_ref(),
        };
        let outcome = self
            .agent
            .process_user_input(&mut session, &user_text, &mut sink)
            .await;

        self.registry().insert(params.session_id.clone(), session);

        match outcome {
            Ok(()) => self.respond_ok(id, serde_json::to_value(PromptResult::end_turn())?),
            Err(e) => self.respond_err(
                id,
                INTERNAL_ERROR,
                "Internal error",
                Some(Value::String(format!("error processing user input: {e}"))),
            ),
        }
    }
}

/// Forwards turn events as `session/update` notifications.
///
/// Tool execution is always approved: the protocol has no synchronous
/// confirmation round trip, so prompt mode's gate does not apply under
/// protocol control.
struct UpdateSink<'a, W: Write> {
    session_id: &'a str,
    writer: &'a Mutex<W>,
}

impl<W: Write> UpdateSink<'_, W> {
    fn send(&self, update: SessionUpdate) {
        let note = Notification::session_update(self.session_id, update);
        if let Err(e) = write_frame(self.writer, &note) {
            warn!(error = %e, "failed to write notification");
        }
    }
}

impl<W: Write> TurnObserver for UpdateSink<'_, W> {
    fn on_assistant_message(&mut self, text: &str) {
        self.send(SessionUpdate::agent_text(text));
    }

    fn on_tool_call(&mut self, call: &ToolCall) {
        self.send(SessionUpdate::tool_call(
            &call.id,
            &call.name,
            call.args.clone(),
        ));
    }

    fn on_tool_result(&mut self, call: &ToolCall, result: &str) {
        self.send(SessionUpdate::tool_result(&call.id, result));
    }

    fn should_execute_tool(&mut self, _call: &ToolCall) -> bool {
        true
    }

    fn on_warning(&mut self, text: &str) {
        warn!(session_id = %self.session_id, "{text}");
    }
}

/// Build a single prompt string from the request's content blocks.
///
/// Text blocks contribute their text verbatim; resource links contribute
/// a synthesized description, inlining `file://` contents up to
/// [`MAX_INLINE_RESOURCE_BYTES`].
pub fn extract_user_text(blocks: &[ContentBlock]) -> String {
    let mut parts: Vec<String> = Vec::new();
    for block in blocks {
        match block {
            ContentBlock::Text { text } => {
                if !text.trim().is_empty() {
                    parts.push(text.clone());
                }
            }
            ContentBlock::ResourceLink {
                uri,
                name,
                mime_type,
                title,
                description,
                size,
            } => {
                let mut info = format!("=== Resource: {name} ===\n");
                if !title.is_empty() {
                    info.push_str(&format!("Title: {title}\n"));
                }
                if !description.is_empty() {
                    info.push_str(&format!("Description: {description}\n"));
                }
                info.push_str(&format!("URI: {uri}\n"));
                if !mime_type.is_empty() {
                    info.push_str(&format!("Type: {mime_type}\n"));
                }
                if let Some(size) = size {
                    info.push_str(&format!("Size: {size} bytes\n"));
                }

                if uri.starts_with("file://") {
                    match read_file_from_uri(uri) {
                        Ok(content) => {
                            let content = truncate_inline(content);
                            info.push_str(&format!(
                                "\n--- File Contents ---\n{content}\n--- End of File ---\n"
                            ));
                        }
                        Err(e) => {
                            info.push_str(&format!("\n[Error reading file: {e}]\n"));
                        }
                    }
                } else {
                    info.push_str("\n[External resource - content not available]\n");
                }

                info.push_str("=== End Resource ===\n");
                parts.push(info);
            }
            ContentBlock::Unknown => {}
        }
    }
    parts.join("\n")
}

fn truncate_inline(mut content: String) -> String {
    if content.len() > MAX_INLINE_RESOURCE_BYTES {
        let mut end = MAX_INLINE_RESOURCE_BYTES;
        while !content.is_char_boundary(end) {
            end -= 1;
        }
        content.truncate(end);
        content.push_str("\n\n[... truncated to 50KB ...]");
    }
    content
}

fn read_file_from_uri(uri: &str) -> Result<String> {
    let parsed = Url::parse(uri).map_err(|e| Error::Protocol(format!("invalid URI: {e}")))?;
    if parsed.scheme() != "file" {
        return Err(Error::Protocol(format!(
            "unsupported URI scheme: {}",
            parsed.scheme()
        )));
    }
    let path = parsed
        .to_file_path()
        .map_err(|_| Error::Protocol(format!("invalid file path in URI: {uri}")))?;
    std::fs::read_to_string(&path)
        .map_err(|e| Error::Protocol(format!("failed to read file: {e}")))
}
