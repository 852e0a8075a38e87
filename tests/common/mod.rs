//! In-memory stand-in for a server process, driven by a responder closure.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use mcp_conformance::channel::LineChannel;
use mcp_conformance::error::ChannelError;
use serde_json::{json, Value};

/// What the fake server does in answer to one request.
pub enum Reply {
    Line(String),
    /// Never answers; the next read times out.
    Silent,
    /// Closes its output stream.
    Eof,
}

/// Observations shared between a test and the channel it moved into the runner.
#[derive(Default)]
pub struct ProbeState {
    pub written: Vec<String>,
    pub terminations: usize,
}

#[derive(Default, Clone)]
pub struct Probe(Rc<RefCell<ProbeState>>);

impl Probe {
    pub fn written(&self) -> Vec<Value> {
        self.0
            .borrow()
            .written
            .iter()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    /// Methods of the requests (messages with an id) written so far.
    pub fn request_methods(&self) -> Vec<String> {
        self.written()
            .iter()
            .filter(|m| m.get("id").is_some())
            .map(|m| m["method"].as_str().unwrap().to_string())
            .collect()
    }

    pub fn terminations(&self) -> usize {
        self.0.borrow().terminations
    }
}

pub struct ScriptedChannel<F> {
    respond: F,
    pending: VecDeque<Option<String>>,
    probe: Probe,
}

impl<F> ScriptedChannel<F>
where
    F: FnMut(&Value) -> Reply,
{
    pub fn new(respond: F) -> (Self, Probe) {
        let probe = Probe::default();
        let channel = Self {
            respond,
            pending: VecDeque::new(),
            probe: probe.clone(),
        };
        (channel, probe)
    }
}

impl<F> LineChannel for ScriptedChannel<F>
where
    F: FnMut(&Value) -> Reply,
{
    async fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        self.probe.0.borrow_mut().written.push(line.to_string());

        let message: Value = serde_json::from_str(line).unwrap();
        if message.get("id").is_none() {
            return Ok(());
        }
        match (self.respond)(&message) {
            Reply::Line(l) => self.pending.push_back(Some(l)),
            Reply::Eof => self.pending.push_back(None),
            Reply::Silent => {}
        }
        Ok(())
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, ChannelError> {
        match self.pending.pop_front() {
            Some(line) => Ok(line),
            None => Err(ChannelError::Timeout(timeout)),
        }
    }

    async fn terminate(self) {
        self.probe.0.borrow_mut().terminations += 1;
    }
}

/// A plausible successful result for each standard method.
pub fn default_result(method: &str) -> Value {
    match method {
        "initialize" => json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "serverInfo": { "name": "fake", "version": "0.0.0" }
        }),
        "resources/list" => json!({ "resources": [] }),
        "tools/list" => json!({ "tools": [{ "name": "create_event" }] }),
        "resources/read" => json!({ "contents": [] }),
        "tools/call" => json!({ "content": [{ "type": "text", "text": "created" }] }),
        "prompts/list" => json!({ "prompts": [] }),
        _ => json!({}),
    }
}

pub fn result_line(id: &Value, result: Value) -> Reply {
    Reply::Line(json!({ "jsonrpc": "2.0", "id": id, "result": result }).to_string())
}

pub fn error_line(id: &Value, code: i64, message: &str) -> Reply {
    Reply::Line(
        json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
            .to_string(),
    )
}

/// Responder that answers every request successfully.
pub fn conformant(request: &Value) -> Reply {
    result_line(
        &request["id"],
        default_result(request["method"].as_str().unwrap()),
    )
}

/// Line-oriented fake MCP server: answers every request with an empty result,
/// except `resources/read`, which gets a -32601 error when FAIL_READ is set.
const FAKE_SERVER: &str = r#"
echo "fake server starting" >&2
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  [ -z "$id" ] && continue
  case "$line" in
    *'"method":"resources/read"'*)
      if [ -n "$FAIL_READ" ]; then
        printf '{"jsonrpc":"2.0","id":%s,"error":{"code":-32601,"message":"not found"}}\n' "$id"
        continue
      fi
      ;;
  esac
  printf '{"jsonrpc":"2.0","id":%s,"result":{}}\n' "$id"
done
"#;

/// Write the fake server to `dir/server.sh`.
pub fn write_server(dir: &Path, fail_read: bool) {
    let prefix = if fail_read { "FAIL_READ=1\n" } else { "" };
    fs::write(dir.join("server.sh"), format!("{prefix}{FAKE_SERVER}")).unwrap();
}
