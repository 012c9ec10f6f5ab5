//! Remote command sessions
//!
//! A command started on a node is driven through a small RPC family keyed by
//! its command id: poll for output, push stdin, send a signal, stop. The
//! session starts `Running` and moves to `Terminated` the first time any of
//! those calls comes back with a non-success status, or when it is stopped.
//! Nothing moves it back.
//!
//! ```text
//!   start/new ──▶ Running ──(non-200 poll/push/signal, or stop)──▶ Terminated
//! ```
//!
//! Once terminated, `poll` reports termination without a round-trip and
//! `push`/`signal` return [`NodectlError::SessionTerminated`]. `stop` always
//! goes to the remote so teardown is never skipped.

use serde_json::Value;
use std::iter::FusedIterator;
use std::sync::Arc;
use tracing::{debug, info};

use crate::codec;
use crate::error::{NodectlError, Result};
use crate::node::Node;
use crate::proxy::{CallResult, NodeProxy};
use crate::signal::{signal_name, SignalSpec};
use crate::transport::CallArgs;

pub const OP_RUN: &str = "commandRun";
pub const OP_POLL: &str = "commandPoll";
pub const OP_PUSH: &str = "commandPush";
pub const OP_SIGNAL: &str = "commandSignal";
pub const OP_STOP: &str = "commandStop";

const ARG_ARGV: &str = "argv";
const ARG_COMMAND_ID: &str = "commandid";
const ARG_DATA: &str = "data";
const ARG_SIGNAL: &str = "signal";

/// Outcome of one poll
#[derive(Debug, Clone, PartialEq)]
pub enum Poll {
    /// Output produced since the last poll, possibly empty
    Chunk(Vec<u8>),

    /// The command is finished. Carries the result that caused the
    /// transition, or `None` if the session was already terminated.
    Terminated(Option<CallResult>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Terminated,
}

/// Handle to one command running on one node
#[derive(Debug)]
pub struct CommandSession {
    proxy: NodeProxy,
    command_id: String,
    state: State,
}

impl CommandSession {
    /// Attach to an already running command
    pub fn new(proxy: NodeProxy, command_id: impl Into<String>) -> Self {
        Self {
            proxy,
            command_id: command_id.into(),
            state: State::Running,
        }
    }

    /// Start `argv` on the proxy's node and attach to it
    pub fn start(proxy: NodeProxy, argv: &[String]) -> Result<Self> {
        let args = CallArgs::new().named(ARG_ARGV, argv.to_vec());
        let result = proxy.call(OP_RUN, &args);

        let command_id = match (result.is_success(), result.payload.as_ref()) {
            (true, Some(payload)) => command_id_of(payload),
            _ => None,
        };

        match command_id {
            Some(id) => {
                info!(node = %proxy.node().name, command_id = %id, "Started {:?}", argv);
                Ok(Self::new(proxy, id))
            }
            None => Err(NodectlError::CommandStart {
                node: proxy.node().name.clone(),
                status: result.status,
            }),
        }
    }

    pub fn command_id(&self) -> &str {
        &self.command_id
    }

    pub fn node(&self) -> &Arc<Node> {
        self.proxy.node()
    }

    /// True once the session has terminated
    pub fn is_done(&self) -> bool {
        self.state == State::Terminated
    }

    fn id_args(&self) -> CallArgs {
        CallArgs::new().named(ARG_COMMAND_ID, self.command_id.clone())
    }

    fn terminate(&mut self, reason: &str) {
        if self.state == State::Running {
            debug!(
                node = %self.proxy.node().name,
                command_id = %self.command_id,
                "Session terminated by {}",
                reason
            );
        }
        self.state = State::Terminated;
    }

    fn call_running(&mut self, operation: &str, args: CallArgs) -> Result<CallResult> {
        if self.is_done() {
            return Err(NodectlError::SessionTerminated {
                command_id: self.command_id.clone(),
            });
        }

        let result = self.proxy.call(operation, &args);
        if !result.is_success() {
            self.terminate(operation);
        }
        Ok(result)
    }

    /// Fetch output produced since the previous poll
    pub fn poll(&mut self) -> Poll {
        if self.is_done() {
            return Poll::Terminated(None);
        }

        let result = self.proxy.call(OP_POLL, &self.id_args());
        if result.is_success() {
            Poll::Chunk(decode_chunk(result.payload.as_ref()))
        } else {
            self.terminate(OP_POLL);
            Poll::Terminated(Some(result))
        }
    }

    /// Write `data` to the command's stdin
    pub fn push(&mut self, data: &[u8]) -> Result<CallResult> {
        let args = self
            .id_args()
            .named(ARG_DATA, codec::encode(Some(data)));
        self.call_running(OP_PUSH, args)
    }

    /// Send a signal given by number or by name (`TERM`, `sigterm`, `SIGTERM`)
    pub fn signal(&mut self, spec: impl Into<SignalSpec>) -> Result<CallResult> {
        let number = spec.into().resolve()?;
        debug!(
            node = %self.proxy.node().name,
            command_id = %self.command_id,
            "Sending {} ({})",
            signal_name(number).unwrap_or("signal"),
            number
        );
        let args = self.id_args().named(ARG_SIGNAL, number);
        self.call_running(OP_SIGNAL, args)
    }

    /// Terminate the remote command
    pub fn stop(&mut self) -> CallResult {
        self.terminate(OP_STOP);
        self.proxy.call(OP_STOP, &self.id_args())
    }

    /// Iterate over output chunks until the command terminates
    pub fn read_all(&mut self) -> Chunks<'_> {
        Chunks { session: self }
    }

    /// Wait for the command to finish and return all of its output
    pub fn output(&mut self) -> Vec<u8> {
        self.read_all().flatten().collect()
    }

    pub fn output_lossy(&mut self) -> String {
        String::from_utf8_lossy(&self.output()).into_owned()
    }
}

/// Output chunks of a session, ending when the session terminates
pub struct Chunks<'a> {
    session: &'a mut CommandSession,
}

impl Iterator for Chunks<'_> {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.session.poll() {
            Poll::Chunk(bytes) => Some(bytes),
            Poll::Terminated(_) => None,
        }
    }
}

impl FusedIterator for Chunks<'_> {}

fn command_id_of(payload: &Value) -> Option<String> {
    match payload {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map
            .get("commandid")
            .or_else(|| map.get("id"))
            .and_then(command_id_of),
        _ => None,
    }
}

fn decode_item(item: &Value) -> Vec<u8> {
    match item {
        Value::String(encoded) => codec::decode(Some(encoded.as_str())),
        Value::Null => Vec::new(),
        other => other.to_string().into_bytes(),
    }
}

fn decode_chunk(payload: Option<&Value>) -> Vec<u8> {
    match payload {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) if map.contains_key("item") => match map.get("item") {
            Some(Value::Array(items)) => items.iter().flat_map(decode_item).collect(),
            Some(item) => decode_item(item),
            None => Vec::new(),
        },
        Some(Value::Array(items)) => items.iter().flat_map(decode_item).collect(),
        Some(value @ Value::String(_)) => decode_item(value),
        Some(other) => other.to_string().into_bytes(),
    }
}
