//! Mock transport implementation for testing
//!
//! Responses come from a per-operation script first and from a fallback
//! handler once the script runs dry. Every invocation is recorded so tests
//! can assert on what reached the "wire".

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde_json::Value;

use super::{CallArgs, RawResponse, Transport, TransportError};
use crate::node::Node;

type Reply = Result<RawResponse, TransportError>;
type Handler = Box<dyn Fn(&Node, &str, &CallArgs) -> Reply + Send + Sync>;

/// One recorded invocation
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub node: String,
    pub operation: String,
    pub args: CallArgs,
}

pub struct MockTransport {
    handler: Handler,
    scripted: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Answer every unscripted call with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Node, &str, &CallArgs) -> Reply + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            scripted: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Answer every unscripted call with 200 and the given JSON body
    pub fn ok(body: Value) -> Self {
        let body = body.to_string();
        Self::new(move |_, _, _| Ok(json_response(200, &body)))
    }

    /// Answer every unscripted call with a transport failure
    pub fn unreachable() -> Self {
        Self::new(|node, _, _| {
            Err(TransportError::Connect(format!("{} refused", node.name)))
        })
    }

    /// Queue a reply for the next call to `operation`
    pub fn enqueue(&self, operation: &str, reply: Reply) -> &Self {
        self.scripted
            .lock()
            .unwrap()
            .entry(operation.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    /// Queue a JSON reply with the given status
    pub fn enqueue_json(&self, operation: &str, status: u16, body: Value) -> &Self {
        self.enqueue(operation, Ok(json_response(status, &body.to_string())))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, operation: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.operation == operation)
            .collect()
    }
}

impl Transport for MockTransport {
    fn invoke(&self, node: &Node, operation: &str, args: &CallArgs) -> Reply {
        self.calls.lock().unwrap().push(RecordedCall {
            node: node.name.clone(),
            operation: operation.to_string(),
            args: args.clone(),
        });

        let scripted = self
            .scripted
            .lock()
            .unwrap()
            .get_mut(operation)
            .and_then(VecDeque::pop_front);

        match scripted {
            Some(reply) => reply,
            None => (self.handler)(node, operation, args),
        }
    }
}

/// Build a raw JSON response
pub fn json_response(status: u16, body: &str) -> RawResponse {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or_default();
    RawResponse::new(status, reason, body)
}
