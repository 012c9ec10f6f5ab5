//! Single-node call proxy
//!
//! This is the one place where "did the network operation succeed" turns
//! into a [`CallResult`]. Nothing past this boundary sees a transport error:
//! an unreachable node is status `0` with no payload, and an error response
//! is its status code with whatever body came back.

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::node::Node;
use crate::transport::{CallArgs, RawResponse, Transport};

/// Status of a successful call
pub const STATUS_OK: u16 = 200;

/// Status recorded when no response was obtained at all
pub const STATUS_TRANSPORT_FAILURE: u16 = 0;

/// Uniform `(status, payload)` outcome of a remote call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult {
    pub status: u16,
    pub payload: Option<Value>,
}

impl CallResult {
    pub fn new(status: u16, payload: Option<Value>) -> Self {
        Self { status, payload }
    }

    /// Outcome of a call that never got a response
    pub fn transport_failure() -> Self {
        Self::new(STATUS_TRANSPORT_FAILURE, None)
    }

    pub fn is_success(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn is_transport_failure(&self) -> bool {
        self.status == STATUS_TRANSPORT_FAILURE
    }

    pub fn into_parts(self) -> (u16, Option<Value>) {
        (self.status, self.payload)
    }
}

impl From<CallResult> for (u16, Option<Value>) {
    fn from(result: CallResult) -> Self {
        result.into_parts()
    }
}

/// Decode a raw response into a `CallResult`
///
/// JSON bodies decode to their value, other text becomes a string value and
/// an empty body (or JSON `null`) means the remote returned no data.
pub fn decode_reply(response: RawResponse) -> CallResult {
    CallResult::new(response.status, decode_body(&response.body))
}

fn decode_body(body: &str) -> Option<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Null) => None,
        Ok(value) => Some(value),
        Err(_) => Some(Value::String(body.to_string())),
    }
}

/// Proxy bound to one node
#[derive(Clone)]
pub struct NodeProxy {
    node: Arc<Node>,
    transport: Arc<dyn Transport>,
}

impl NodeProxy {
    pub fn new(node: Arc<Node>, transport: Arc<dyn Transport>) -> Self {
        Self { node, transport }
    }

    pub fn node(&self) -> &Arc<Node> {
        &self.node
    }

    /// Invoke `operation` on the bound node
    ///
    /// Never fails: transport failures become status `0` with no payload.
    pub fn call(&self, operation: &str, args: &CallArgs) -> CallResult {
        match self.transport.invoke(&self.node, operation, args) {
            Ok(response) => {
                debug!(
                    node = %self.node.name,
                    operation,
                    status = response.status,
                    "Call completed"
                );
                if response.status != STATUS_OK {
                    debug!(node = %self.node.name, reason = %response.reason, "Call returned error status");
                }
                decode_reply(response)
            }
            Err(e) => {
                warn!(
                    node = %self.node.name,
                    operation,
                    kind = e.kind(),
                    "Couldn't contact node: {}",
                    e
                );
                CallResult::transport_failure()
            }
        }
    }
}

impl fmt::Debug for NodeProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeProxy")
            .field("node", &self.node.name)
            .finish()
    }
}
