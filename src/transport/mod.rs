//! Transport implementations for remote calls
//!
//! This module defines the `Transport` trait consumed by the call proxies
//! and its implementations:
//! - `HttpTransport`: JSON over HTTP(S) with basic auth
//! - `MockTransport`: scripted in-memory responses for unit tests

mod http;

pub use http::HttpTransport;

#[cfg(test)]
pub mod mock;

#[cfg(test)]
pub use mock::MockTransport;

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::node::Node;

/// Arguments of a remote call: positional values plus named values
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallArgs {
    pub args: Vec<Value>,
    pub kwargs: BTreeMap<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a positional argument
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    /// Set a named argument, replacing any previous value
    pub fn named(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.kwargs.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.kwargs.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty() && self.kwargs.is_empty()
    }
}

/// Response as received from the wire, before decoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }
}

/// Failures that prevented any response from being obtained
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset or otherwise not established
    #[error("Connection failed: {0}")]
    Connect(String),

    /// No response within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// TLS handshake or certificate verification failed
    #[error("TLS error: {0}")]
    Tls(String),

    /// Host name could not be resolved
    #[error("DNS resolution failed: {0}")]
    Dns(String),

    /// Any other request or body I/O failure
    #[error("Request failed: {0}")]
    Request(String),

    /// Transport could not be constructed
    #[error("Failed to build transport: {0}")]
    Build(String),
}

impl TransportError {
    /// Short label for logs
    pub fn kind(&self) -> &'static str {
        match self {
            TransportError::Connect(_) => "connect",
            TransportError::Timeout(_) => "timeout",
            TransportError::Tls(_) => "tls",
            TransportError::Dns(_) => "dns",
            TransportError::Request(_) => "request",
            TransportError::Build(_) => "build",
        }
    }
}

/// Carries one named operation to one node
///
/// Implementations must be shareable across worker threads; fan-out calls
/// invoke the same transport from many workers at once.
pub trait Transport: Send + Sync {
    fn invoke(
        &self,
        node: &Node,
        operation: &str,
        args: &CallArgs,
    ) -> Result<RawResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_args_builder() {
        let args = CallArgs::new()
            .arg("first")
            .arg(2)
            .named("commandid", "abc")
            .named("signal", 15);

        assert_eq!(args.args, vec![json!("first"), json!(2)]);
        assert_eq!(args.get("signal"), Some(&json!(15)));
        assert!(!args.is_empty());
        assert!(CallArgs::new().is_empty());
    }

    #[test]
    fn test_call_args_wire_shape() {
        let args = CallArgs::new().arg(1).named("x", "y");
        let value = serde_json::to_value(&args).unwrap();
        assert_eq!(value, json!({"args": [1], "kwargs": {"x": "y"}}));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(TransportError::Timeout("t".into()).kind(), "timeout");
        assert_eq!(TransportError::Dns("d".into()).kind(), "dns");
        assert!(TransportError::Tls("bad cert".into())
            .to_string()
            .contains("bad cert"));
    }
}
