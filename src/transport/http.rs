//! JSON-over-HTTP transport
//!
//! Each call is a `POST {scheme}://{host}/remote/{operation}` carrying
//! `{"args": [...], "kwargs": {...}}`, authenticated with HTTP basic auth
//! when the node has credentials.

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use std::error::Error as StdError;
use std::time::Duration;
use tracing::{debug, warn};

use super::{CallArgs, RawResponse, Transport, TransportError};
use crate::config::{FleetConfig, TlsVerify};
use crate::node::Node;

/// Blocking HTTP transport shared by all worker threads
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport with the given per-call timeout and TLS policy
    pub fn new(timeout: Duration, verify: &TlsVerify) -> Result<Self, TransportError> {
        let mut builder = Client::builder().timeout(timeout).connect_timeout(timeout);

        match verify {
            TlsVerify::Enabled(true) => {}
            TlsVerify::Enabled(false) => {
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsVerify::CaBundle(path) => {
                let pem = std::fs::read(path).map_err(|e| {
                    TransportError::Build(format!("Failed to read {}: {}", path.display(), e))
                })?;
                let cert = reqwest::Certificate::from_pem(&pem)
                    .map_err(|e| TransportError::Build(format!("Invalid CA bundle: {}", e)))?;
                builder = builder.add_root_certificate(cert);
            }
        }

        let client = builder
            .build()
            .map_err(|e| TransportError::Build(e.to_string()))?;

        Ok(Self { client })
    }

    pub fn from_config(config: &FleetConfig) -> Result<Self, TransportError> {
        Self::new(config.timeout(), &config.verify_ssl)
    }

    /// URL a given operation is posted to
    pub fn endpoint(node: &Node, operation: &str) -> String {
        format!("{}/remote/{}", node.base_url(), operation)
    }
}

impl Transport for HttpTransport {
    fn invoke(
        &self,
        node: &Node,
        operation: &str,
        args: &CallArgs,
    ) -> Result<RawResponse, TransportError> {
        let url = Self::endpoint(node, operation);
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(args);

        if let Some(ref username) = node.username {
            request = request.basic_auth(username, node.password.as_ref());
        }

        let response = request.send().map_err(classify)?;
        let status = response.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        // The status already arrived; a broken body only loses the payload
        let body = response.text().unwrap_or_else(|err| {
            warn!("{}: body of {} reply unreadable: {}", url, status.as_u16(), error_chain(&err));
            String::new()
        });

        Ok(RawResponse {
            status: status.as_u16(),
            reason,
            body,
        })
    }
}

/// Sort a reqwest failure into the transport error taxonomy
fn classify(err: reqwest::Error) -> TransportError {
    let detail = error_chain(&err);

    if err.is_timeout() {
        return TransportError::Timeout(detail);
    }

    let lowered = detail.to_lowercase();
    if lowered.contains("dns error") || lowered.contains("failed to lookup address") {
        TransportError::Dns(detail)
    } else if lowered.contains("certificate") || lowered.contains("tls") {
        TransportError::Tls(detail)
    } else if err.is_connect() {
        TransportError::Connect(detail)
    } else {
        TransportError::Request(detail)
    }
}

fn error_chain(err: &reqwest::Error) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}
