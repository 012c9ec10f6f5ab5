/*!
 * Error types for nodectl
 *
 * Remote failures are data, not errors: a node that cannot be reached or
 * that answers with a failure status shows up as a `CallResult`. The
 * variants below cover caller mistakes, broken configuration and local I/O.
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, NodectlError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 1;
pub const EXIT_PARTIAL: i32 = 99;

#[derive(Debug)]
pub enum NodectlError {
    /// Configuration file missing or malformed
    Config(String),

    /// No configuration file found in any of the searched locations
    ConfigNotFound(Vec<PathBuf>),

    /// Node/cluster layout is inconsistent
    Topology(String),

    /// Node name not present in the topology
    UnknownNode(String),

    /// Cluster name not present in the topology
    UnknownCluster(String),

    /// Target slice expression could not be applied
    InvalidSlice(String),

    /// Remote operation name rejected before dispatch
    InvalidOperation(String),

    /// The same node was targeted twice in one batch
    DuplicateNode(String),

    /// Signal name not present in the signal table
    UnknownSignal(String),

    /// Command session already terminated; nothing was sent
    SessionTerminated { command_id: String },

    /// Remote refused to start a command
    CommandStart { node: String, status: u16 },

    /// Worker pool could not be created
    Dispatch(String),

    /// Transport could not be constructed
    Transport(TransportError),

    /// I/O error
    Io(io::Error),

    /// JSON encoding/decoding error
    Json(serde_json::Error),
}

impl NodectlError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            NodectlError::SessionTerminated { .. } | NodectlError::CommandStart { .. } => {
                EXIT_PARTIAL
            }
            _ => EXIT_FATAL,
        }
    }

    /// Check if this error was caused by invalid caller input
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            NodectlError::UnknownNode(_)
                | NodectlError::UnknownCluster(_)
                | NodectlError::InvalidSlice(_)
                | NodectlError::InvalidOperation(_)
                | NodectlError::DuplicateNode(_)
                | NodectlError::UnknownSignal(_)
        )
    }
}

impl fmt::Display for NodectlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodectlError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            NodectlError::ConfigNotFound(paths) => {
                write!(f, "No configuration file found; searched:")?;
                for path in paths {
                    write!(f, " {}", path.display())?;
                }
                Ok(())
            }
            NodectlError::Topology(msg) => {
                write!(f, "Topology error: {}", msg)
            }
            NodectlError::UnknownNode(name) => {
                write!(f, "Unknown node: {}", name)
            }
            NodectlError::UnknownCluster(name) => {
                write!(f, "Unknown cluster: {}", name)
            }
            NodectlError::InvalidSlice(msg) => {
                write!(f, "Invalid slice: {}", msg)
            }
            NodectlError::InvalidOperation(msg) => {
                write!(f, "Invalid operation: {}", msg)
            }
            NodectlError::DuplicateNode(name) => {
                write!(f, "Node targeted more than once: {}", name)
            }
            NodectlError::UnknownSignal(name) => {
                write!(f, "Unknown signal: {}", name)
            }
            NodectlError::SessionTerminated { command_id } => {
                write!(f, "Command {} has already terminated", command_id)
            }
            NodectlError::CommandStart { node, status } => {
                write!(f, "Failed to start command on {} (status {})", node, status)
            }
            NodectlError::Dispatch(msg) => {
                write!(f, "Dispatch error: {}", msg)
            }
            NodectlError::Transport(err) => {
                write!(f, "Transport error: {}", err)
            }
            NodectlError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            NodectlError::Json(err) => {
                write!(f, "JSON error: {}", err)
            }
        }
    }
}

impl std::error::Error for NodectlError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NodectlError::Io(err) => Some(err),
            NodectlError::Json(err) => Some(err),
            NodectlError::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for NodectlError {
    fn from(err: io::Error) -> Self {
        NodectlError::Io(err)
    }
}

impl From<serde_json::Error> for NodectlError {
    fn from(err: serde_json::Error) -> Self {
        NodectlError::Json(err)
    }
}

impl From<toml::de::Error> for NodectlError {
    fn from(err: toml::de::Error) -> Self {
        NodectlError::Config(err.to_string())
    }
}

impl From<TransportError> for NodectlError {
    fn from(err: TransportError) -> Self {
        NodectlError::Transport(err)
    }
}

impl From<nodectl_core_dispatch::DispatchError> for NodectlError {
    fn from(err: nodectl_core_dispatch::DispatchError) -> Self {
        NodectlError::Dispatch(err.to_string())
    }
}
