/*!
 * nodectl - fleet RPC control
 *
 * Calls named remote operations on a fleet of nodes and drives remote
 * commands:
 * - Single-node calls normalized to `(status, payload)`
 * - Concurrent fan-out over a bounded, shared worker pool
 * - Interactive remote command sessions (poll, push, signal, stop)
 * - Natural ordering of per-node results
 * - Lenient base64 for command I/O
 */

pub mod cli_style;
pub mod codec;
pub mod config;
pub mod error;
pub mod fanout;
pub mod logging;
pub mod node;
pub mod ordering;
pub mod output;
pub mod proxy;
pub mod session;
pub mod signal;
pub mod transport;

// Re-export commonly used types
pub use config::FleetConfig;
pub use error::{NodectlError, Result};
pub use fanout::{NodeListProxy, NodeResults};
pub use node::{Node, Topology};
pub use nodectl_core_dispatch::WorkerPool;
pub use proxy::{CallResult, NodeProxy};
pub use session::{CommandSession, Poll};
pub use transport::{CallArgs, HttpTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
