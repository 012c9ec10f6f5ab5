//! Multi-node fan-out
//!
//! `NodeListProxy` sends the same named operation to every node in its list
//! through a shared [`WorkerPool`] and hands back exactly one [`CallResult`]
//! per node, ordered by cluster then node name.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use nodectl_core_dispatch::WorkerPool;

use crate::error::{NodectlError, Result};
use crate::node::Node;
use crate::ordering::sort_by_node;
use crate::proxy::{CallResult, NodeProxy};
use crate::transport::{CallArgs, Transport};

/// Reject operation names that cannot be a remote method
pub fn validate_operation(operation: &str) -> Result<()> {
    if operation.is_empty() {
        return Err(NodectlError::InvalidOperation(
            "operation name is empty".to_string(),
        ));
    }

    if let Some(bad) = operation
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')))
    {
        return Err(NodectlError::InvalidOperation(format!(
            "'{}' contains invalid character {:?}",
            operation, bad
        )));
    }

    Ok(())
}

/// Ordered per-node outcome of one fan-out call
#[derive(Debug, Clone, Default)]
pub struct NodeResults {
    entries: Vec<(Arc<Node>, CallResult)>,
}

impl NodeResults {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Arc<Node>, CallResult)> {
        self.entries.iter()
    }

    pub fn get(&self, name: &str) -> Option<&CallResult> {
        self.entries
            .iter()
            .find(|(node, _)| node.name == name)
            .map(|(_, result)| result)
    }

    /// True when at least one node did not answer with success
    pub fn is_partial(&self) -> bool {
        self.entries.iter().any(|(_, result)| !result.is_success())
    }

    /// Nodes whose call did not succeed
    pub fn failed(&self) -> Vec<&Arc<Node>> {
        self.entries
            .iter()
            .filter(|(_, result)| !result.is_success())
            .map(|(node, _)| node)
            .collect()
    }
}

impl From<HashMap<Arc<Node>, CallResult>> for NodeResults {
    fn from(results: HashMap<Arc<Node>, CallResult>) -> Self {
        Self {
            entries: sort_by_node(results),
        }
    }
}

impl IntoIterator for NodeResults {
    type Item = (Arc<Node>, CallResult);
    type IntoIter = std::vec::IntoIter<(Arc<Node>, CallResult)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Proxy over a list of nodes sharing one transport and one pool
#[derive(Clone)]
pub struct NodeListProxy {
    nodes: Vec<Arc<Node>>,
    transport: Arc<dyn Transport>,
    pool: Arc<WorkerPool>,
}

impl NodeListProxy {
    pub fn new(nodes: Vec<Arc<Node>>, transport: Arc<dyn Transport>, pool: Arc<WorkerPool>) -> Self {
        Self {
            nodes,
            transport,
            pool,
        }
    }

    pub fn nodes(&self) -> &[Arc<Node>] {
        &self.nodes
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Single-node proxy for one member of the list
    pub fn proxy(&self, node: &Arc<Node>) -> NodeProxy {
        NodeProxy::new(node.clone(), self.transport.clone())
    }

    /// Call `operation` on every node concurrently and wait for all of them
    ///
    /// Errors only on caller mistakes, detected before anything is sent.
    /// Per-node failures are reported inside the returned results.
    pub fn call_all(&self, operation: &str, args: &CallArgs) -> Result<NodeResults> {
        validate_operation(operation)?;

        let mut seen = HashSet::new();
        if let Some(dup) = self.nodes.iter().find(|node| !seen.insert(node.name.as_str())) {
            return Err(NodectlError::DuplicateNode(dup.name.clone()));
        }

        let started = Instant::now();
        let batch = self.nodes.iter().map(|node| {
            let proxy = self.proxy(node);
            (node.clone(), move || proxy.call(operation, args))
        });
        let results: HashMap<Arc<Node>, CallResult> = self.pool.dispatch_with(batch);
        let results = NodeResults::from(results);

        debug!(
            "Called {} on {} nodes in {:?}",
            operation,
            results.len(),
            started.elapsed()
        );
        if results.is_partial() {
            info!(
                "{} of {} nodes did not succeed for {}",
                results.failed().len(),
                results.len(),
                operation
            );
        }

        Ok(results)
    }
}

impl std::fmt::Debug for NodeListProxy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeListProxy")
            .field("nodes", &self.nodes.len())
            .field("pool", &self.pool)
            .finish()
    }
}
