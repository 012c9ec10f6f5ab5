/*!
 * Node and cluster topology
 *
 * A `Topology` is built once from a `FleetConfig` and never mutated. Nodes
 * are shared as `Arc<Node>`; a node only remembers the *name* of its
 * cluster, which is all result ordering needs.
 */

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::config::FleetConfig;
use crate::error::{NodectlError, Result};
use crate::ordering::{natural_cmp, sort_nodes};

/// A single addressable remote endpoint
#[derive(Clone)]
pub struct Node {
    /// Unique name within the topology
    pub name: String,

    /// Name of the owning cluster (`""` when unclustered)
    pub cluster: String,

    /// Host name or address, optionally with port
    pub host: String,

    /// URL scheme (`https` or `http`)
    pub scheme: String,

    pub username: Option<String>,
    pub password: Option<String>,
}

impl Node {
    /// Create an unclustered HTTPS node without credentials
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cluster: String::new(),
            host: host.into(),
            scheme: "https".to_string(),
            username: None,
            password: None,
        }
    }

    pub fn with_cluster(mut self, cluster: impl Into<String>) -> Self {
        self.cluster = cluster.into();
        self
    }

    pub fn with_scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// `scheme://host`, without a trailing slash
    pub fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host.trim_end_matches('/'))
    }
}

// Identity is the name; two handles to the same node compare equal.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("cluster", &self.cluster)
            .field("host", &self.host)
            .field("scheme", &self.scheme)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Named, ordered collection of nodes
#[derive(Debug, Clone)]
pub struct Cluster {
    pub name: String,
    pub nodes: Vec<Arc<Node>>,
}

/// All configured nodes and clusters
#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: BTreeMap<String, Arc<Node>>,
    clusters: BTreeMap<String, Cluster>,
}

impl Topology {
    /// Build and validate a topology from configuration
    ///
    /// Fails if a cluster lists an unknown node or if a node is listed in
    /// more than one cluster.
    pub fn from_config(config: &FleetConfig) -> Result<Self> {
        let mut membership: BTreeMap<&str, &str> = BTreeMap::new();

        for (cluster_name, cluster) in &config.clusters {
            for member in cluster.members() {
                if !config.nodes.contains_key(member) {
                    return Err(NodectlError::Topology(format!(
                        "Cluster '{}' references nonexistent node '{}'",
                        cluster_name, member
                    )));
                }
                let previous = membership.insert(member.as_str(), cluster_name.as_str());
                if let Some(previous) = previous {
                    if previous != cluster_name.as_str() {
                        return Err(NodectlError::Topology(format!(
                            "Node '{}' is listed in both '{}' and '{}'",
                            member, previous, cluster_name
                        )));
                    }
                }
            }
        }

        let nodes: BTreeMap<String, Arc<Node>> = config
            .nodes
            .iter()
            .map(|(name, data)| {
                let node = Node {
                    name: name.clone(),
                    cluster: membership
                        .get(name.as_str())
                        .copied()
                        .unwrap_or_default()
                        .to_string(),
                    host: data.host.clone(),
                    scheme: data.scheme.clone(),
                    username: data.username.clone(),
                    password: data.password.clone(),
                };
                (name.clone(), Arc::new(node))
            })
            .collect();

        let clusters = config
            .clusters
            .iter()
            .map(|(name, data)| {
                let mut seen = HashSet::new();
                let members = data
                    .members()
                    .iter()
                    .filter(|member| seen.insert(member.as_str()))
                    .map(|member| nodes[member].clone())
                    .collect();
                (
                    name.clone(),
                    Cluster {
                        name: name.clone(),
                        nodes: members,
                    },
                )
            })
            .collect();

        Ok(Self { nodes, clusters })
    }

    pub fn node(&self, name: &str) -> Option<&Arc<Node>> {
        self.nodes.get(name)
    }

    pub fn cluster(&self, name: &str) -> Option<&Cluster> {
        self.clusters.get(name)
    }

    /// Every node, in (cluster, name) natural order
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        let mut nodes: Vec<Arc<Node>> = self.nodes.values().cloned().collect();
        sort_nodes(&mut nodes);
        nodes
    }

    /// Cluster names in natural order
    pub fn cluster_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clusters.keys().map(String::as_str).collect();
        names.sort_by(|a, b| natural_cmp(a, b));
        names
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Resolve command-line target filters into a node list
    ///
    /// - no nodes and no clusters: every node, sliced
    /// - clusters: each cluster's members, sliced per cluster
    /// - nodes: appended as-is, never sliced
    ///
    /// The result is de-duplicated and naturally ordered.
    pub fn select(
        &self,
        nodes: &[String],
        clusters: &[String],
        slice: Option<&str>,
    ) -> Result<Vec<Arc<Node>>> {
        let mut targets: Vec<Arc<Node>> = Vec::new();

        if nodes.is_empty() && clusters.is_empty() {
            targets.extend(apply_slice(&self.nodes(), slice)?);
        }

        for name in clusters {
            let cluster = self
                .clusters
                .get(name)
                .ok_or_else(|| NodectlError::UnknownCluster(name.clone()))?;
            targets.extend(apply_slice(&cluster.nodes, slice)?);
        }

        for name in nodes {
            let node = self
                .nodes
                .get(name)
                .ok_or_else(|| NodectlError::UnknownNode(name.clone()))?;
            targets.push(node.clone());
        }

        let mut seen = HashSet::new();
        targets.retain(|node| seen.insert(node.name.clone()));
        sort_nodes(&mut targets);

        Ok(targets)
    }
}

/// Apply a 1-based `start[:stop[:step]]` slice
///
/// A lone index selects exactly one item. With a colon, `start` is 1-based
/// and `stop` is inclusive, so `2:3` selects the second and third items.
pub fn apply_slice<T: Clone>(items: &[T], slice: Option<&str>) -> Result<Vec<T>> {
    let spec = match slice.map(str::trim) {
        Some(spec) if !spec.is_empty() => spec,
        _ => return Ok(items.to_vec()),
    };

    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() > 3 {
        return Err(NodectlError::InvalidSlice(spec.to_string()));
    }

    let parse = |part: &str| -> Result<Option<usize>> {
        let part = part.trim();
        if part.is_empty() {
            return Ok(None);
        }
        part.parse::<usize>()
            .map(Some)
            .map_err(|_| NodectlError::InvalidSlice(spec.to_string()))
    };

    let start = parse(parts[0])?;
    if start == Some(0) {
        return Err(NodectlError::InvalidSlice(format!(
            "{} (indices start at 1)",
            spec
        )));
    }

    if parts.len() == 1 {
        // Single index, checked above to be present and >= 1
        let index = start.unwrap_or(1) - 1;
        return items
            .get(index)
            .cloned()
            .map(|item| vec![item])
            .ok_or_else(|| {
                NodectlError::InvalidSlice(format!("{} (only {} targets)", spec, items.len()))
            });
    }

    let from = start.map(|s| s - 1).unwrap_or(0).min(items.len());
    let to = parse(parts[1])?.unwrap_or(items.len()).min(items.len());
    let step = match parts.get(2) {
        Some(&part) => parse(part)?.unwrap_or(1),
        None => 1,
    };
    if step == 0 {
        return Err(NodectlError::InvalidSlice(format!("{} (step cannot be 0)", spec)));
    }
    if from >= to {
        return Ok(Vec::new());
    }

    Ok(items[from..to].iter().step_by(step).cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ClusterConfig, NodeConfig};

    fn node_config(host: &str) -> NodeConfig {
        NodeConfig {
            host: host.to_string(),
            scheme: "https".to_string(),
            username: None,
            password: None,
        }
    }

    fn sample_config() -> FleetConfig {
        let mut config = FleetConfig::default();
        for name in ["mx1", "mx2", "mx10", "lb1", "solo"] {
            config
                .nodes
                .insert(name.to_string(), node_config(&format!("{}.example", name)));
        }
        config.clusters.insert(
            "mail".to_string(),
            ClusterConfig::Members(vec!["mx10".into(), "mx2".into(), "mx1".into()]),
        );
        config.clusters.insert(
            "edge".to_string(),
            ClusterConfig::Table {
                nodes: vec!["lb1".into()],
            },
        );
        config
    }

    fn names(nodes: &[Arc<Node>]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[test]
    fn test_from_config_assigns_clusters() {
        let topology = Topology::from_config(&sample_config()).unwrap();

        assert_eq!(topology.len(), 5);
        assert_eq!(topology.node("mx2").unwrap().cluster, "mail");
        assert_eq!(topology.node("solo").unwrap().cluster, "");
        assert_eq!(
            names(&topology.cluster("mail").unwrap().nodes),
            vec!["mx10", "mx2", "mx1"]
        );
        assert_eq!(topology.cluster_names(), vec!["edge", "mail"]);
    }

    #[test]
    fn test_nodes_are_naturally_ordered() {
        let topology = Topology::from_config(&sample_config()).unwrap();
        assert_eq!(
            names(&topology.nodes()),
            vec!["solo", "lb1", "mx1", "mx2", "mx10"]
        );
    }

    #[test]
    fn test_dangling_cluster_member() {
        let mut config = sample_config();
        config.clusters.insert(
            "broken".to_string(),
            ClusterConfig::Members(vec!["ghost".into()]),
        );

        let err = Topology::from_config(&config).unwrap_err();
        assert!(matches!(err, NodectlError::Topology(ref m) if m.contains("ghost")));
    }

    #[test]
    fn test_node_in_two_clusters() {
        let mut config = sample_config();
        config.clusters.insert(
            "other".to_string(),
            ClusterConfig::Members(vec!["mx1".into()]),
        );

        assert!(matches!(
            Topology::from_config(&config),
            Err(NodectlError::Topology(_))
        ));
    }

    #[test]
    fn test_select_everything() {
        let topology = Topology::from_config(&sample_config()).unwrap();
        let targets = topology.select(&[], &[], None).unwrap();
        assert_eq!(targets.len(), 5);
    }

    #[test]
    fn test_select_cluster_with_slice() {
        let topology = Topology::from_config(&sample_config()).unwrap();

        // Slices apply to declaration order, output is sorted
        let targets = topology.select(&[], &["mail".into()], Some("1:2")).unwrap();
        assert_eq!(names(&targets), vec!["mx2", "mx10"]);
    }

    #[test]
    fn test_select_nodes_and_clusters_dedup() {
        let topology = Topology::from_config(&sample_config()).unwrap();
        let targets = topology
            .select(&["mx1".into(), "solo".into()], &["mail".into()], None)
            .unwrap();
        assert_eq!(names(&targets), vec!["solo", "mx1", "mx2", "mx10"]);
    }

    #[test]
    fn test_select_unknown_names() {
        let topology = Topology::from_config(&sample_config()).unwrap();
        assert!(matches!(
            topology.select(&["nope".into()], &[], None),
            Err(NodectlError::UnknownNode(_))
        ));
        assert!(matches!(
            topology.select(&[], &["nope".into()], None),
            Err(NodectlError::UnknownCluster(_))
        ));
    }

    #[test]
    fn test_apply_slice_forms() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(apply_slice(&items, None).unwrap(), items);
        assert_eq!(apply_slice(&items, Some("")).unwrap(), items);
        assert_eq!(apply_slice(&items, Some("2")).unwrap(), vec![2]);
        assert_eq!(apply_slice(&items, Some("2:4")).unwrap(), vec![2, 3, 4]);
        assert_eq!(apply_slice(&items, Some(":2")).unwrap(), vec![1, 2]);
        assert_eq!(apply_slice(&items, Some("4:")).unwrap(), vec![4, 5]);
        assert_eq!(apply_slice(&items, Some("::2")).unwrap(), vec![1, 3, 5]);
        assert_eq!(apply_slice(&items, Some("3:99")).unwrap(), vec![3, 4, 5]);
        assert!(apply_slice(&items, Some("4:2")).unwrap().is_empty());
    }

    #[test]
    fn test_apply_slice_errors() {
        let items = vec![1, 2, 3];
        assert!(apply_slice(&items, Some("0")).is_err());
        assert!(apply_slice(&items, Some("7")).is_err());
        assert!(apply_slice(&items, Some("a:b")).is_err());
        assert!(apply_slice(&items, Some("1:2:0")).is_err());
        assert!(apply_slice(&items, Some("1:2:3:4")).is_err());
    }

    #[test]
    fn test_node_identity_and_debug() {
        let a = Node::new("mx1", "a").with_credentials("admin", "hunter2");
        let b = Node::new("mx1", "b");
        assert_eq!(a, b);
        assert_eq!(a.base_url(), "https://a");

        let debug = format!("{:?}", a);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }
}
