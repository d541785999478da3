use std::collections::{HashMap, HashSet};

use petgraph::{
    stable_graph::{EdgeIndex, NodeIndex, StableGraph},
    visit::{EdgeRef, IntoEdgeReferences},
};
use serde::{Deserialize, Serialize};

use crate::{
    input::{GraphInput, RawLink, RawNode},
    Error, Link, Node, NodeKind,
};

type StableGraphType = StableGraph<Node, Link>;

/// Validated, immutable flow graph.
///
/// Built once per collaborator response with [`Graph::build`] and replaced wholesale when new
/// input arrives. Node indices are dense: the `n`-th declared node has index `n`.
///
/// Deserialization re-checks the stored data: the id index must match the nodes and every
/// link must agree with the edge it is stored on.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "StoredGraph")]
pub struct Graph {
    g: StableGraphType,
    by_id: HashMap<String, NodeIndex>,
}

#[derive(Deserialize)]
struct StoredGraph {
    g: StableGraphType,
    by_id: HashMap<String, NodeIndex>,
}

impl TryFrom<StoredGraph> for Graph {
    type Error = Error;

    fn try_from(stored: StoredGraph) -> Result<Self, Self::Error> {
        let StoredGraph { g, by_id } = stored;

        let mut seen = HashSet::with_capacity(g.node_count());
        for idx in g.node_indices() {
            let id = g[idx].id();
            if !seen.insert(id) {
                return Err(Error::DuplicateNodeId(id.to_owned()));
            }
            if by_id.get(id) != Some(&idx) {
                return Err(Error::MalformedInput(format!(
                    "stored id index does not point node '{id}' at {}",
                    idx.index()
                )));
            }
        }
        if by_id.len() != g.node_count() {
            return Err(Error::MalformedInput(format!(
                "stored id index has {} entries for {} nodes",
                by_id.len(),
                g.node_count()
            )));
        }

        for e in g.edge_references() {
            let link = e.weight();
            if link.source() != e.source() || link.target() != e.target() {
                return Err(Error::MalformedInput(format!(
                    "stored link {} does not match its endpoints",
                    e.id().index()
                )));
            }
        }

        Ok(Self { g, by_id })
    }
}

impl Graph {
    /// Validates raw collaborator data and builds the graph.
    ///
    /// Checks run in a fixed order: every link endpoint must name a declared node, then node
    /// ids must be unique. Unknown node types are not an error; they are drawn as
    /// [`NodeKind::Process`].
    pub fn build(nodes: Vec<RawNode>, links: Vec<RawLink>) -> Result<Self, Error> {
        let declared: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        for l in &links {
            for endpoint in [&l.source, &l.target] {
                if !declared.contains(endpoint.as_str()) {
                    return Err(Error::DanglingLink {
                        source_id: l.source.clone(),
                        target_id: l.target.clone(),
                        missing: endpoint.clone(),
                    });
                }
            }
        }

        let mut seen = HashSet::with_capacity(nodes.len());
        for n in &nodes {
            if !seen.insert(n.id.as_str()) {
                return Err(Error::DuplicateNodeId(n.id.clone()));
            }
        }

        let mut g = StableGraphType::with_capacity(nodes.len(), links.len());
        let mut by_id = HashMap::with_capacity(nodes.len());
        for raw in nodes {
            let kind = NodeKind::normalize(raw.kind.as_deref());
            let label = match raw.label {
                Some(label) if !label.trim().is_empty() => label,
                _ => raw.id.clone(),
            };
            let idx = g.add_node(Node::new(raw.id.clone(), label, kind).with_important(raw.important));
            by_id.insert(raw.id, idx);
        }

        let mut parallel: HashMap<(NodeIndex, NodeIndex), usize> = HashMap::new();
        for raw in links {
            let source = by_id[&raw.source];
            let target = by_id[&raw.target];
            let order = parallel.entry((source, target)).or_default();
            g.add_edge(source, target, Link::new(source, target, raw.label, *order));
            *order += 1;
        }

        log::debug!(
            "built graph with {} nodes and {} links",
            g.node_count(),
            g.edge_count()
        );

        Ok(Self { g, by_id })
    }

    pub fn from_input(input: GraphInput) -> Result<Self, Error> {
        Self::build(input.nodes, input.links)
    }

    /// Decodes and validates `{ "nodes": [...], "links": [...] }`.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Self::from_input(GraphInput::from_json(json)?)
    }

    pub fn g(&self) -> &StableGraphType {
        &self.g
    }

    pub fn node_count(&self) -> usize {
        self.g.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.g.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.g.node_count() == 0
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.g.node_weight(idx)
    }

    pub fn link(&self, idx: EdgeIndex) -> Option<&Link> {
        self.g.edge_weight(idx)
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    pub fn node_by_id(&self, id: &str) -> Option<&Node> {
        self.index_of(id).and_then(|idx| self.node(idx))
    }

    pub fn nodes(&self) -> impl Iterator<Item = (NodeIndex, &Node)> {
        self.g
            .node_indices()
            .filter_map(move |idx| self.g.node_weight(idx).map(|n| (idx, n)))
    }

    pub fn links(&self) -> impl Iterator<Item = (EdgeIndex, &Link)> {
        self.g.edge_references().map(|e| (e.id(), e.weight()))
    }

    pub fn neighbors_undirected(&self, idx: NodeIndex) -> impl Iterator<Item = NodeIndex> + '_ {
        self.g.neighbors_undirected(idx)
    }
}
