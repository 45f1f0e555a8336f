//! The attributed node graph.
//!
//! `TagIndex` wraps a petgraph `StableDiGraph` and adds a name index. Each
//! edge weight carries the set of files currently declaring that edge, so
//! "the edge exists" and "someone declares it" cannot drift apart: the edge
//! is removed in the same step that empties its attribution.
//!
//! Nodes are created lazily when an edge first names them and pruned as
//! soon as their last edge goes away.

use crate::search_index::SearchIndex;
use petgraph::stable_graph::{EdgeIndex, NodeIndex, StableDiGraph};
use petgraph::Direction;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use tagtree_core::{EdgeKey, NodeCategory, NodeKind, SourceFile};
use tracing::debug;

/// Unique identifier for a node in the graph.
///
/// Only stable while the node exists; a pruned node's id may be reused.
pub type NodeId = NodeIndex;

/// Node weight stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeRecord {
    name: String,
    kind: NodeKind,
    starred: bool,
}

/// Who keeps an edge alive.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeAttribution {
    /// Attribution keys of the files declaring the edge.
    pub declared_by: BTreeSet<String>,

    /// Set by a manual merge (drag and drop). Manual edges have no owning
    /// file and survive until unlinked explicitly.
    pub manual: bool,
}

impl EdgeAttribution {
    fn is_live(&self) -> bool {
        self.manual || !self.declared_by.is_empty()
    }
}

/// A read-only snapshot of one node and its neighbours.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    pub starred: bool,
    /// Names of nodes with an edge into this one, sorted.
    pub inbound: Vec<String>,
    /// Names of nodes this one points to, sorted.
    pub outbound: Vec<String>,
}

impl Node {
    pub fn category(&self) -> NodeCategory {
        self.kind.category()
    }
}

/// An edge with its attribution, for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeRecord {
    pub from: String,
    pub to: String,
    pub declared_by: Vec<String>,
    pub manual: bool,
}

impl EdgeRecord {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.to.clone())
    }
}

/// Index statistics for status output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub nodes: usize,
    pub tags: usize,
    pub files: usize,
    pub edges: usize,
    pub manual_edges: usize,
}

/// The tag/file graph.
#[derive(Debug, Default)]
pub struct TagIndex {
    graph: StableDiGraph<NodeRecord, EdgeAttribution>,

    /// Maps node names to graph indexes.
    name_index: HashMap<String, NodeId>,

    /// Completion and search over node names.
    search: SearchIndex,
}

impl TagIndex {
    /// Creates a new empty index.
    pub fn new() -> Self {
        Self::default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the node called `name`, creating it with `kind` if needed.
    ///
    /// A file kind replaces whatever kind an existing node had; a tag kind
    /// never turns a file back into a tag.
    pub fn upsert_node(&mut self, name: &str, kind: NodeKind) -> Node {
        let id = self.ensure_node(name, kind);
        self.snapshot(id)
    }

    fn ensure_node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        if let Some(&id) = self.name_index.get(name) {
            if let Some(record) = self.graph.node_weight_mut(id) {
                if kind.is_file() && record.kind != kind {
                    debug!(
                        "Node {:?} was {:?}, now claimed as {:?}",
                        name, record.kind, kind
                    );
                    record.kind = kind;
                }
            }
            return id;
        }

        let id = self.graph.add_node(NodeRecord {
            name: name.to_string(),
            kind,
            starred: false,
        });
        self.name_index.insert(name.to_string(), id);
        self.search.insert(name, id);
        id
    }

    /// Records `source` as a declarer of `edge`.
    ///
    /// Returns true if this materialized the edge. A repeat declaration,
    /// by the same or another file, only extends the attribution set.
    pub fn add_edge(&mut self, edge: &EdgeKey, source: &SourceFile) -> bool {
        let from = self.ensure_node(&edge.from, endpoint_kind(&edge.from, source));
        let to = self.ensure_node(&edge.to, endpoint_kind(&edge.to, source));

        if let Some(existing) = self.graph.find_edge(from, to) {
            if let Some(attribution) = self.graph.edge_weight_mut(existing) {
                attribution.declared_by.insert(source.key.clone());
            }
            return false;
        }

        let mut attribution = EdgeAttribution::default();
        attribution.declared_by.insert(source.key.clone());
        self.graph.add_edge(from, to, attribution);
        true
    }

    /// Withdraws the declaration of `edge` by the file with attribution key
    /// `file_key`.
    ///
    /// Returns true if the edge disappeared from the graph. Unknown edges
    /// and unknown declarers are a no-op.
    pub fn remove_edge(&mut self, edge: &EdgeKey, file_key: &str) -> bool {
        let (from, to, index) = match self.find_edge(edge) {
            Some(found) => found,
            None => {
                debug!("Ignoring removal of unknown edge {}", edge);
                return false;
            }
        };

        let live = match self.graph.edge_weight_mut(index) {
            Some(attribution) => {
                attribution.declared_by.remove(file_key);
                attribution.is_live()
            }
            None => return false,
        };

        if live {
            return false;
        }

        self.graph.remove_edge(index);
        self.prune_id(from);
        self.prune_id(to);
        true
    }

    /// Removes `name` if nothing points to or from it any more.
    ///
    /// Returns true if the node was removed.
    pub fn prune_node(&mut self, name: &str) -> bool {
        match self.name_index.get(name) {
            Some(&id) => self.prune_id(id),
            None => false,
        }
    }

    fn prune_id(&mut self, id: NodeId) -> bool {
        if self.degree(id) > 0 {
            return false;
        }

        match self.graph.remove_node(id) {
            Some(record) => {
                self.name_index.remove(&record.name);
                self.search.remove(id);
                debug!("Pruned node {:?}", record.name);
                true
            }
            None => false,
        }
    }

    /// Gives up the file claim `location` holds on node `name`.
    ///
    /// The node falls back to `successor` (another file with the same node
    /// name), or to a tag when no file claims it any more. Nothing happens
    /// if the node is gone or is claimed by a different file. Returns true
    /// if the kind changed.
    pub fn release_file(
        &mut self,
        name: &str,
        location: &Path,
        successor: Option<NodeKind>,
    ) -> bool {
        let id = match self.name_index.get(name) {
            Some(&id) => id,
            None => return false,
        };
        let record = match self.graph.node_weight_mut(id) {
            Some(record) => record,
            None => return false,
        };
        if record.kind.location().map(PathBuf::as_path) != Some(location) {
            return false;
        }

        let kind = successor.unwrap_or(NodeKind::Tag);
        debug!("Node {:?} released by {}, now {:?}", name, location.display(), kind);
        record.kind = kind;
        true
    }

    /// Merges `dropped` into the inbound set of `target` as manual edges.
    ///
    /// Names that do not exist, and the target itself, are skipped. Returns
    /// the number of names that were not already inbound to `target`.
    pub fn link_manual(&mut self, dropped: &[String], target: &str) -> usize {
        let to = match self.name_index.get(target) {
            Some(&id) => id,
            None => {
                debug!("Drop target {:?} is not in the graph", target);
                return 0;
            }
        };

        let mut merged = 0;
        for name in dropped {
            let from = match self.name_index.get(name.as_str()) {
                Some(&id) if id != to => id,
                _ => continue,
            };

            match self.graph.find_edge(from, to) {
                Some(existing) => {
                    if let Some(attribution) = self.graph.edge_weight_mut(existing) {
                        attribution.manual = true;
                    }
                }
                None => {
                    self.graph.add_edge(
                        from,
                        to,
                        EdgeAttribution {
                            declared_by: BTreeSet::new(),
                            manual: true,
                        },
                    );
                    merged += 1;
                }
            }
        }

        merged
    }

    /// Clears the manual flag on `edge`, removing it if no file declares it.
    ///
    /// Returns true if the edge disappeared from the graph.
    pub fn unlink_manual(&mut self, edge: &EdgeKey) -> bool {
        let (from, to, index) = match self.find_edge(edge) {
            Some(found) => found,
            None => return false,
        };

        let live = match self.graph.edge_weight_mut(index) {
            Some(attribution) => {
                attribution.manual = false;
                attribution.is_live()
            }
            None => return false,
        };

        if live {
            return false;
        }

        self.graph.remove_edge(index);
        self.prune_id(from);
        self.prune_id(to);
        true
    }

    /// Marks a node as starred. Returns false if there is no such node.
    pub fn set_starred(&mut self, name: &str, starred: bool) -> bool {
        let id = match self.name_index.get(name) {
            Some(&id) => id,
            None => return false,
        };

        match self.graph.node_weight_mut(id) {
            Some(record) => {
                record.starred = starred;
                true
            }
            None => false,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Gets a node by name.
    pub fn node(&self, name: &str) -> Option<Node> {
        let id = self.name_index.get(name)?;
        self.graph.node_weight(*id)?;
        Some(self.snapshot(*id))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_index.contains_key(name)
    }

    /// Every node, in no particular order.
    pub fn nodes(&self) -> Vec<Node> {
        self.graph
            .node_indices()
            .map(|id| self.snapshot(id))
            .collect()
    }

    /// Every tag node, in no particular order.
    pub fn tags(&self) -> Vec<Node> {
        self.graph
            .node_indices()
            .filter(|id| {
                self.graph
                    .node_weight(*id)
                    .map(|record| !record.kind.is_file())
                    .unwrap_or(false)
            })
            .map(|id| self.snapshot(id))
            .collect()
    }

    /// Nodes whose name starts with `prefix`, for completion.
    pub fn suggest(&self, prefix: &str, limit: usize) -> Vec<Node> {
        self.search
            .prefix(prefix)
            .into_iter()
            .filter(|id| self.graph.contains_node(*id))
            .take(limit)
            .map(|id| self.snapshot(id))
            .collect()
    }

    /// Nodes whose name contains `query`, sorted by name.
    pub fn search(&self, query: &str) -> Vec<Node> {
        let mut nodes: Vec<Node> = self
            .search
            .search(query)
            .into_iter()
            .filter(|id| self.graph.contains_node(*id))
            .map(|id| self.snapshot(id))
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));
        nodes
    }

    /// Files currently declaring `edge`, if the edge exists.
    pub fn declarers(&self, edge: &EdgeKey) -> Option<&BTreeSet<String>> {
        let (_, _, index) = self.find_edge(edge)?;
        self.graph
            .edge_weight(index)
            .map(|attribution| &attribution.declared_by)
    }

    pub fn has_edge(&self, edge: &EdgeKey) -> bool {
        self.find_edge(edge).is_some()
    }

    /// Every edge with its attribution, sorted by `from` then `to`.
    pub fn edges(&self) -> Vec<EdgeRecord> {
        let mut edges: Vec<EdgeRecord> = self
            .graph
            .edge_indices()
            .filter_map(|index| {
                let (from, to) = self.graph.edge_endpoints(index)?;
                let attribution = self.graph.edge_weight(index)?;
                Some(EdgeRecord {
                    from: self.graph.node_weight(from)?.name.clone(),
                    to: self.graph.node_weight(to)?.name.clone(),
                    declared_by: attribution.declared_by.iter().cloned().collect(),
                    manual: attribution.manual,
                })
            })
            .collect();
        edges.sort_by(|a, b| (&a.from, &a.to).cmp(&(&b.from, &b.to)));
        edges
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn stats(&self) -> IndexStats {
        let files = self
            .graph
            .node_indices()
            .filter_map(|id| self.graph.node_weight(id))
            .filter(|record| record.kind.is_file())
            .count();
        let manual_edges = self
            .graph
            .edge_indices()
            .filter_map(|index| self.graph.edge_weight(index))
            .filter(|attribution| attribution.manual)
            .count();

        IndexStats {
            nodes: self.graph.node_count(),
            tags: self.graph.node_count() - files,
            files,
            edges: self.graph.edge_count(),
            manual_edges,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    fn find_edge(&self, edge: &EdgeKey) -> Option<(NodeId, NodeId, EdgeIndex)> {
        let from = *self.name_index.get(&edge.from)?;
        let to = *self.name_index.get(&edge.to)?;
        let index = self.graph.find_edge(from, to)?;
        Some((from, to, index))
    }

    fn degree(&self, id: NodeId) -> usize {
        self.graph
            .neighbors_directed(id, Direction::Incoming)
            .count()
            + self
                .graph
                .neighbors_directed(id, Direction::Outgoing)
                .count()
    }

    fn neighbour_names(&self, id: NodeId, direction: Direction) -> Vec<String> {
        let names: BTreeSet<String> = self
            .graph
            .neighbors_directed(id, direction)
            .filter_map(|n| self.graph.node_weight(n))
            .map(|record| record.name.clone())
            .collect();
        names.into_iter().collect()
    }

    /// Builds the public view of a node. Callers check that `id` exists.
    fn snapshot(&self, id: NodeId) -> Node {
        let (name, kind, starred) = match self.graph.node_weight(id) {
            Some(record) => (record.name.clone(), record.kind.clone(), record.starred),
            None => (String::new(), NodeKind::Tag, false),
        };

        Node {
            name,
            kind,
            starred,
            inbound: self.neighbour_names(id, Direction::Incoming),
            outbound: self.neighbour_names(id, Direction::Outgoing),
        }
    }
}

/// The declaring file's own node is a file; every other endpoint is a tag.
fn endpoint_kind(name: &str, source: &SourceFile) -> NodeKind {
    if name == source.node_name {
        source.kind()
    } else {
        NodeKind::Tag
    }
}
