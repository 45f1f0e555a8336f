//! Tree-shaped views of the graph.
//!
//! An editor tree shows the graph one level at a time: the root level lists
//! every node, and expanding a node lists its neighbours grouped by which
//! way the edges run.

use crate::index::{Node, TagIndex};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// How a listed node relates to the node that was expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Relation {
    /// Listed at the top level.
    Root,
    /// Edges run both ways.
    Both,
    /// Only points into the expanded node.
    Inbound,
    /// Only pointed to by the expanded node.
    Outbound,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Root => "root",
            Relation::Both => "both",
            Relation::Inbound => "inbound",
            Relation::Outbound => "outbound",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One row of a tree listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeItem {
    pub node: Node,
    pub relation: Relation,
}

/// Lists the children of `parent`, or the top level when `parent` is None.
///
/// The top level holds tags first, then files, each sorted by name. A
/// node's children are its neighbours, each listed once: those linked both
/// ways, then inbound-only, then outbound-only, each group sorted by name.
/// An unknown parent has no children.
pub fn children(index: &TagIndex, parent: Option<&str>) -> Vec<TreeItem> {
    match parent {
        None => roots(index),
        Some(name) => match index.node(name) {
            Some(node) => neighbours(index, &node),
            None => Vec::new(),
        },
    }
}

fn roots(index: &TagIndex) -> Vec<TreeItem> {
    let mut nodes = index.nodes();
    nodes.sort_by(|a, b| {
        a.category()
            .cmp(&b.category())
            .then_with(|| a.name.cmp(&b.name))
    });

    nodes
        .into_iter()
        .map(|node| TreeItem {
            node,
            relation: Relation::Root,
        })
        .collect()
}

fn neighbours(index: &TagIndex, node: &Node) -> Vec<TreeItem> {
    let inbound: BTreeSet<&String> = node.inbound.iter().collect();
    let outbound: BTreeSet<&String> = node.outbound.iter().collect();

    let both = inbound.intersection(&outbound).map(|n| (*n, Relation::Both));
    let inbound_only = inbound
        .difference(&outbound)
        .map(|n| (*n, Relation::Inbound));
    let outbound_only = outbound
        .difference(&inbound)
        .map(|n| (*n, Relation::Outbound));

    both.chain(inbound_only)
        .chain(outbound_only)
        .filter_map(|(name, relation)| {
            index.node(name).map(|node| TreeItem { node, relation })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tagtree_core::{EdgeKey, SourceFile};

    fn file(name: &str) -> SourceFile {
        SourceFile {
            key: format!("src/{}.ts", name),
            node_name: name.to_string(),
            location: PathBuf::from(format!("src/{}.ts", name)),
        }
    }

    fn rows(items: &[TreeItem]) -> Vec<(String, Relation)> {
        items
            .iter()
            .map(|item| (item.node.name.clone(), item.relation))
            .collect()
    }

    #[test]
    fn test_roots_tags_before_files() {
        let mut index = TagIndex::new();
        index.add_edge(&EdgeKey::new("zeta", "beta"), &file("zeta"));
        index.add_edge(&EdgeKey::new("alpha", "gamma"), &file("alpha"));

        let items = children(&index, None);

        assert_eq!(
            rows(&items),
            vec![
                ("beta".to_string(), Relation::Root),
                ("gamma".to_string(), Relation::Root),
                ("alpha".to_string(), Relation::Root),
                ("zeta".to_string(), Relation::Root),
            ]
        );
    }

    #[test]
    fn test_children_grouped_by_direction() {
        let mut index = TagIndex::new();
        let f = file("f");
        // f <-> c, a -> f, f -> d, f -> b, e -> f
        for (from, to) in [("f", "c"), ("c", "f"), ("a", "f"), ("f", "d"), ("f", "b"), ("e", "f")] {
            index.add_edge(&EdgeKey::new(from, to), &f);
        }

        let items = children(&index, Some("f"));

        assert_eq!(
            rows(&items),
            vec![
                ("c".to_string(), Relation::Both),
                ("a".to_string(), Relation::Inbound),
                ("e".to_string(), Relation::Inbound),
                ("b".to_string(), Relation::Outbound),
                ("d".to_string(), Relation::Outbound),
            ]
        );
    }

    #[test]
    fn test_unknown_parent_has_no_children() {
        let index = TagIndex::new();
        assert!(children(&index, Some("ghost")).is_empty());
        assert!(children(&index, None).is_empty());
    }
}
