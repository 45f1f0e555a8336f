//! Tagtree Graph - The attributed tag/file index
//!
//! This crate owns the authoritative graph: which nodes exist, which edges
//! connect them, and which files are responsible for each edge. It answers
//! the tree and completion queries editors ask.
//!
//! # Architecture
//!
//! The graph uses petgraph internally with additional indexes for:
//! - Name-based lookups
//! - Prefix and substring search over names
//!
//! # Example
//!
//! ```
//! use tagtree_graph::{children, TagIndex};
//! use tagtree_core::{EdgeKey, Extractor};
//! use std::path::Path;
//!
//! let mut index = TagIndex::new();
//! let extraction = Extractor::default().extract(Path::new("src/foo.ts"), "#[alpha]");
//!
//! for edge in &extraction.edges {
//!     index.add_edge(edge, &extraction.file);
//! }
//!
//! assert!(index.has_edge(&EdgeKey::new("foo", "alpha")));
//! assert_eq!(children(&index, None).len(), 2);
//! ```

mod index;
mod search_index;
mod tree;

pub use index::{EdgeAttribution, EdgeRecord, IndexStats, Node, NodeId, TagIndex};
pub use search_index::SearchIndex;
pub use tree::{children, Relation, TreeItem};
