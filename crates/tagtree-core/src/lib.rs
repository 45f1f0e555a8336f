//! Tagtree Core - Annotation extraction and shared types
//!
//! This crate turns the raw text of a file into the set of edges it
//! declares. It knows nothing about the index or the file system beyond
//! the path it is handed; everything here is pure.
//!
//! Two annotation grammars are supported, one per deployment:
//!
//! - **Tag form**: `#[alpha]` declares an edge from the file to the tag `alpha`.
//! - **Arrow form**: `[a->b]`, `[->b]`, `[a->]` and `[a->mid->c]` declare
//!   directed edges between named nodes, with empty sides standing in for
//!   the file itself.
//!
//! # Example
//!
//! ```
//! use tagtree_core::{Extractor, FileNaming, Grammar};
//! use std::path::Path;
//!
//! let extractor = Extractor::new(Grammar::Tag, FileNaming::Stem);
//! let extraction = extractor.extract(Path::new("src/foo.ts"), "// #[alpha] #[beta]");
//!
//! assert_eq!(extraction.file.node_name, "foo");
//! assert_eq!(extraction.edges.len(), 2);
//! ```

pub mod config;
mod edge;
mod error;
mod extract;
mod node;

pub use config::{TagTreeConfig, CONFIG_DIR, CONFIG_FILE};
pub use edge::EdgeKey;
pub use error::{Result, TagTreeError};
pub use extract::{Extraction, Extractor, FileNaming, Grammar};
pub use node::{NodeCategory, NodeKind, SourceFile};
