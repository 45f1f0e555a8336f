//! Node variants and file identity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// What a node in the graph stands for.
///
/// The discriminant is explicit so that the two variants can grow similar
/// fields without becoming ambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// A tag, or a plain graph node named inside an arrow annotation.
    Tag,

    /// A tracked file. `location` is what an editor reopens.
    File { location: PathBuf },
}

impl NodeKind {
    pub fn category(&self) -> NodeCategory {
        match self {
            Self::Tag => NodeCategory::Tag,
            Self::File { .. } => NodeCategory::File,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Self::File { .. })
    }

    pub fn location(&self) -> Option<&PathBuf> {
        match self {
            Self::File { location } => Some(location),
            Self::Tag => None,
        }
    }
}

/// Grouping used for root listings. Tags sort before files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeCategory {
    Tag,
    File,
}

impl fmt::Display for NodeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Tag => "tag",
            Self::File => "file",
        };
        write!(f, "{}", s)
    }
}

/// A file that declares edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceFile {
    /// Attribution key. Unique per file even when node names collide.
    pub key: String,

    /// Name of the file's node in the graph.
    pub node_name: String,

    /// Where the file lives on disk.
    pub location: PathBuf,
}

impl SourceFile {
    pub fn kind(&self) -> NodeKind {
        NodeKind::File {
            location: self.location.clone(),
        }
    }
}
