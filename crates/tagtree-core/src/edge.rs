//! Canonical edge identity.
//!
//! An edge is not an owned entity: it exists only while at least one file
//! declares it. What we keep here is the key used to talk about it.

use crate::error::TagTreeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Separator between the two sides of the canonical form.
pub const ARROW: &str = "->";

/// A directed edge between two node names, written `from->to`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: String,
    pub to: String,
}

impl EdgeKey {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    /// Returns true if both ends name the same node.
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    /// The same edge pointing the other way.
    pub fn reversed(&self) -> Self {
        Self::new(self.to.clone(), self.from.clone())
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.from, ARROW, self.to)
    }
}

impl FromStr for EdgeKey {
    type Err = TagTreeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(ARROW)
            .ok_or_else(|| TagTreeError::MalformedEdge(s.to_string()))?;

        if from.is_empty() || to.is_empty() || to.contains(ARROW) {
            return Err(TagTreeError::MalformedEdge(s.to_string()));
        }

        Ok(Self::new(from, to))
    }
}
