//! Name index for completion and search.
//!
//! Completion asks "which names start with what the user typed"; search asks
//! "which names contain it". Both are answered from an n-gram inverted index
//! kept in step with node creation and pruning, so neither has to walk the
//! whole graph on every keystroke.

use crate::index::NodeId;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Minimum n-gram length for indexing.
const MIN_NGRAM_LEN: usize = 2;

/// Maximum n-gram length for indexing.
const MAX_NGRAM_LEN: usize = 4;

#[derive(Debug, Default, Clone)]
pub struct SearchIndex {
    /// Lowercased names in order, for prefix range scans.
    by_name: BTreeMap<String, HashSet<NodeId>>,
    /// Lowercased name of every indexed node.
    names: HashMap<NodeId, String>,
    /// Lowercased n-grams to nodes, for substring search.
    ngram_index: HashMap<String, HashSet<NodeId>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `name` for `id`, replacing whatever `id` was indexed under.
    pub fn insert(&mut self, name: &str, id: NodeId) {
        self.remove(id);

        let lower = name.to_lowercase();
        self.by_name.entry(lower.clone()).or_default().insert(id);
        for ngram in generate_ngrams(&lower) {
            self.ngram_index.entry(ngram).or_default().insert(id);
        }
        self.names.insert(id, lower);
    }

    /// Forgets `id`. Unknown ids are ignored.
    pub fn remove(&mut self, id: NodeId) {
        let lower = match self.names.remove(&id) {
            Some(lower) => lower,
            None => return,
        };

        if let Some(ids) = self.by_name.get_mut(&lower) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_name.remove(&lower);
            }
        }

        for ngram in generate_ngrams(&lower) {
            if let Some(ids) = self.ngram_index.get_mut(&ngram) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.ngram_index.remove(&ngram);
                }
            }
        }
    }

    /// Nodes whose name starts with `prefix`, case-insensitively, in name order.
    pub fn prefix(&self, prefix: &str) -> Vec<NodeId> {
        let lower = prefix.to_lowercase();

        self.by_name
            .range(lower.clone()..)
            .take_while(|(name, _)| name.starts_with(&lower))
            .flat_map(|(_, ids)| {
                let mut ids: Vec<NodeId> = ids.iter().copied().collect();
                ids.sort();
                ids
            })
            .collect()
    }

    /// Nodes whose name contains `query`, case-insensitively.
    ///
    /// Returns matching ids sorted for deterministic output.
    pub fn search(&self, query: &str) -> Vec<NodeId> {
        let lower = query.to_lowercase();

        if lower.chars().count() < MIN_NGRAM_LEN {
            let mut results: Vec<NodeId> = self
                .names
                .iter()
                .filter(|(_, name)| name.contains(&lower))
                .map(|(id, _)| *id)
                .collect();
            results.sort();
            return results;
        }

        let mut candidates: Option<HashSet<NodeId>> = None;
        for ngram in generate_ngrams(&lower) {
            let ids = match self.ngram_index.get(&ngram) {
                Some(ids) => ids,
                None => return Vec::new(),
            };
            match &mut candidates {
                None => candidates = Some(ids.clone()),
                Some(c) => c.retain(|id| ids.contains(id)),
            }
        }

        // n-gram intersection can have false positives
        let mut results: Vec<NodeId> = candidates
            .unwrap_or_default()
            .into_iter()
            .filter(|id| {
                self.names
                    .get(id)
                    .map(|name| name.contains(&lower))
                    .unwrap_or(false)
            })
            .collect();

        results.sort();
        results
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn generate_ngrams(s: &str) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    let mut ngrams = Vec::new();

    for n in MIN_NGRAM_LEN..=MAX_NGRAM_LEN {
        if chars.len() >= n {
            for i in 0..=(chars.len() - n) {
                ngrams.push(chars[i..i + n].iter().collect());
            }
        }
    }

    ngrams
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_id(n: u32) -> NodeId {
        NodeId::new(n as usize)
    }

    #[test]
    fn test_prefix_in_name_order() {
        let mut index = SearchIndex::new();
        index.insert("beta", node_id(0));
        index.insert("alpha", node_id(1));
        index.insert("alphabet", node_id(2));

        assert_eq!(index.prefix("al"), vec![node_id(1), node_id(2)]);
        assert_eq!(index.prefix("AL"), vec![node_id(1), node_id(2)]);
        assert_eq!(index.prefix("").len(), 3);
        assert!(index.prefix("gamma").is_empty());
    }

    #[test]
    fn test_search_substring() {
        let mut index = SearchIndex::new();
        index.insert("todo-later", node_id(0));
        index.insert("later", node_id(1));
        index.insert("now", node_id(2));

        assert_eq!(index.search("later"), vec![node_id(0), node_id(1)]);
        assert_eq!(index.search("o-l"), vec![node_id(0)]);
        assert_eq!(index.search("w"), vec![node_id(2)]);
        assert!(index.search("never").is_empty());
    }

    #[test]
    fn test_remove_and_reinsert() {
        let mut index = SearchIndex::new();
        index.insert("foo", node_id(0));
        index.insert("foobar", node_id(1));

        index.remove(node_id(0));
        assert_eq!(index.prefix("foo"), vec![node_id(1)]);
        assert_eq!(index.len(), 1);

        // Reusing an id under a new name drops the old name.
        index.insert("zap", node_id(1));
        assert!(index.prefix("foo").is_empty());
        assert_eq!(index.search("za"), vec![node_id(1)]);
    }
}
