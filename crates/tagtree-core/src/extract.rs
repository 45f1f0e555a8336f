//! Annotation extraction - The Eyes of Tagtree
//!
//! Scans file contents for bracketed annotations and turns them into a
//! deterministic set of edges. Extraction is pure: it never touches the
//! index, and the same text always yields the same set regardless of where
//! in the file each annotation appears.
//!
//! Matches that do not make a usable edge are skipped one at a time; a bad
//! annotation never poisons the rest of the file.

use crate::edge::{EdgeKey, ARROW};
use crate::error::{Result, TagTreeError};
use crate::node::SourceFile;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::trace;

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

/// `#[tag]`, single line.
static TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"#\[([^\[\]\r\n]*)\]").expect("tag pattern compiles"));

/// `[left->right]` or `[left->mid->right]`, single line.
static ARROW_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([^\[\]\r\n]*->[^\[\]\r\n]*)\]").expect("arrow pattern compiles")
});

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Which annotation syntax a deployment recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grammar {
    /// `#[tag]` annotations; every edge goes from the file to a tag.
    #[default]
    Tag,

    /// `[a->b]` annotations between arbitrary nodes.
    Arrow,
}

/// How a file's node is named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileNaming {
    /// Base name without extension: `src/foo.ts` becomes `foo`.
    #[default]
    Stem,

    /// The full path as given.
    Path,
}

/// Everything one file declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    pub file: SourceFile,
    pub edges: BTreeSet<EdgeKey>,
}

/// Turns file contents into declared edges.
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor {
    grammar: Grammar,
    naming: FileNaming,
}

// ─────────────────────────────────────────────────────────────────────────────
// Extractor
// ─────────────────────────────────────────────────────────────────────────────

impl Extractor {
    pub fn new(grammar: Grammar, naming: FileNaming) -> Self {
        Self { grammar, naming }
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    /// Describes the file at `path` without reading it.
    pub fn source_file(&self, path: &Path) -> SourceFile {
        let key = path.to_string_lossy().to_string();
        let node_name = match self.naming {
            FileNaming::Stem => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| key.clone()),
            FileNaming::Path => key.clone(),
        };

        SourceFile {
            key,
            node_name,
            location: path.to_path_buf(),
        }
    }

    /// Extracts every edge `content` declares for the file at `path`.
    pub fn extract(&self, path: &Path, content: &str) -> Extraction {
        let file = self.source_file(path);
        let edges = match self.grammar {
            Grammar::Tag => extract_tags(&file.node_name, content),
            Grammar::Arrow => extract_arrows(&file.node_name, content),
        };

        Extraction { file, edges }
    }
}

fn extract_tags(file: &str, content: &str) -> BTreeSet<EdgeKey> {
    let mut edges = BTreeSet::new();

    for caps in TAG_PATTERN.captures_iter(content) {
        let tag = caps[1].trim();
        if tag.is_empty() || tag == file {
            trace!("Skipping tag annotation {:?} in {}", &caps[0], file);
            continue;
        }
        edges.insert(EdgeKey::new(file, tag));
    }

    edges
}

fn extract_arrows(file: &str, content: &str) -> BTreeSet<EdgeKey> {
    let mut edges = BTreeSet::new();

    for caps in ARROW_PATTERN.captures_iter(content) {
        match parse_arrow(file, &caps[1]) {
            Ok(parsed) => edges.extend(parsed),
            Err(e) => trace!("Skipping annotation in {}: {}", file, e),
        }
    }

    edges
}

/// Parses the inside of one bracketed arrow annotation.
///
/// An empty side means the file itself. The three-segment form links the
/// file and the last segment in both directions; the middle segment is
/// not used.
fn parse_arrow(file: &str, inner: &str) -> Result<Vec<EdgeKey>> {
    let segments: Vec<&str> = inner.split(ARROW).map(str::trim).collect();
    let malformed = || TagTreeError::MalformedEdge(format!("[{}]", inner));

    let edges = match segments.as_slice() {
        [_, _, ""] => return Err(malformed()),
        [_, _, far] => {
            let link = EdgeKey::new(file, *far);
            vec![link.reversed(), link]
        }
        ["", ""] => return Err(malformed()),
        ["", to] => vec![EdgeKey::new(file, *to)],
        [from, ""] => vec![EdgeKey::new(*from, file)],
        [from, to] => vec![EdgeKey::new(*from, *to)],
        _ => return Err(malformed()),
    };

    if edges.iter().any(EdgeKey::is_self_loop) {
        return Err(malformed());
    }

    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(edges: &BTreeSet<EdgeKey>) -> Vec<String> {
        edges.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn test_tags_collapse_duplicates() {
        let extractor = Extractor::new(Grammar::Tag, FileNaming::Stem);
        let text = "// #[beta]\nfn a() {} // #[alpha]\n/* #[beta] */";

        let extraction = extractor.extract(Path::new("src/foo.ts"), text);

        assert_eq!(extraction.file.node_name, "foo");
        assert_eq!(extraction.file.key, "src/foo.ts");
        assert_eq!(keys(&extraction.edges), vec!["foo->alpha", "foo->beta"]);
    }

    #[test]
    fn test_tags_order_independent() {
        let extractor = Extractor::new(Grammar::Tag, FileNaming::Stem);
        let a = extractor.extract(Path::new("f.md"), "#[one] #[two]");
        let b = extractor.extract(Path::new("f.md"), "#[two]\n\n#[one]");
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_tag_ignored() {
        let extractor = Extractor::new(Grammar::Tag, FileNaming::Stem);
        let extraction = extractor.extract(Path::new("f.md"), "#[] #[  ] #[ok ]");
        assert_eq!(keys(&extraction.edges), vec!["f->ok"]);
    }

    #[test]
    fn test_arrow_empty_left_points_from_file() {
        let extractor = Extractor::new(Grammar::Arrow, FileNaming::Stem);
        let extraction = extractor.extract(Path::new("src/x.ts"), "// [->target]");
        assert_eq!(keys(&extraction.edges), vec!["x->target"]);
    }

    #[test]
    fn test_arrow_empty_right_points_into_file() {
        let extractor = Extractor::new(Grammar::Arrow, FileNaming::Stem);
        let extraction = extractor.extract(Path::new("src/y.ts"), "// [source->]");
        assert_eq!(keys(&extraction.edges), vec!["source->y"]);
    }

    #[test]
    fn test_arrow_literal_edge_does_not_involve_file() {
        let extractor = Extractor::new(Grammar::Arrow, FileNaming::Stem);
        let extraction = extractor.extract(Path::new("z.ts"), "[ a -> b ]");
        assert_eq!(keys(&extraction.edges), vec!["a->b"]);
    }

    #[test]
    fn test_arrow_three_segments_is_bidirectional() {
        let extractor = Extractor::new(Grammar::Arrow, FileNaming::Stem);
        let extraction = extractor.extract(Path::new("f.ts"), "[a->mid->c]");
        assert_eq!(keys(&extraction.edges), vec!["c->f", "f->c"]);

        let other_mid = extractor.extract(Path::new("f.ts"), "[q->whatever->c]");
        assert_eq!(extraction.edges, other_mid.edges);
    }

    #[test]
    fn test_arrow_malformed_matches_skipped() {
        let extractor = Extractor::new(Grammar::Arrow, FileNaming::Stem);
        let text = "[->] [a->b->c->d] [x->y->] [f->] [ok->]";
        let extraction = extractor.extract(Path::new("f.ts"), text);
        assert_eq!(keys(&extraction.edges), vec!["ok->f"]);
    }

    #[test]
    fn test_arrow_ignores_plain_brackets() {
        let extractor = Extractor::new(Grammar::Arrow, FileNaming::Stem);
        let extraction = extractor.extract(Path::new("f.ts"), "let v = arr[0]; #[tag]");
        assert!(extraction.edges.is_empty());
    }

    #[test]
    fn test_path_naming() {
        let extractor = Extractor::new(Grammar::Tag, FileNaming::Path);
        let extraction = extractor.extract(Path::new("src/foo.ts"), "#[alpha]");
        assert_eq!(extraction.file.node_name, "src/foo.ts");
        assert_eq!(keys(&extraction.edges), vec!["src/foo.ts->alpha"]);
    }

    #[test]
    fn test_parse_arrow_errors() {
        assert!(parse_arrow("f", "->").is_err());
        assert!(parse_arrow("f", "a->b->c->d").is_err());
        assert!(parse_arrow("f", "->f").is_err());
        assert_eq!(parse_arrow("f", "a->b").unwrap(), vec![EdgeKey::new("a", "b")]);
    }
}
