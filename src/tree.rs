//! Generic syntax tree model.
//!
//! Trees arrive as JSON dumps of a tree-sitter parse (named children only):
//!
//! ```json
//! { "type": "module", "text": "...",
//!   "startPosition": {"row": 0, "column": 0},
//!   "endPosition": {"row": 12, "column": 0},
//!   "children": [ ... ] }
//! ```

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// A row/column pair (0-indexed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub row: usize,
    #[serde(default)]
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }
}

/// One node of a syntax tree. Children are owned; there are no parent links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxNode {
    /// Grammar type tag, e.g. "call" or "if_statement".
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Source slice covered by the node.
    #[serde(default)]
    pub text: String,
    #[serde(rename = "startPosition", default)]
    pub start_position: Position,
    #[serde(rename = "endPosition", default)]
    pub end_position: Position,
    #[serde(default)]
    pub children: Vec<SyntaxNode>,
}

impl SyntaxNode {
    /// Create a leaf node with zero-width positions.
    pub fn leaf(kind: impl Into<String>, text: impl Into<String>) -> Self {
        Self::with_children(kind, text, Vec::new())
    }

    /// Create a node with the given children.
    pub fn with_children(
        kind: impl Into<String>,
        text: impl Into<String>,
        children: Vec<SyntaxNode>,
    ) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            start_position: Position::default(),
            end_position: Position::default(),
            children,
        }
    }

    /// Set the row span of this node.
    pub fn spanning(mut self, start_row: usize, end_row: usize) -> Self {
        self.start_position = Position::new(start_row, 0);
        self.end_position = Position::new(end_row, 0);
        self
    }

    /// Number of source lines covered, never less than 1.
    pub fn line_span(&self) -> usize {
        1 + self.end_position.row.saturating_sub(self.start_position.row)
    }
}

// Dropping a deep tree must not recurse once per level.
impl Drop for SyntaxNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

/// Top-level fields of a dump. `type` is optional here only.
#[derive(Deserialize)]
struct RootFields {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(rename = "startPosition", default)]
    start_position: Position,
    #[serde(rename = "endPosition", default)]
    end_position: Position,
    #[serde(default)]
    children: Vec<SyntaxNode>,
}

struct TreeRoot(Option<SyntaxNode>);

impl<'de> Deserialize<'de> for TreeRoot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(TreeRootVisitor)
    }
}

struct TreeRootVisitor;

impl<'de> Visitor<'de> for TreeRootVisitor {
    type Value = TreeRoot;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a syntax tree object")
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<TreeRoot, E> {
        Ok(TreeRoot(None))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<TreeRoot, E> {
        Ok(TreeRoot(None))
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<TreeRoot, E> {
        Ok(TreeRoot(None))
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<TreeRoot, E> {
        Ok(TreeRoot(None))
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<TreeRoot, E> {
        Ok(TreeRoot(None))
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<TreeRoot, E> {
        Ok(TreeRoot(None))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<TreeRoot, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(TreeRoot(None))
    }

    fn visit_map<A: MapAccess<'de>>(self, map: A) -> std::result::Result<TreeRoot, A::Error> {
        let fields = RootFields::deserialize(de::value::MapAccessDeserializer::new(map))?;
        Ok(TreeRoot(fields.kind.map(|kind| SyntaxNode {
            kind,
            text: fields.text,
            start_position: fields.start_position,
            end_position: fields.end_position,
            children: fields.children,
        })))
    }
}

/// Decode a JSON tree dump.
///
/// `Ok(None)` is the degenerate tree: blank input, JSON `null`, a non-object
/// value, or an object with no `type` key. Such files contribute nothing but a
/// file count.
///
/// Nesting depth is unbounded. Deep levels run on heap-allocated stack
/// segments, so no dump can overflow the calling thread's stack.
pub fn parse_tree(text: &str) -> std::result::Result<Option<SyntaxNode>, serde_json::Error> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    let mut de = serde_json::Deserializer::from_str(text);
    de.disable_recursion_limit();
    let root = TreeRoot::deserialize(serde_stacker::Deserializer::new(&mut de))?;
    de.end()?;
    Ok(root.0)
}

/// Read and decode a tree from disk.
pub fn load_tree<P: AsRef<Path>>(path: P) -> Result<Option<SyntaxNode>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => AnalysisError::malformed(path, "not valid UTF-8"),
        _ => AnalysisError::io(path, e),
    })?;
    parse_tree(&content).map_err(|e| AnalysisError::malformed(path, e))
}
