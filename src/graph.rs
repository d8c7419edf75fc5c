//! Project dependency graph.
//!
//! Files and the folders that contain them form the backbone; in-project
//! imports hang off file nodes as module nodes. Nodes and edges are held in
//! ordered sets, so insertion order never shows up in the output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::schema::DependencyClassifier;

/// Kind of graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
    Module,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Folder => "folder",
            NodeKind::Module => "module",
        }
    }

    /// DOT `(shape, color)` for this kind.
    fn style(&self) -> (&'static str, &'static str) {
        match self {
            NodeKind::File => ("ellipse", "lightblue"),
            NodeKind::Folder => ("folder", "gray"),
            NodeKind::Module => ("component", "orange"),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub label: String,
}

pub const CONTAINS: &str = "contains";
pub const IMPORTS: &str = "imports";

/// Deduplicated node and edge sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: BTreeSet<GraphNode>,
    pub edges: BTreeSet<GraphEdge>,
}

/// Node id for a project-relative path: `/` separators, final extension
/// removed (`routes/user.src` becomes `routes/user`).
pub fn file_node_id(rel_path: &str) -> String {
    let normalized = rel_path.replace('\\', "/");
    let (dir, name) = match normalized.rfind('/') {
        Some(i) => normalized.split_at(i + 1),
        None => ("", normalized.as_str()),
    };
    let stem = match name.rfind('.') {
        Some(0) | None => name,
        Some(i) => &name[..i],
    };
    format!("{}{}", dir, stem)
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, id: &str, label: &str, kind: NodeKind) {
        self.nodes.insert(GraphNode {
            id: id.to_string(),
            label: label.to_string(),
            kind,
        });
    }

    pub fn add_edge(&mut self, source: &str, target: &str, label: &str) {
        self.edges.insert(GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
        });
    }

    /// Add a file node plus its folder hierarchy. Returns the file node id.
    pub fn add_file(&mut self, rel_path: &str) -> String {
        let id = file_node_id(rel_path);
        let parts: Vec<&str> = id.split('/').filter(|p| !p.is_empty()).collect();
        let (file_name, folders) = match parts.split_last() {
            Some((name, folders)) => (*name, folders),
            None => return id,
        };

        self.add_node(&id, file_name, NodeKind::File);

        let mut parent: Option<String> = None;
        let mut current = String::new();
        for folder in folders {
            if !current.is_empty() {
                current.push('/');
            }
            current.push_str(folder);
            self.add_node(&current, folder, NodeKind::Folder);
            if let Some(p) = &parent {
                self.add_edge(p, &current, CONTAINS);
            }
            parent = Some(current.clone());
        }
        if let Some(p) = &parent {
            self.add_edge(p, &id, CONTAINS);
        }

        id
    }

    /// Add a module node for `target` and an `imports` edge to it.
    pub fn add_import(&mut self, file_id: &str, target: &str) {
        self.add_node(target, target, NodeKind::Module);
        self.add_edge(file_id, target, IMPORTS);
    }

    /// Add a file and every import the classifier marks in-project.
    pub fn add_file_imports<S: AsRef<str>>(
        &mut self,
        rel_path: &str,
        imports: &[S],
        classifier: &DependencyClassifier,
    ) -> String {
        let file_id = self.add_file(rel_path);
        for target in imports.iter().map(AsRef::as_ref) {
            if classifier.is_internal(target) {
                self.add_import(&file_id, target);
            }
        }
        file_id
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Render as a Graphviz digraph. Node and edge lines are each sorted.
    pub fn render_dot(&self) -> String {
        let mut node_lines: Vec<String> = self
            .nodes
            .iter()
            .map(|n| {
                let (shape, color) = n.kind.style();
                format!(
                    "  \"{}\" [label=\"{}\", shape=\"{}\", color=\"{}\", style=filled];",
                    escape(&n.id),
                    escape(&n.label),
                    shape,
                    color
                )
            })
            .collect();
        node_lines.sort();

        let mut edge_lines: Vec<String> = self
            .edges
            .iter()
            .map(|e| {
                format!(
                    "  \"{}\" -> \"{}\" [label=\"{}\"];",
                    escape(&e.source),
                    escape(&e.target),
                    escape(&e.label)
                )
            })
            .collect();
        edge_lines.sort();

        let mut out = String::new();
        out.push_str("digraph G {\n");
        out.push_str("  rankdir=LR;\n");
        out.push_str("  node [fontname=\"Helvetica\"];\n");
        out.push_str("  edge [fontname=\"Helvetica\"];\n");
        out.push_str("\n  // --- Nodes ---\n");
        for line in &node_lines {
            let _ = writeln!(out, "{}", line);
        }
        out.push_str("\n  // --- Edges ---\n");
        for line in &edge_lines {
            let _ = writeln!(out, "{}", line);
        }
        out.push_str("}\n");
        out
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SelectorSchema;

    fn node(id: &str, label: &str, kind: NodeKind) -> GraphNode {
        GraphNode {
            id: id.to_string(),
            label: label.to_string(),
            kind,
        }
    }

    fn edge(source: &str, target: &str, label: &str) -> GraphEdge {
        GraphEdge {
            source: source.to_string(),
            target: target.to_string(),
            label: label.to_string(),
        }
    }

    #[test]
    fn test_file_node_id() {
        assert_eq!(file_node_id("routes/user.src"), "routes/user");
        assert_eq!(file_node_id("routes\\user.py.json"), "routes/user.py");
        assert_eq!(file_node_id("main"), "main");
        assert_eq!(file_node_id("a.b/c"), "a.b/c");
        assert_eq!(file_node_id("pkg/.env"), "pkg/.env");
    }

    #[test]
    fn test_add_file_hierarchy() {
        let mut graph = DependencyGraph::new();
        let id = graph.add_file("src/api/user.js");
        assert_eq!(id, "src/api/user");

        let expected_nodes: BTreeSet<_> = [
            node("src", "src", NodeKind::Folder),
            node("src/api", "api", NodeKind::Folder),
            node("src/api/user", "user", NodeKind::File),
        ]
        .into_iter()
        .collect();
        assert_eq!(graph.nodes, expected_nodes);

        let expected_edges: BTreeSet<_> = [
            edge("src", "src/api", CONTAINS),
            edge("src/api", "src/api/user", CONTAINS),
        ]
        .into_iter()
        .collect();
        assert_eq!(graph.edges, expected_edges);
    }

    #[test]
    fn test_top_level_file_has_no_edges() {
        let mut graph = DependencyGraph::new();
        graph.add_file("main.py");
        assert_eq!(graph.node_count(), 1);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_add_file_is_idempotent() {
        let mut once = DependencyGraph::new();
        once.add_file("routes/admin/user.src");
        once.add_import("routes/admin/user", "db");

        let mut twice = once.clone();
        twice.add_file("routes/admin/user.src");
        twice.add_import("routes/admin/user", "db");
        assert_eq!(once, twice);
        assert_eq!(once.render_dot(), twice.render_dot());
    }

    #[test]
    fn test_graph_scenario() {
        let schema = SelectorSchema {
            external_dependency_patterns: vec!["^os$".to_string()],
            ..Default::default()
        };
        let classifier = DependencyClassifier::from_schema(&schema).unwrap();

        let mut graph = DependencyGraph::new();
        graph.add_file_imports("routes/user.src", &["db", "os"], &classifier);

        let expected_nodes: BTreeSet<_> = [
            node("routes", "routes", NodeKind::Folder),
            node("routes/user", "user", NodeKind::File),
            node("db", "db", NodeKind::Module),
        ]
        .into_iter()
        .collect();
        assert_eq!(graph.nodes, expected_nodes);

        let expected_edges: BTreeSet<_> = [
            edge("routes", "routes/user", CONTAINS),
            edge("routes/user", "db", IMPORTS),
        ]
        .into_iter()
        .collect();
        assert_eq!(graph.edges, expected_edges);
    }

    #[test]
    fn test_render_is_order_independent() {
        let mut a = DependencyGraph::new();
        a.add_file("b/two.py");
        a.add_file("a/one.py");
        a.add_import("a/one", "b.two");

        let mut b = DependencyGraph::new();
        b.add_import("a/one", "b.two");
        b.add_file("a/one.py");
        b.add_file("b/two.py");

        assert_eq!(a.render_dot(), b.render_dot());
    }

    #[test]
    fn test_render_dot_layout() {
        let mut graph = DependencyGraph::new();
        graph.add_file("routes/user.src");
        graph.add_import("routes/user", "db");

        let expected = "digraph G {
  rankdir=LR;
  node [fontname=\"Helvetica\"];
  edge [fontname=\"Helvetica\"];

  // --- Nodes ---
  \"db\" [label=\"db\", shape=\"component\", color=\"orange\", style=filled];
  \"routes\" [label=\"routes\", shape=\"folder\", color=\"gray\", style=filled];
  \"routes/user\" [label=\"user\", shape=\"ellipse\", color=\"lightblue\", style=filled];

  // --- Edges ---
  \"routes\" -> \"routes/user\" [label=\"contains\"];
  \"routes/user\" -> \"db\" [label=\"imports\"];
}
";
        assert_eq!(graph.render_dot(), expected);
    }

    #[test]
    fn test_render_escapes_quotes() {
        let mut graph = DependencyGraph::new();
        graph.add_import("main", "we\"ird");
        let dot = graph.render_dot();
        assert!(dot.contains("\"we\\\"ird\" [label=\"we\\\"ird\""));
    }
}
