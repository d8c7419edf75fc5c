//! archlens - schema-driven architecture metrics.
//!
//! archlens interprets generic syntax trees (tree-sitter JSON dumps, one per
//! source file) through a declarative per-language selector schema. One
//! interpreter serves every language; what a "function", an "import" or an
//! "endpoint" looks like is data, not code.
//!
//! # Architecture
//!
//! - `tree`: the generic `SyntaxNode` model and JSON loading
//! - `schema`: selector schemas, path queries, dependency classification
//! - `analysis`: query engine, per-file aggregation, project runner
//! - `graph`: in-project dependency graph and DOT rendering
//! - `report`: report finalization and output formatting (text, JSON)
//! - `discover`: project file discovery
//! - `parser`: tree-sitter source of syntax trees (feature `tree-sitter`)
//!
//! # Adding a New Language
//!
//! Write a selector schema (see `src/templates/`). If the grammar is not
//! bundled, produce the JSON trees with any tree-sitter binding; the engine
//! only cares about their shape.

pub mod analysis;
pub mod cli;
pub mod discover;
pub mod error;
pub mod graph;
#[cfg(feature = "tree-sitter")]
pub mod parser;
pub mod report;
pub mod schema;
pub mod tree;

pub use analysis::{
    analyze_file, extract_value_by_path, find_nodes_by_type, AstFile, ProjectAnalysis, Runner,
    StatsAccumulator,
};
pub use error::{AnalysisError, Result};
pub use graph::{DependencyGraph, NodeKind};
pub use report::{finalize, Report};
pub use schema::{DependencyClassifier, DependencyOrigin, PathQuery, SelectorSchema};
pub use tree::{load_tree, parse_tree, SyntaxNode};
