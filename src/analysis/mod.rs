//! Schema-driven analysis of syntax trees.
//!
//! All language knowledge comes from a [`SelectorSchema`](crate::schema::SelectorSchema);
//! nothing in this module names a grammar.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌──────────────────┐
//! │ AST files       │────▶│ Runner       │────▶│ StatsAccumulator │
//! │ (*.json)        │     │ (rayon map)  │     │ DependencyGraph  │
//! └─────────────────┘     └──────────────┘     └──────────────────┘
//!                                │                      │
//!                                ▼                      ▼
//!                         ┌──────────────┐     ┌──────────────────┐
//!                         │ query +      │     │ report::finalize │
//!                         │ aggregate    │     │ graph::render_dot│
//!                         └──────────────┘     └──────────────────┘
//! ```
//!
//! - `query`: type search and path extraction
//! - `aggregate`: per-file metrics folded into an accumulator
//! - `stats`: the accumulator and its merge
//! - `runner`: parallel map over files, serialized reduce

pub mod aggregate;
pub mod query;
pub mod runner;
pub mod stats;

pub use aggregate::{analyze_file, analyze_file_at, cyclomatic_complexity, extract_imports};
pub use query::{
    count_nodes_of_types, extract_value_by_path, find_nodes_by_type, find_nodes_by_types,
    max_depth, NodesOfType,
};
pub use runner::{AstFile, FileAnalysis, ProjectAnalysis, Runner};
pub use stats::{
    Composition, DependencyStats, PatternStats, SkipReason, SkippedFile, StatsAccumulator,
};
