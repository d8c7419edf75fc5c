//! Per-file metric extraction.
//!
//! Cyclomatic complexity is calculated per function node as:
//! - Start at 1
//! - Add 1 for each node in the function's subtree whose type is one of the
//!   schema's branching nodes

use tracing::trace;

use crate::schema::{SelectorSchema, StructuralRole};
use crate::tree::SyntaxNode;

use super::query::{
    count_nodes_of_types, extract_value_by_path, find_nodes_by_type, find_nodes_by_types,
    max_depth,
};
use super::stats::StatsAccumulator;

/// Fold one file's tree into `acc`.
///
/// `None` is an empty or unparsable file: it bumps the file count and nothing
/// else.
pub fn analyze_file(
    tree: Option<&SyntaxNode>,
    schema: &SelectorSchema,
    acc: &mut StatsAccumulator,
) {
    acc.composition.file_count += 1;

    let tree = match tree {
        Some(t) => t,
        None => return,
    };

    acc.composition.total_lines += tree.line_span();
    acc.composition.max_nesting_depth = acc.composition.max_nesting_depth.max(max_depth(tree));

    // Composition
    let functions: Vec<&SyntaxNode> =
        find_nodes_by_types(tree, schema.role_types(StructuralRole::Function)).collect();
    acc.composition.function_count += functions.len();
    acc.composition.class_count +=
        count_nodes_of_types(tree, schema.role_types(StructuralRole::Class));
    acc.composition.comment_count +=
        count_nodes_of_types(tree, schema.role_types(StructuralRole::Comment));

    // Dependencies
    for selector in &schema.selectors.import {
        for node in find_nodes_by_type(tree, &selector.node_type) {
            acc.dependencies.import_count += 1;
            if let Some(name) = selector
                .source
                .as_ref()
                .and_then(|q| extract_value_by_path(node, q))
                .filter(|v| !v.is_empty())
            {
                acc.record_import_name(&name);
            }
        }
    }

    // Usage patterns
    for (metric, rules) in &schema.selectors.patterns {
        for rule in rules.as_slice() {
            for node in find_nodes_by_type(tree, &rule.node_type).filter(|n| rule.matches(n)) {
                let value = rule
                    .value
                    .as_ref()
                    .and_then(|q| extract_value_by_path(node, q))
                    .filter(|v| !v.is_empty());
                acc.record_pattern(metric, value);
            }
        }
    }

    // Quality and complexity
    acc.exception_handling_count +=
        count_nodes_of_types(tree, schema.role_types(StructuralRole::ExceptionHandling));

    let branching = schema.branching_nodes();
    for function in &functions {
        let complexity = cyclomatic_complexity(function, branching);
        trace!(kind = %function.kind, complexity, "function complexity");
        acc.total_cyclomatic += complexity;
    }
}

/// Like [`analyze_file`], also recording the file's line count under `rel_path`.
pub fn analyze_file_at(
    rel_path: &str,
    tree: Option<&SyntaxNode>,
    schema: &SelectorSchema,
    acc: &mut StatsAccumulator,
) {
    analyze_file(tree, schema, acc);
    if let Some(tree) = tree {
        *acc.lines_per_file.entry(rel_path.to_string()).or_insert(0) += tree.line_span();
    }
}

/// `1 + number of branching nodes within the function's subtree`.
pub fn cyclomatic_complexity(function: &SyntaxNode, branching: &[String]) -> usize {
    1 + count_nodes_of_types(function, branching)
}

/// Every import name the schema's import selectors can extract from `tree`,
/// in document order per selector.
pub fn extract_imports(tree: &SyntaxNode, schema: &SelectorSchema) -> Vec<String> {
    let mut imports = Vec::new();
    for selector in &schema.selectors.import {
        let query = match &selector.source {
            Some(q) => q,
            None => continue,
        };
        imports.extend(
            find_nodes_by_type(tree, &selector.node_type)
                .filter_map(|node| extract_value_by_path(node, query))
                .filter(|v| !v.is_empty()),
        );
    }
    imports
}
