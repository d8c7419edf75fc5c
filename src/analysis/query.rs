//! Type search and path extraction over syntax trees.

use crate::schema::PathQuery;
use crate::tree::SyntaxNode;

/// Pre-order, depth-first iterator over nodes whose type is in a set.
///
/// Each call to [`find_nodes_by_type`] or [`find_nodes_by_types`] starts a
/// fresh traversal; iterators share no state.
#[derive(Debug, Clone)]
pub struct NodesOfType<'a> {
    stack: Vec<&'a SyntaxNode>,
    kinds: Kinds<'a>,
}

#[derive(Debug, Clone)]
enum Kinds<'a> {
    One(&'a str),
    Set(&'a [String]),
}

impl Kinds<'_> {
    fn contains(&self, kind: &str) -> bool {
        match self {
            Kinds::One(k) => *k == kind,
            Kinds::Set(set) => set.iter().any(|k| k == kind),
        }
    }
}

impl<'a> Iterator for NodesOfType<'a> {
    type Item = &'a SyntaxNode;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(node) = self.stack.pop() {
            // Reverse so the leftmost child is visited first
            self.stack.extend(node.children.iter().rev());
            if self.kinds.contains(&node.kind) {
                return Some(node);
            }
        }
        None
    }
}

/// All nodes (the root included) whose type equals `kind`.
pub fn find_nodes_by_type<'a>(tree: &'a SyntaxNode, kind: &'a str) -> NodesOfType<'a> {
    NodesOfType {
        stack: vec![tree],
        kinds: Kinds::One(kind),
    }
}

/// All nodes whose type is any of `kinds`, in one pass.
pub fn find_nodes_by_types<'a>(tree: &'a SyntaxNode, kinds: &'a [String]) -> NodesOfType<'a> {
    let stack = if kinds.is_empty() { Vec::new() } else { vec![tree] };
    NodesOfType {
        stack,
        kinds: Kinds::Set(kinds),
    }
}

/// Number of nodes whose type is any of `kinds`.
pub fn count_nodes_of_types(tree: &SyntaxNode, kinds: &[String]) -> usize {
    find_nodes_by_types(tree, kinds).count()
}

/// Follow `query` from `node` and return the terminal node's text with quote
/// characters removed.
///
/// Each step takes the first child that matches; siblings past it are never
/// considered. Returns `None` when a step has no matching child.
pub fn extract_value_by_path(node: &SyntaxNode, query: &PathQuery) -> Option<String> {
    let last = query.path.len().saturating_sub(1);
    let mut current = node;
    for (i, step) in query.path.iter().enumerate() {
        current = current
            .children
            .iter()
            .find(|child| step.matches(child, i == last))?;
    }
    Some(strip_quotes(&current.text))
}

fn strip_quotes(text: &str) -> String {
    text.chars().filter(|c| *c != '\'' && *c != '"').collect()
}

/// Deepest nesting level in the tree (the root is level 0).
pub fn max_depth(tree: &SyntaxNode) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(tree, 0usize)];
    while let Some((node, depth)) = stack.pop() {
        deepest = deepest.max(depth);
        stack.extend(node.children.iter().map(|c| (c, depth + 1)));
    }
    deepest
}
