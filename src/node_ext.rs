//! Helpers over `tree_sitter::Node` shared by C3/C4/C5/C8.
//!
//! Encapsulates the "duck-typed field access" fallback chain spec §9 asks
//! for as a single helper, instead of each call site trying
//! `child_for_field("name") ?? ("id") ?? ("identifier")` inline.

use tree_sitter::Node;

use crate::kinds::{BODY_FIELD_ALIASES, NAME_FIELD_ALIASES};

/// The node's name-field child, trying each alias in `NAME_FIELD_ALIASES` in order.
pub fn name_field<'tree>(node: &Node<'tree>) -> Option<Node<'tree>> {
    field_by_aliases(node, NAME_FIELD_ALIASES)
}

/// The node's body-field child, trying each alias in `BODY_FIELD_ALIASES` in order.
pub fn body_field<'tree>(node: &Node<'tree>) -> Option<Node<'tree>> {
    field_by_aliases(node, BODY_FIELD_ALIASES)
}

fn field_by_aliases<'tree>(node: &Node<'tree>, aliases: &[&str]) -> Option<Node<'tree>> {
    aliases.iter().find_map(|alias| node.child_for_field_name(alias))
}

/// Verbatim source text for a node.
pub fn node_text<'a>(node: &Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// `true` if the node is itself a tree-sitter error/missing marker (spec §9:
/// only nodes that are themselves error nodes are collected; `has_error` on
/// an interior node is a pruning heuristic, never a source of positions).
pub fn is_error_node(node: &Node<'_>) -> bool {
    node.is_error() || node.is_missing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn name_field_finds_rust_function_name() {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let tree = parser.parse(source, None).unwrap();
        let function_node = tree.root_node().child(0).unwrap();
        let name = name_field(&function_node).unwrap();
        assert_eq!(node_text(&name, source), "add");
    }

    #[test]
    fn body_field_finds_rust_function_block() {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let tree = parser.parse(source, None).unwrap();
        let function_node = tree.root_node().child(0).unwrap();
        let body = body_field(&function_node).unwrap();
        assert_eq!(node_text(&body, source), "{ a + b }");
    }
}
