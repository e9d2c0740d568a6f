//! Tree differ (C5): a structural diff between two parsed nodes, used by the
//! orchestrator to classify a proposed edit before it's written and by the
//! validator to score how much a function body actually changed.
//!
//! Grounded on the teacher's `diffy`-based textual diff generator, but
//! operating on the AST rather than lines: recursion mirrors children
//! pairwise, falling back to whole-subtree add/remove once a shared prefix
//! runs out, matching the "structural, not textual" comparison spec §4.5
//! calls for. A child cap keeps pathological wide nodes (huge match/case
//! blocks) from exploding the comparison.

use tree_sitter::Node;

use crate::kinds::is_diffable_function_kind;
use crate::node_ext::node_text;

/// A cap on how many children of one node are compared pairwise before the
/// remainder is treated as a single bulk addition/removal (spec §4.5).
const MAX_COMPARED_CHILDREN: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Change {
    pub kind: ChangeKind,
    pub node_kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
}

/// Diff two nodes drawn from (possibly) different trees, each with its own
/// source text.
pub fn diff_nodes(old: Node<'_>, old_source: &str, new: Node<'_>, new_source: &str) -> Vec<Change> {
    let mut changes = Vec::new();
    diff_rec(old, old_source, new, new_source, &mut changes);
    changes
}

fn diff_rec(old: Node<'_>, old_source: &str, new: Node<'_>, new_source: &str, out: &mut Vec<Change>) {
    if old.kind() != new.kind() {
        out.push(Change {
            kind: ChangeKind::Modified,
            node_kind: format!("{} -> {}", old.kind(), new.kind()),
            old_text: Some(node_text(&old, old_source).to_string()),
            new_text: Some(node_text(&new, new_source).to_string()),
        });
        return;
    }

    // Function-like nodes short-circuit on whole-text equality: identical
    // signature and body text means no structural change worth walking
    // child-by-child (spec §4.5). A difference still falls through to the
    // generic child recursion below, so the diff distinguishes a signature
    // change (outside the body field) from a body-only change.
    if is_diffable_function_kind(old.kind()) && node_text(&old, old_source) == node_text(&new, new_source) {
        return;
    }

    if old.child_count() == 0 && new.child_count() == 0 {
        let old_text = node_text(&old, old_source);
        let new_text = node_text(&new, new_source);
        if old_text != new_text {
            out.push(Change {
                kind: ChangeKind::Modified,
                node_kind: old.kind().to_string(),
                old_text: Some(old_text.to_string()),
                new_text: Some(new_text.to_string()),
            });
        }
        return;
    }

    let old_children: Vec<Node> = named_children(old);
    let new_children: Vec<Node> = named_children(new);

    let shared = old_children.len().min(new_children.len()).min(MAX_COMPARED_CHILDREN);
    for i in 0..shared {
        diff_rec(old_children[i], old_source, new_children[i], new_source, out);
    }

    for removed in old_children.iter().skip(shared) {
        out.push(Change {
            kind: ChangeKind::Removed,
            node_kind: removed.kind().to_string(),
            old_text: Some(node_text(removed, old_source).to_string()),
            new_text: None,
        });
    }
    for added in new_children.iter().skip(shared) {
        out.push(Change {
            kind: ChangeKind::Added,
            node_kind: added.kind().to_string(),
            old_text: None,
            new_text: Some(node_text(added, new_source).to_string()),
        });
    }
}

fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// `true` if the diff contains no changes at all — the identity-edit case
/// the validator short-circuits to a perfect score (spec §4.6).
pub fn is_identical(changes: &[Change]) -> bool {
    changes.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(source: &str) -> tree_sitter::Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        parser.parse(source, None).unwrap()
    }

    fn function_node(tree: &tree_sitter::Tree) -> Node<'_> {
        tree.root_node().child(0).unwrap()
    }

    #[test]
    fn identical_bodies_produce_no_changes() {
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let old = parse(source);
        let new = parse(source);
        let changes = diff_nodes(function_node(&old), source, function_node(&new), source);
        assert!(is_identical(&changes));
    }

    #[test]
    fn comment_only_change_touches_only_the_body_subtree() {
        let old_source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let new_source = "fn add(a: i32, b: i32) -> i32 { /* sum */ a + b }";
        let old = parse(old_source);
        let new = parse(new_source);
        let changes = diff_nodes(function_node(&old), old_source, function_node(&new), new_source);
        assert!(!changes.is_empty());
        assert!(changes.iter().all(|c| c.node_kind != "parameters"));
    }

    #[test]
    fn signature_change_is_reported_on_the_parameters_node() {
        let old_source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let new_source = "fn add(a: i32, b: i32, c: i32) -> i32 { a + b + c }";
        let old = parse(old_source);
        let new = parse(new_source);
        let changes = diff_nodes(function_node(&old), old_source, function_node(&new), new_source);
        assert!(changes.iter().any(|c| c.node_kind == "parameter"));
    }
}
