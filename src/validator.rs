//! Semantic validator (C6): scores how much a proposed function-body
//! replacement changed the function's *behavior*, as distinct from its
//! *structure*, and rejects edits that drift too far from either (spec
//! §4.6).
//!
//! Grounded on the teacher's intent to keep edits "surgical" — the original
//! validator walked a tree-sitter query to flag disallowed constructs; this
//! one instead produces a continuous similarity score the orchestrator
//! compares against configurable thresholds, using `differ.rs`'s kind tables
//! and `embedding.rs`'s provider seam.

use tree_sitter::Node;

use crate::embedding::{cosine_similarity, warn_embedding_unavailable, EmbeddingProvider};
use crate::error::{AstError, ErrorKind};
use crate::node_ext::node_text;
use crate::position::WireLocation;

/// Node kinds skipped entirely during structural comparison: comments carry
/// no behavior, so their presence, absence, or rewording never counts
/// against the structural score (spec §4.6 "comment-only edit accepted").
const SKIPPED_KINDS: &[&str] = &["line_comment", "block_comment", "comment"];

pub struct ValidationOutcome {
    pub semantic_score: f32,
    pub structural_score: f32,
    pub offending_node_type: Option<String>,
    pub offending_locations: Vec<WireLocation>,
}

/// Compare `old` against `new` and reject if either score falls below its
/// configured threshold. `old`/`new` are typically a function's body-field
/// node before and after the proposed splice.
pub fn validate(
    old: Node<'_>,
    old_source: &str,
    new: Node<'_>,
    new_source: &str,
    provider: &dyn EmbeddingProvider,
    semantic_threshold: f32,
    structural_threshold: f32,
) -> Result<ValidationOutcome, AstError> {
    let mut offending_locations = Vec::new();
    let structural_score = structural_similarity(old, old_source, new, new_source, &mut offending_locations);

    let old_text = node_text(&old, old_source);
    let new_text = node_text(&new, new_source);
    let semantic_score = semantic_similarity(old_text, new_text, provider, structural_score);

    let offending_node_type = offending_locations.first().map(|_| new.kind().to_string());

    if structural_score < structural_threshold {
        return Err(AstError::new(
            ErrorKind::StructuralValidationFailed {
                score: structural_score,
                threshold: structural_threshold,
            },
            0,
        )
        .with_node_type(new.kind())
        .with_error_nodes(offending_locations));
    }

    if semantic_score < semantic_threshold {
        return Err(AstError::new(
            ErrorKind::SemanticValidationFailed {
                score: semantic_score,
                threshold: semantic_threshold,
            },
            0,
        )
        .with_node_type(new.kind()));
    }

    Ok(ValidationOutcome {
        semantic_score,
        structural_score,
        offending_node_type,
        offending_locations,
    })
}

/// Cosine similarity of the two bodies' embeddings, short-circuiting to 1.0
/// on exact text equality (spec §4.6 "identity edit accepted") and falling
/// back to the already-computed structural score when no embedding
/// provider is configured.
fn semantic_similarity(
    old_text: &str,
    new_text: &str,
    provider: &dyn EmbeddingProvider,
    structural_fallback: f32,
) -> f32 {
    if old_text == new_text {
        return 1.0;
    }
    match (provider.embed(old_text), provider.embed(new_text)) {
        (Some(a), Some(b)) => cosine_similarity(&a, &b),
        _ => {
            warn_embedding_unavailable("function body comparison");
            structural_fallback
        }
    }
}

/// Recursive AST similarity (spec §4.6): comments/skip-listed kinds score
/// 1.0 outright, a kind mismatch zeroes the subtree, a leaf compares
/// verbatim text (identifiers that differ score 0.5, other differing
/// leaves score 0.8), and an interior node averages the similarity of its
/// first `min(n_old, n_new)` children and combines that with the
/// child-count ratio as `0.8*avg + 0.2*(min/max)` — unless the child counts
/// differ by more than half of `max`, in which case the whole subtree
/// scores a flat 0.5 (spec §4.6). Comments are filtered out of the child
/// list before pairing (rather than matched index-for-index against
/// whatever sits at the same position), so a comment purely inserted or
/// removed can't misalign every child after it.
fn structural_similarity(
    old: Node<'_>,
    old_source: &str,
    new: Node<'_>,
    new_source: &str,
    offending: &mut Vec<WireLocation>,
) -> f32 {
    if SKIPPED_KINDS.contains(&old.kind()) || SKIPPED_KINDS.contains(&new.kind()) {
        return 1.0;
    }

    if old.kind() != new.kind() {
        offending.push(crate::position::SourcePosition::from(new.start_position()).to_wire_location());
        return 0.0;
    }

    let old_children = filtered_named_children(old);
    let new_children = filtered_named_children(new);

    if old_children.is_empty() && new_children.is_empty() {
        let old_text = node_text(&old, old_source);
        let new_text = node_text(&new, new_source);
        if old_text == new_text {
            return 1.0;
        }
        offending.push(crate::position::SourcePosition::from(new.start_position()).to_wire_location());
        return if old.kind() == "identifier" { 0.5 } else { 0.8 };
    }

    let min_len = old_children.len().min(new_children.len());
    let max_len = old_children.len().max(new_children.len()).max(1);

    if old_children.len().abs_diff(new_children.len()) > max_len / 2 {
        offending.push(crate::position::SourcePosition::from(new.start_position()).to_wire_location());
        return 0.5;
    }

    let child_sum: f32 = (0..min_len)
        .map(|i| structural_similarity(old_children[i], old_source, new_children[i], new_source, offending))
        .sum();
    let child_avg = if min_len > 0 { child_sum / min_len as f32 } else { 1.0 };

    0.8 * child_avg + 0.2 * (min_len as f32 / max_len as f32)
}

fn filtered_named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| !SKIPPED_KINDS.contains(&n.kind()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::NullEmbeddingProvider;
    use tree_sitter::Parser;

    fn body_node(source: &str) -> (tree_sitter::Tree, ()) {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        (parser.parse(source, None).unwrap(), ())
    }

    fn function_body<'a>(tree: &'a tree_sitter::Tree) -> Node<'a> {
        let function = tree.root_node().child(0).unwrap();
        crate::node_ext::body_field(&function).unwrap()
    }

    #[test]
    fn identical_body_passes_with_perfect_scores() {
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let (old_tree, _) = body_node(source);
        let (new_tree, _) = body_node(source);
        let outcome = validate(
            function_body(&old_tree),
            source,
            function_body(&new_tree),
            source,
            &NullEmbeddingProvider,
            0.82,
            0.7,
        )
        .unwrap();
        assert_eq!(outcome.structural_score, 1.0);
        assert_eq!(outcome.semantic_score, 1.0);
    }

    #[test]
    fn comment_only_change_passes() {
        let old_source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let new_source = "fn add(a: i32, b: i32) -> i32 { /* sum */ a + b }";
        let (old_tree, _) = body_node(old_source);
        let (new_tree, _) = body_node(new_source);
        let outcome = validate(
            function_body(&old_tree),
            old_source,
            function_body(&new_tree),
            new_source,
            &NullEmbeddingProvider,
            0.82,
            0.7,
        )
        .unwrap();
        assert_eq!(outcome.structural_score, 1.0);
    }

    #[test]
    fn unrelated_rewrite_fails_structural_threshold() {
        let old_source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let new_source = "fn add(a: i32, b: i32) -> i32 { println!(\"hi\"); loop {} }";
        let (old_tree, _) = body_node(old_source);
        let (new_tree, _) = body_node(new_source);
        let err = validate(
            function_body(&old_tree),
            old_source,
            function_body(&new_tree),
            new_source,
            &NullEmbeddingProvider,
            0.82,
            0.7,
        )
        .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::StructuralValidationFailed { .. }));
    }
}
