//! Parse service (C4): cache-aware parsing, error-node collection, and the
//! `name:line` / `Class.method:line` identifier grammar that locates a
//! specific node without ambiguity.
//!
//! Grounded on the teacher's language-dispatch-then-parse flow, now routed
//! through `cache::TreeCache` first and falling back to a fresh
//! `tree_sitter::Parser` on a miss, per spec §4.4.

use std::path::Path;

use tree_sitter::{Node, Tree};

use crate::cache::{Priority, TreeCache};
use crate::error::{AstError, ErrorKind, Result};
use crate::kinds::{is_diffable_function_kind, is_function_kind};
use crate::languages::LanguageRegistry;
use crate::node_ext::{is_error_node, name_field, node_text};
use crate::position::WireLocation;

pub struct ParseService {
    languages: LanguageRegistry,
    cache: TreeCache,
}

/// The outcome of parsing a file: its tree, source text, and any error
/// (ERROR/MISSING) nodes found in the tree.
pub struct ParsedFile {
    pub tree: Tree,
    pub source: String,
    pub error_locations: Vec<WireLocation>,
}

impl ParseService {
    pub fn new(languages: LanguageRegistry, cache: TreeCache) -> Self {
        Self { languages, cache }
    }

    /// Parse `path`, consulting the tree cache first (spec §4.4 steps 1-2),
    /// then the language registry's grammar on a miss (steps 3-5), and
    /// finally collecting ERROR/MISSING nodes (step 6).
    pub fn parse_file(&self, path: &Path, source: &str) -> Result<ParsedFile> {
        if let Some(tree) = self.cache.get(path, source) {
            let error_locations = collect_error_locations(&tree);
            return Ok(ParsedFile {
                tree,
                source: source.to_string(),
                error_locations,
            });
        }

        let language = self.languages.resolve_for_path(path)?;
        let mut parser = language.tree_sitter_parser()?;

        // A disk-tier hit only saves re-hashing against a different copy of
        // the same content; it never stores a tree, so parsing still happens.
        let content = match self.cache.disk_get(path, source) {
            Some(disk_hit) => disk_hit.content,
            None => source.to_string(),
        };

        let tree = parser.parse(&content, None).ok_or_else(|| {
            AstError::new(
                ErrorKind::ParseError {
                    path: path.display().to_string(),
                },
                0,
            )
            .with_file_path(path)
        })?;

        let error_locations = collect_error_locations(&tree);

        self.cache
            .put(path.to_path_buf(), tree.clone(), content.clone(), Priority::Medium);

        Ok(ParsedFile {
            tree,
            source: content,
            error_locations,
        })
    }

    pub fn invalidate(&self, path: &Path) {
        self.cache.invalidate(path);
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn cache(&self) -> &TreeCache {
        &self.cache
    }
}

fn collect_error_locations(tree: &Tree) -> Vec<WireLocation> {
    let mut out = Vec::new();
    collect_error_locations_rec(tree.root_node(), &mut out);
    out
}

fn collect_error_locations_rec(node: Node<'_>, out: &mut Vec<WireLocation>) {
    // `has_error` is true for a node that is itself an error/missing node or
    // has one anywhere beneath it — used here purely to prune subtrees with
    // nothing wrong in them; it is never collected as an error location in
    // its own right (spec §9 "has_error as pruning heuristic only").
    if !node.has_error() {
        return;
    }
    if is_error_node(&node) {
        out.push(crate::position::SourcePosition::from(node.start_position()).to_wire_location());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_locations_rec(child, out);
    }
}

/// Render a node as the serialized shape exposed across the public API
/// boundary (spec §3 "serialized node"): kind, byte/point range, and text.
pub fn serialize_node(node: &Node<'_>, source: &str) -> serde_json::Value {
    serde_json::json!({
        "kind": node.kind(),
        "start": crate::position::SourcePosition::from(node.start_position()).to_wire_location(),
        "end": crate::position::SourcePosition::from(node.end_position()).to_wire_location(),
        "text": node_text(node, source),
    })
}

/// Parse a function identifier in `name:line` or `Class.method:line` form.
/// `line` is the 1-indexed line given at the API boundary.
pub struct FunctionIdentifier {
    pub class_name: Option<String>,
    pub member_name: String,
    pub line_1indexed: u32,
}

impl FunctionIdentifier {
    pub fn parse(identifier: &str) -> Result<Self> {
        let (name_part, line_part) = identifier.rsplit_once(':').ok_or_else(|| {
            AstError::new(
                ErrorKind::NodeNotFound {
                    identifier: identifier.to_string(),
                },
                0,
            )
        })?;

        let line_1indexed: u32 = line_part.parse().map_err(|_| {
            AstError::new(
                ErrorKind::NodeNotFound {
                    identifier: identifier.to_string(),
                },
                0,
            )
        })?;

        match name_part.split_once('.') {
            Some((class_name, member_name)) => Ok(Self {
                class_name: Some(class_name.to_string()),
                member_name: member_name.to_string(),
                line_1indexed,
            }),
            None => Ok(Self {
                class_name: None,
                member_name: name_part.to_string(),
                line_1indexed,
            }),
        }
    }
}

/// Find the node whose name-field text and start line match `identifier`
/// (spec §4.4 step 7, §9 "unambiguous location by identifier grammar").
pub fn find_node_by_identifier<'tree>(
    root: Node<'tree>,
    source: &str,
    identifier: &FunctionIdentifier,
) -> Option<Node<'tree>> {
    let mut found = None;
    find_node_rec(root, source, identifier, None, &mut found);
    found
}

fn find_node_rec<'tree>(
    node: Node<'tree>,
    source: &str,
    identifier: &FunctionIdentifier,
    enclosing_class: Option<&str>,
    found: &mut Option<Node<'tree>>,
) {
    if found.is_some() {
        return;
    }

    let node_kind = node.kind();
    let mut next_enclosing_class = enclosing_class.map(|s| s.to_string());

    if crate::kinds::is_class_kind(node_kind) {
        if let Some(name_node) = name_field(&node) {
            next_enclosing_class = Some(node_text(&name_node, source).to_string());
        }
    }

    if is_function_kind(node_kind) || is_diffable_function_kind(node_kind) {
        if let Some(name_node) = name_field(&node) {
            let name = node_text(&name_node, source);
            let line_matches = crate::position::SourcePosition::from(node.start_position())
                .line_1indexed()
                == identifier.line_1indexed;
            let name_matches = name == identifier.member_name;
            let class_matches = match (&identifier.class_name, enclosing_class) {
                (Some(expected), Some(actual)) => expected == actual,
                (Some(_), None) => false,
                (None, _) => true,
            };

            if line_matches && name_matches && class_matches {
                *found = Some(node);
                return;
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        find_node_rec(child, source, identifier, next_enclosing_class.as_deref(), found);
        if found.is_some() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_identifier_without_class() {
        let id = FunctionIdentifier::parse("add:1").unwrap();
        assert_eq!(id.class_name, None);
        assert_eq!(id.member_name, "add");
        assert_eq!(id.line_1indexed, 1);
    }

    #[test]
    fn parses_identifier_with_class() {
        let id = FunctionIdentifier::parse("Foo.bar:12").unwrap();
        assert_eq!(id.class_name.as_deref(), Some("Foo"));
        assert_eq!(id.member_name, "bar");
        assert_eq!(id.line_1indexed, 12);
    }

    #[test]
    fn malformed_identifier_is_node_not_found() {
        let err = FunctionIdentifier::parse("no-colon-here").unwrap_err();
        assert!(matches!(err.kind, ErrorKind::NodeNotFound { .. }));
    }

    #[test]
    fn parse_file_reports_unknown_extension() {
        let service = ParseService::new(LanguageRegistry::new(), TreeCache::with_defaults());
        let err = service
            .parse_file(&PathBuf::from("notes.txt"), "hello")
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::ParserNotFound { .. }));
    }

    #[test]
    fn finds_function_node_by_identifier() {
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let mut parser = tree_sitter::Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();

        let id = FunctionIdentifier::parse("add:1").unwrap();
        let node = find_node_by_identifier(tree.root_node(), source, &id).unwrap();
        assert_eq!(node.kind(), "function_item");
    }
}
