//! Symbol index (C3): a cross-file map of functions, methods, classes, and
//! variables, kept current by re-indexing one file at a time.
//!
//! Grounded on the teacher's `state.rs` pattern of a `Mutex`-guarded map
//! behind a small typed façade, generalized from "file path -> edit state"
//! to "file path -> symbols defined here, and who references them". Walking
//! uses the same kind tables (`kinds.rs`) and field-alias helpers
//! (`node_ext.rs`) the parse service and differ share.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tree_sitter::{Node, Tree};

use crate::kinds::{self, REFERENCE_KINDS};
use crate::node_ext::{name_field, node_text};
use crate::position::SourcePosition;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Method,
    Class,
    Interface,
    Variable,
}

pub type SymbolId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub name: String,
    pub file_path: PathBuf,
    pub start: SourcePosition,
    pub end: SourcePosition,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<SymbolId>,
    /// Symbol ids this symbol's body refers to.
    pub dependencies: Vec<SymbolId>,
    /// Symbol ids that refer to this symbol.
    pub references: Vec<SymbolId>,
}

fn symbol_id(file_path: &Path, name: &str, start: SourcePosition) -> SymbolId {
    format!("{}#{}:{}", file_path.display(), name, start.line_1indexed())
}

#[derive(Default)]
struct Inner {
    symbols: HashMap<SymbolId, Symbol>,
    by_file: HashMap<PathBuf, Vec<SymbolId>>,
    /// For a file, the set of other files whose symbols reference it.
    referring_files: HashMap<PathBuf, HashSet<PathBuf>>,
}

/// Cross-file symbol table. Cheaply cloned; state lives behind an `Arc<RwLock<_>>`.
#[derive(Clone, Default)]
pub struct SymbolIndex {
    inner: Arc<RwLock<Inner>>,
}

impl SymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-index `file_path`, replacing any symbols previously extracted from
    /// it. Destructive: stale ids for this file are dropped first so renames
    /// and deletions don't leave ghosts behind.
    pub fn update_file_symbols(&self, file_path: &Path, tree: &Tree, source: &str) {
        let extracted = extract_symbols(file_path, tree, source);

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());

        if let Some(old_ids) = inner.by_file.remove(file_path) {
            for id in old_ids {
                inner.symbols.remove(&id);
            }
        }
        for files in inner.referring_files.values_mut() {
            files.remove(file_path);
        }

        let new_ids: Vec<SymbolId> = extracted.iter().map(|(s, _)| s.id.clone()).collect();
        let raw_references: HashMap<SymbolId, Vec<String>> = extracted
            .iter()
            .map(|(s, refs)| (s.id.clone(), refs.clone()))
            .collect();
        for (symbol, _) in extracted {
            inner.symbols.insert(symbol.id.clone(), symbol);
        }
        inner.by_file.insert(file_path.to_path_buf(), new_ids);

        link_dependencies(&mut inner, file_path, &raw_references);
    }

    pub fn remove_file(&self, file_path: &Path) {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        if let Some(old_ids) = inner.by_file.remove(file_path) {
            for id in old_ids {
                inner.symbols.remove(&id);
            }
        }
        for files in inner.referring_files.values_mut() {
            files.remove(file_path);
        }
    }

    pub fn file_symbols(&self, file_path: &Path) -> Vec<Symbol> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner
            .by_file
            .get(file_path)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.symbols.get(id).cloned())
            .collect()
    }

    /// Literal or regex lookup by name (spec §4.3): a plain name most names
    /// actually are, so an exact match is tried first and returned without
    /// ever invoking the regex engine; only when that comes up empty is
    /// `pattern` compiled as a regex and matched against every known name.
    /// An invalid pattern that isn't a literal match either yields no
    /// results rather than an error — `find_by_name` has no failure mode.
    pub fn find_by_name(&self, pattern: &str) -> Vec<Symbol> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());

        let literal: Vec<Symbol> = inner
            .symbols
            .values()
            .filter(|s| s.name == pattern)
            .cloned()
            .collect();
        if !literal.is_empty() {
            return literal;
        }

        match Regex::new(pattern) {
            Ok(re) => inner
                .symbols
                .values()
                .filter(|s| re.is_match(&s.name))
                .cloned()
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<Symbol> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.symbols.get(id).cloned()
    }

    /// Files that define a symbol referenced from within `file_path`, or that
    /// reference a symbol defined in it — used to invalidate dependent cache
    /// entries after a multi-file edit (spec §4.3, §8 "related_files").
    pub fn related_files(&self, file_path: &Path) -> Vec<PathBuf> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        let mut related: HashSet<PathBuf> = inner
            .referring_files
            .get(file_path)
            .cloned()
            .unwrap_or_default();

        for id in inner.by_file.get(file_path).into_iter().flatten() {
            if let Some(symbol) = inner.symbols.get(id) {
                for dep_id in &symbol.dependencies {
                    if let Some(dep) = inner.symbols.get(dep_id) {
                        related.insert(dep.file_path.clone());
                    }
                }
            }
        }

        related.remove(file_path);
        related.into_iter().collect()
    }

    pub fn all_names(&self) -> Vec<String> {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.symbols.values().map(|s| s.name.clone()).collect()
    }
}

fn extract_symbols(file_path: &Path, tree: &Tree, source: &str) -> Vec<(Symbol, Vec<String>)> {
    let mut out = Vec::new();
    walk(tree.root_node(), file_path, source, None, &mut out);
    out
}

fn symbol_kind_for(node_kind: &str, has_parent_class: bool) -> Option<SymbolKind> {
    if kinds::is_class_kind(node_kind) {
        if matches!(node_kind, "interface_declaration" | "trait_item") {
            Some(SymbolKind::Interface)
        } else {
            Some(SymbolKind::Class)
        }
    } else if kinds::is_function_kind(node_kind) {
        if has_parent_class {
            Some(SymbolKind::Method)
        } else {
            Some(SymbolKind::Function)
        }
    } else if kinds::is_variable_kind(node_kind) {
        Some(SymbolKind::Variable)
    } else {
        None
    }
}

fn walk(
    node: Node<'_>,
    file_path: &Path,
    source: &str,
    parent_id: Option<SymbolId>,
    out: &mut Vec<(Symbol, Vec<String>)>,
) {
    let node_kind = node.kind();
    let is_class = kinds::is_class_kind(node_kind);
    let parent_is_class = is_enclosing_class(out, &parent_id);

    if let Some(kind) = symbol_kind_for(node_kind, parent_id.as_ref().is_some() && parent_is_class) {
        if let Some(name_node) = name_field(&node) {
            let name = node_text(&name_node, source).to_string();
            let start = SourcePosition::from(node.start_position());
            let end = SourcePosition::from(node.end_position());
            let id = symbol_id(file_path, &name, start);
            let references = collect_node_references(node, source);

            out.push((
                Symbol {
                    id: id.clone(),
                    kind,
                    name,
                    file_path: file_path.to_path_buf(),
                    start,
                    end,
                    parent_id: parent_id.clone(),
                    dependencies: Vec::new(),
                    references: Vec::new(),
                },
                references,
            ));

            let next_parent = if is_class { Some(id) } else { parent_id.clone() };
            let mut cursor = node.walk();
            for child in node.children(&mut cursor) {
                walk(child, file_path, source, next_parent.clone(), out);
            }
            return;
        }
    }

    // Descend through containers (blocks, programs, class bodies) without
    // creating a symbol for the container itself.
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, file_path, source, parent_id.clone(), out);
    }
}

fn is_enclosing_class(out: &[(Symbol, Vec<String>)], parent_id: &Option<SymbolId>) -> bool {
    match parent_id {
        Some(id) => out
            .iter()
            .find(|(s, _)| &s.id == id)
            .map(|(s, _)| s.kind == SymbolKind::Class || s.kind == SymbolKind::Interface)
            .unwrap_or(false),
        None => false,
    }
}

/// Populate `dependencies`/`references` from the raw reference names each
/// symbol's body collected at extraction time, matched against known symbol
/// names across the whole index.
fn link_dependencies(
    inner: &mut Inner,
    file_path: &Path,
    raw_references: &HashMap<SymbolId, Vec<String>>,
) {
    let ids = inner.by_file.get(file_path).cloned().unwrap_or_default();

    // Clear stale reverse links this file contributed before recomputing.
    for symbol in inner.symbols.values_mut() {
        symbol.references.retain(|r| !ids.contains(r));
    }

    let known_names: HashMap<String, Vec<SymbolId>> = {
        let mut map: HashMap<String, Vec<SymbolId>> = HashMap::new();
        for symbol in inner.symbols.values() {
            map.entry(symbol.name.clone()).or_default().push(symbol.id.clone());
        }
        map
    };

    let mut referring_updates: Vec<(PathBuf, PathBuf)> = Vec::new();
    let mut dep_updates: Vec<(SymbolId, Vec<SymbolId>)> = Vec::new();
    let mut back_refs: Vec<(SymbolId, SymbolId)> = Vec::new();

    for id in &ids {
        let names = raw_references.get(id).cloned().unwrap_or_default();
        let mut deps = Vec::new();
        for referenced_name in names {
            if let Some(candidates) = known_names.get(&referenced_name) {
                for candidate_id in candidates {
                    if candidate_id == id {
                        continue;
                    }
                    deps.push(candidate_id.clone());
                    back_refs.push((candidate_id.clone(), id.clone()));
                    if let Some(candidate) = inner.symbols.get(candidate_id) {
                        if candidate.file_path != *file_path {
                            referring_updates.push((candidate.file_path.clone(), file_path.to_path_buf()));
                        }
                    }
                }
            }
        }
        dep_updates.push((id.clone(), deps));
    }

    for (id, deps) in dep_updates {
        if let Some(symbol) = inner.symbols.get_mut(&id) {
            symbol.dependencies = deps;
        }
    }
    for (target, referrer) in back_refs {
        if let Some(symbol) = inner.symbols.get_mut(&target) {
            if !symbol.references.contains(&referrer) {
                symbol.references.push(referrer);
            }
        }
    }
    for (defined_in, referenced_from) in referring_updates {
        inner
            .referring_files
            .entry(defined_in)
            .or_default()
            .insert(referenced_from);
    }
}

/// Walk `node`'s subtree collecting the text of every reference-kind leaf
/// (spec §4.3 dependency pass), skipping the node's own name field so a
/// function isn't recorded as referencing itself.
fn collect_node_references(node: Node<'_>, source: &str) -> Vec<String> {
    let mut names = Vec::new();
    let skip = name_field(&node).map(|n| n.id());
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_node_references_rec(child, source, skip, &mut names);
    }
    names
}

fn collect_node_references_rec(node: Node<'_>, source: &str, skip: Option<usize>, out: &mut Vec<String>) {
    if REFERENCE_KINDS.contains(&node.kind()) && Some(node.id()) != skip {
        out.push(node_text(&node, source).to_string());
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_node_references_rec(child, source, skip, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn extracts_top_level_function() {
        let source = "fn add(a: i32, b: i32) -> i32 { a + b }";
        let tree = parse(source);
        let index = SymbolIndex::new();
        let path = PathBuf::from("lib.rs");
        index.update_file_symbols(&path, &tree, source);

        let symbols = index.file_symbols(&path);
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].name, "add");
        assert_eq!(symbols[0].kind, SymbolKind::Function);
    }

    #[test]
    fn extracts_methods_under_impl_with_parent_link() {
        let source = "struct Foo; impl Foo { fn bar(&self) {} }";
        let tree = parse(source);
        let index = SymbolIndex::new();
        let path = PathBuf::from("lib.rs");
        index.update_file_symbols(&path, &tree, source);

        let found = index.find_by_name("bar");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, SymbolKind::Function);
    }

    #[test]
    fn find_by_name_falls_back_to_regex_when_no_literal_match() {
        let source = "fn get_user() {} fn get_order() {} fn set_user() {}";
        let tree = parse(source);
        let index = SymbolIndex::new();
        let path = PathBuf::from("lib.rs");
        index.update_file_symbols(&path, &tree, source);

        assert!(index.find_by_name("get_user").len() == 1, "literal match still takes this path");

        let mut names: Vec<String> = index
            .find_by_name("^get_")
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["get_order", "get_user"]);

        assert!(index.find_by_name("no_such_prefix_").is_empty());
    }

    #[test]
    fn reindexing_a_file_drops_stale_symbols() {
        let path = PathBuf::from("lib.rs");
        let index = SymbolIndex::new();

        let first = "fn old_name() {}";
        index.update_file_symbols(&path, &parse(first), first);
        assert_eq!(index.find_by_name("old_name").len(), 1);

        let second = "fn new_name() {}";
        index.update_file_symbols(&path, &parse(second), second);
        assert_eq!(index.find_by_name("old_name").len(), 0);
        assert_eq!(index.find_by_name("new_name").len(), 1);
    }
}
