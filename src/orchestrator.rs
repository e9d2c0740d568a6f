//! Edit orchestrator (C8): the transaction that turns a function identifier
//! and a replacement body into a validated, backed-up, on-disk edit — or a
//! caller-facing [`EditFallback`] if anything along the way disqualifies it.
//!
//! Grounded on the teacher's `Editor` (ropey-based splice + diffy-based
//! fallback messaging), re-targeted from "iterate candidate anchors" to
//! "locate the one node the identifier names" since the spec's identifier
//! grammar makes location unambiguous — there's no candidate list to walk.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use bk_tree::{metrics::Levenshtein, BKTree};
use ropey::Rope;

use crate::cache::Priority;
use crate::config::EngineConfig;
use crate::deadline::Deadline;
use crate::diff_preview;
use crate::differ;
use crate::embedding::{EmbeddingProvider, NullEmbeddingProvider};
use crate::error::{handle_edit_failure, AstError, EditFallback, ErrorKind, RecoveryTracker, Result};
use crate::filesystem::FileOperations;
use crate::leases::PathLeases;
use crate::node_ext::{body_field, node_text};
use crate::parser::{find_node_by_identifier, FunctionIdentifier, ParseService};
use crate::position::SourcePosition;
use crate::rollback::RollbackStore;
use crate::symbols::SymbolIndex;

pub struct EditSuccess {
    pub new_content: String,
    pub semantic_score: f32,
    pub structural_score: f32,
    /// Unified diff of the old body against the new one, stripped of file
    /// and hunk headers (spec §4.9) — a caller reviewing the result doesn't
    /// have to diff the file itself.
    pub diff: String,
}

pub struct EditOrchestrator {
    parser: ParseService,
    symbols: SymbolIndex,
    rollback: RollbackStore,
    config: Mutex<EngineConfig>,
    embedding_provider: Box<dyn EmbeddingProvider>,
    recovery: Mutex<RecoveryTracker>,
    leases: PathLeases,
}

impl EditOrchestrator {
    pub fn new(parser: ParseService, symbols: SymbolIndex, rollback: RollbackStore, config: EngineConfig) -> Self {
        Self {
            parser,
            symbols,
            rollback,
            config: Mutex::new(config),
            embedding_provider: Box::new(NullEmbeddingProvider),
            recovery: Mutex::new(RecoveryTracker::new()),
            leases: PathLeases::new(),
        }
    }

    pub fn with_embedding_provider(mut self, provider: Box<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = provider;
        self
    }

    pub fn config(&self) -> EngineConfig {
        self.config.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn update_config(&self, patch: crate::config::EngineConfigPatch) {
        let mut config = self.config.lock().unwrap_or_else(|e| e.into_inner());
        config.apply_patch(patch);
    }

    /// Replace the body of the function named by `function_id` (`name:line`
    /// or `Class.method:line`) in `absolute_path` with `new_body`, validating
    /// the change before it's written and rolling it back on failure (spec
    /// §4.8, the nine-step edit transaction).
    pub fn modify_function_body(
        &self,
        fs: &dyn FileOperations,
        absolute_path: &Path,
        function_id: &str,
        new_body: &str,
        deadline: Option<&Deadline>,
    ) -> std::result::Result<EditSuccess, EditFallback> {
        // Held from snapshot through write-back (or rollback): spec §5
        // serializes modify/rollback/invalidate on the same path.
        self.leases.with_lease(absolute_path, || {
            match self.try_modify(fs, absolute_path, function_id, new_body, deadline) {
                Ok(success) => Ok(success),
                Err(error) => Err(self.handle_failure(fs, absolute_path, &error)),
            }
        })
    }

    fn try_modify(
        &self,
        fs: &dyn FileOperations,
        absolute_path: &Path,
        function_id: &str,
        new_body: &str,
        deadline: Option<&Deadline>,
    ) -> Result<EditSuccess> {
        crate::deadline::check_optional(deadline, "modify_function_body")?;

        let original_content = fs.read_file(absolute_path).map_err(|e| {
            AstError::new(
                ErrorKind::GeneralError {
                    message: format!("failed to read {}: {e}", absolute_path.display()),
                },
                0,
            )
            .with_file_path(absolute_path)
        })?;

        let parsed = self.parser.parse_file(absolute_path, &original_content)?;
        if !parsed.error_locations.is_empty() {
            let first = parsed.error_locations[0];
            let context = source_context(&original_content, first.line.saturating_sub(1) as usize);
            return Err(AstError::new(
                ErrorKind::ParseError {
                    path: absolute_path.display().to_string(),
                },
                0,
            )
            .with_file_path(absolute_path)
            .with_original_content(&original_content)
            .with_error_nodes(parsed.error_locations)
            .with_enhanced_details(crate::error::EnhancedDetails {
                source_context: Some(context),
                ..Default::default()
            }));
        }

        self.rollback.snapshot(
            absolute_path.file_name().map(PathBuf::from).unwrap_or_default(),
            absolute_path,
            original_content.clone(),
            "modify_function_body",
        );

        let identifier = FunctionIdentifier::parse(function_id)?;
        let old_node = find_node_by_identifier(parsed.tree.root_node(), &parsed.source, &identifier)
            .ok_or_else(|| self.node_not_found(function_id))?;

        let old_body = body_field(&old_node).ok_or_else(|| {
            AstError::new(ErrorKind::IncompatibleEdit, 0)
                .with_file_path(absolute_path)
                .with_node_type(old_node.kind())
        })?;

        let mut rope = Rope::from_str(&parsed.source);
        let start_char = rope.byte_to_char(old_body.start_byte());
        let end_char = rope.byte_to_char(old_body.end_byte());
        rope.remove(start_char..end_char);
        rope.insert(start_char, new_body);
        let new_content = rope.to_string();

        crate::deadline::check_optional(deadline, "modify_function_body")?;

        let language = self.parser.languages().resolve_for_path(absolute_path)?;
        let mut fresh_parser = language.tree_sitter_parser()?;
        let new_tree = fresh_parser.parse(&new_content, None).ok_or_else(|| {
            AstError::new(
                ErrorKind::ParseError {
                    path: absolute_path.display().to_string(),
                },
                0,
            )
            .with_file_path(absolute_path)
            .with_original_content(&original_content)
        })?;

        let new_node = find_node_by_identifier(new_tree.root_node(), &new_content, &identifier)
            .ok_or_else(|| {
                self.node_not_found(function_id)
                    .with_original_content(&original_content)
            })?;
        let new_body_node = body_field(&new_node).ok_or_else(|| {
            AstError::new(ErrorKind::IncompatibleEdit, 0)
                .with_file_path(absolute_path)
                .with_original_content(&original_content)
        })?;

        if signature_text(old_node, &parsed.source, old_body) != signature_text(new_node, &new_content, new_body_node)
        {
            return Err(AstError::new(ErrorKind::IncompatibleEdit, 0)
                .with_file_path(absolute_path)
                .with_node_type(new_node.kind())
                .with_original_content(&original_content)
                .with_attempted_content(&new_content));
        }

        let (semantic_threshold, structural_threshold) = {
            let config = self.config.lock().unwrap_or_else(|e| e.into_inner());
            (config.semantic_threshold, config.structural_threshold)
        };

        if leaked_function_declaration(
            parsed.tree.root_node(),
            &parsed.source,
            new_tree.root_node(),
            &new_content,
        ) {
            return Err(AstError::new(
                ErrorKind::StructuralValidationFailed {
                    score: 0.0,
                    threshold: structural_threshold,
                },
                0,
            )
            .with_file_path(absolute_path)
            .with_node_type(new_node.kind())
            .with_original_content(&original_content)
            .with_attempted_content(&new_content));
        }

        let outcome = crate::validator::validate(
            old_body,
            &parsed.source,
            new_body_node,
            &new_content,
            self.embedding_provider.as_ref(),
            semantic_threshold,
            structural_threshold,
        )
        .map_err(|e| e.with_original_content(&original_content).with_attempted_content(&new_content))?;

        fs.write_file(absolute_path.to_path_buf(), new_content.clone())
            .map_err(|e| {
                AstError::new(
                    ErrorKind::GeneralError {
                        message: format!("failed to write {}: {e}", absolute_path.display()),
                    },
                    0,
                )
                .with_file_path(absolute_path)
            })?;

        self.parser.invalidate(absolute_path);
        self.symbols.update_file_symbols(absolute_path, &new_tree, &new_content);
        self.parser
            .cache()
            .put(absolute_path.to_path_buf(), new_tree, new_content.clone(), Priority::Medium);

        self.recovery
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .reset(absolute_path);

        let diff = diff_preview::unified_diff(
            node_text(&old_body, &parsed.source),
            node_text(&new_body_node, &new_content),
        );

        Ok(EditSuccess {
            new_content,
            semantic_score: outcome.semantic_score,
            structural_score: outcome.structural_score,
            diff,
        })
    }

    fn handle_failure(&self, fs: &dyn FileOperations, absolute_path: &Path, error: &AstError) -> EditFallback {
        if error.is_recoverable_by_rollback() && self.rollback.has_backups(absolute_path) {
            let should_revert = self
                .recovery
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .attempt_recovery(absolute_path, error)
                .is_some();
            if should_revert {
                let _ = self.rollback.rollback(absolute_path, fs);
                self.parser.invalidate(absolute_path);
            }
        }

        handle_edit_failure(error)
    }

    fn node_not_found(&self, function_id: &str) -> AstError {
        let suggestion = suggest_symbol(&self.symbols, function_id);
        let mut error = AstError::new(
            ErrorKind::NodeNotFound {
                identifier: function_id.to_string(),
            },
            0,
        );
        if let Some(suggestion) = suggestion {
            error = error.with_enhanced_details(crate::error::EnhancedDetails {
                suggested_symbol: Some(suggestion),
                ..Default::default()
            });
        }
        error
    }

    pub fn related_files(&self, absolute_path: &Path) -> Vec<PathBuf> {
        self.symbols.related_files(absolute_path)
    }

    pub fn backup_info(&self, absolute_path: &Path) -> Vec<crate::rollback::EditBackup> {
        self.rollback.backups(absolute_path)
    }

    pub fn rollback_change(&self, fs: &dyn FileOperations, absolute_path: &Path) -> Result<()> {
        self.leases.with_lease(absolute_path, || {
            self.rollback.rollback(absolute_path, fs)?;
            self.parser.invalidate(absolute_path);
            Ok(())
        })
    }

    /// Validate a proposed body replacement without writing it (façade
    /// `validate_function_body_change`, spec §4.9). Parses `path`, locates
    /// the named function, splices `new_body` in memory only, and runs the
    /// same signature + C6 checks `modify_function_body` would — but never
    /// writes to disk and never touches the backup stack. A cache miss on
    /// the initial parse still populates the tree cache as a read-through
    /// side effect, the same as any other read; the spliced candidate tree
    /// itself is never cached or written back.
    pub fn validate_function_body_change(
        &self,
        absolute_path: &Path,
        source: &str,
        function_id: &str,
        new_body: &str,
    ) -> std::result::Result<EditSuccess, AstError> {
        let parsed = self.parser.parse_file(absolute_path, source)?;
        let identifier = FunctionIdentifier::parse(function_id)?;
        let old_node = find_node_by_identifier(parsed.tree.root_node(), &parsed.source, &identifier)
            .ok_or_else(|| self.node_not_found(function_id))?;
        let old_body = body_field(&old_node).ok_or_else(|| {
            AstError::new(ErrorKind::IncompatibleEdit, 0).with_file_path(absolute_path)
        })?;

        let mut rope = Rope::from_str(&parsed.source);
        let start_char = rope.byte_to_char(old_body.start_byte());
        let end_char = rope.byte_to_char(old_body.end_byte());
        rope.remove(start_char..end_char);
        rope.insert(start_char, new_body);
        let new_content = rope.to_string();

        let language = self.parser.languages().resolve_for_path(absolute_path)?;
        let mut fresh_parser = language.tree_sitter_parser()?;
        let new_tree = fresh_parser.parse(&new_content, None).ok_or_else(|| {
            AstError::new(
                ErrorKind::ParseError {
                    path: absolute_path.display().to_string(),
                },
                0,
            )
            .with_file_path(absolute_path)
        })?;

        let new_node = find_node_by_identifier(new_tree.root_node(), &new_content, &identifier)
            .ok_or_else(|| self.node_not_found(function_id))?;
        let new_body_node = body_field(&new_node)
            .ok_or_else(|| AstError::new(ErrorKind::IncompatibleEdit, 0).with_file_path(absolute_path))?;

        if signature_text(old_node, &parsed.source, old_body) != signature_text(new_node, &new_content, new_body_node)
        {
            return Err(AstError::new(ErrorKind::IncompatibleEdit, 0)
                .with_file_path(absolute_path)
                .with_node_type(new_node.kind()));
        }

        let (semantic_threshold, structural_threshold) = {
            let config = self.config.lock().unwrap_or_else(|e| e.into_inner());
            (config.semantic_threshold, config.structural_threshold)
        };

        if leaked_function_declaration(
            parsed.tree.root_node(),
            &parsed.source,
            new_tree.root_node(),
            &new_content,
        ) {
            return Err(AstError::new(
                ErrorKind::StructuralValidationFailed {
                    score: 0.0,
                    threshold: structural_threshold,
                },
                0,
            )
            .with_file_path(absolute_path)
            .with_node_type(new_node.kind())
            .with_original_content(source)
            .with_attempted_content(&new_content));
        }

        let outcome = crate::validator::validate(
            old_body,
            &parsed.source,
            new_body_node,
            &new_content,
            self.embedding_provider.as_ref(),
            semantic_threshold,
            structural_threshold,
        )?;

        let diff = diff_preview::unified_diff(
            node_text(&old_body, &parsed.source),
            node_text(&new_body_node, &new_content),
        );

        Ok(EditSuccess {
            new_content,
            semantic_score: outcome.semantic_score,
            structural_score: outcome.structural_score,
            diff,
        })
    }
}

/// Whole-file structural guard (spec §4.8 steps 6–7, C5): a body splice must
/// never add or remove a function-like declaration anywhere else in the file
/// as a side effect of the replacement text reparsing differently than the
/// node located by identifier — e.g. appending a sibling declaration after
/// the intended body's closing brace, which `signature_text` alone can't see
/// since it only looks inside the located node's own byte range.
fn leaked_function_declaration(
    old_root: tree_sitter::Node<'_>,
    old_source: &str,
    new_root: tree_sitter::Node<'_>,
    new_source: &str,
) -> bool {
    differ::diff_nodes(old_root, old_source, new_root, new_source)
        .iter()
        .any(|change| {
            matches!(change.kind, differ::ChangeKind::Added | differ::ChangeKind::Removed)
                && crate::kinds::is_diffable_function_kind(&change.node_kind)
        })
}

/// Text of `node` with `body`'s span cut out, used to detect whether a
/// splice accidentally changed the function's signature (spec §4.8 step 8).
fn signature_text(node: tree_sitter::Node<'_>, source: &str, body: tree_sitter::Node<'_>) -> String {
    let mut out = String::with_capacity(node.byte_range().len());
    out.push_str(&source[node.start_byte()..body.start_byte()]);
    out.push_str(&source[body.end_byte()..node.end_byte()]);
    out
}

fn source_context(source: &str, error_line: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = error_line.saturating_sub(2);
    let end = (error_line + 3).min(lines.len());
    lines[start.min(lines.len())..end].join("\n")
}

/// Nearest known symbol name by edit distance, for the `NodeNotFound`
/// fallback's "did you mean" hint (spec §4.1).
fn suggest_symbol(symbols: &SymbolIndex, function_id: &str) -> Option<String> {
    let query = FunctionIdentifier::parse(function_id)
        .map(|id| id.member_name)
        .unwrap_or_else(|_| function_id.to_string());

    let names = symbols.all_names();
    if names.is_empty() {
        return None;
    }

    let mut tree: BKTree<String> = BKTree::new(Levenshtein);
    for name in &names {
        tree.add(name.clone());
    }

    tree.find(&query, 3)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, name)| name.clone())
}
