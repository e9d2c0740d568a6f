//! Error model for the editing engine (C1).
//!
//! Every fallible operation in the engine returns a [`Result<T>`] carrying an
//! [`AstError`]. `AstError` tags a fixed [`ErrorKind`], a [`Severity`] derived
//! from that kind, and an `enhanced_details` bag populated per-kind. The
//! orchestrator is the only place that turns an `AstError` into a caller-facing
//! [`EditFallback`] (spec §9 Design Notes: "exceptions-for-control-flow...
//! replace with result-returning operations carrying a tagged error").

use std::path::PathBuf;
use std::sync::PoisonError;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::WireLocation;

/// Type alias for results produced by the engine.
pub type Result<T> = std::result::Result<T, AstError>;

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ErrorKind {
    #[error("no parser registered for extension `.{extension}`")]
    ParserNotFound { extension: String },

    #[error("failed to parse `{path}`")]
    ParseError { path: String },

    #[error("no symbol found matching `{query}`")]
    SymbolNotFound { query: String },

    #[error("no node found for identifier `{identifier}`")]
    NodeNotFound { identifier: String },

    #[error("edit changes the function signature or surrounding structure")]
    IncompatibleEdit,

    #[error("semantic similarity {score:.2} is below threshold {threshold:.2}")]
    SemanticValidationFailed { score: f32, threshold: f32 },

    #[error("structural similarity {score:.2} is below threshold {threshold:.2}")]
    StructuralValidationFailed { score: f32, threshold: f32 },

    #[error("cache operation failed: {message}")]
    CacheError { message: String },

    #[error("rollback failed for `{path}`: {message}")]
    RollbackError { path: String, message: String },

    #[error("operation `{operation}` exceeded its deadline after {elapsed_ms}ms (limit {limit_ms}ms)")]
    TimeoutError {
        operation: String,
        elapsed_ms: u64,
        limit_ms: u64,
    },

    #[error("memory ceiling exceeded: {used_bytes} bytes in use, limit {limit_bytes}")]
    MemoryError { used_bytes: u64, limit_bytes: u64 },

    #[error("{message}")]
    GeneralError { message: String },
}

impl ErrorKind {
    /// Severity is fixed per kind (spec §4.1).
    pub fn severity(&self) -> Severity {
        match self {
            ErrorKind::ParseError { .. }
            | ErrorKind::MemoryError { .. }
            | ErrorKind::TimeoutError { .. } => Severity::Fatal,

            ErrorKind::ParserNotFound { .. } => Severity::Fatal,

            ErrorKind::NodeNotFound { .. }
            | ErrorKind::SymbolNotFound { .. }
            | ErrorKind::RollbackError { .. } => Severity::Error,

            ErrorKind::SemanticValidationFailed { .. }
            | ErrorKind::StructuralValidationFailed { .. }
            | ErrorKind::IncompatibleEdit => Severity::Warning,

            ErrorKind::CacheError { .. } => Severity::Info,

            ErrorKind::GeneralError { .. } => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Info,
}

/// Per-kind enrichment, attached to `AstError::enhanced_details`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnhancedDetails {
    /// Parse errors: a few lines of source around the first error node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_context: Option<String>,
    /// NodeNotFound: nearest known symbol id by edit distance, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_symbol: Option<String>,
    /// Structural/semantic failures: the offending node's type, if identified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offending_node_type: Option<String>,
    /// Memory errors: heap usage at the time of the failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heap_usage_bytes: Option<u64>,
    /// Timeout errors: which operation, how long it ran, and the limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit_ms: Option<u64>,
    /// Whether automatic recovery was attempted, and whether it succeeded.
    pub recovery_attempted: bool,
    pub recovery_successful: bool,
}

/// A fully-enriched, tagged error (spec §3 data model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstError {
    pub kind: ErrorKind,
    pub message: String,
    pub severity: Severity,
    pub timestamp_ms: u64,
    pub file_path: Option<PathBuf>,
    pub node_type: Option<String>,
    pub original_content: Option<String>,
    /// The body text that was proposed and rejected, when an `IncompatibleEdit`
    /// or validation failure has one to show (spec §4.6 human-readable diff).
    pub attempted_content: Option<String>,
    pub error_nodes: Vec<WireLocation>,
    pub enhanced_details: EnhancedDetails,
}

impl AstError {
    pub fn new(kind: ErrorKind, timestamp_ms: u64) -> Self {
        let message = kind.to_string();
        let severity = kind.severity();
        Self {
            kind,
            message,
            severity,
            timestamp_ms,
            file_path: None,
            node_type: None,
            original_content: None,
            attempted_content: None,
            error_nodes: Vec::new(),
            enhanced_details: EnhancedDetails::default(),
        }
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_node_type(mut self, node_type: impl Into<String>) -> Self {
        self.node_type = Some(node_type.into());
        self
    }

    pub fn with_original_content(mut self, content: impl Into<String>) -> Self {
        self.original_content = Some(content.into());
        self
    }

    pub fn with_attempted_content(mut self, content: impl Into<String>) -> Self {
        self.attempted_content = Some(content.into());
        self
    }

    pub fn with_error_nodes(mut self, nodes: Vec<WireLocation>) -> Self {
        self.error_nodes = nodes;
        self
    }

    pub fn with_enhanced_details(mut self, details: EnhancedDetails) -> Self {
        self.enhanced_details = details;
        self
    }

    /// Recoverable-by-rollback class (spec §7): has `original_content` in scope
    /// and should trigger `rollback(path)` + cache invalidation.
    pub fn is_recoverable_by_rollback(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::StructuralValidationFailed { .. }
                | ErrorKind::SemanticValidationFailed { .. }
                | ErrorKind::NodeNotFound { .. }
                | ErrorKind::GeneralError { .. }
        )
    }

    /// Local-only class (spec §7): log and continue with cache bypassed.
    pub fn is_local_only(&self) -> bool {
        matches!(self.kind, ErrorKind::CacheError { .. })
    }
}

impl std::fmt::Display for AstError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AstError {}

impl<T> From<PoisonError<T>> for AstError {
    fn from(_: PoisonError<T>) -> Self {
        AstError::new(
            ErrorKind::CacheError {
                message: "internal lock poisoned".to_string(),
            },
            0,
        )
    }
}

/// Wire-visible failure shape returned by `modify_function_body` and friends
/// (spec §6 "Failure return shape").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditFallback {
    pub status: FallbackStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_content: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub error_locations: Vec<WireLocation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    /// Unified diff of what was proposed against what's actually on disk
    /// now, when the rejected attempt is still around to show (spec §4.5:
    /// `diffy` renders the human-readable diff text attached to the
    /// fallback message, never the structural classification itself).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diff: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackStatus {
    Reverted,
    Partial,
    Alternative,
}

/// Unified diff of what was rejected against what it would have replaced,
/// when an error carries both sides of the attempted edit.
fn rejected_edit_diff(error: &AstError) -> Option<String> {
    let original = error.original_content.as_deref()?;
    let attempted = error.attempted_content.as_deref()?;
    Some(crate::diff_preview::unified_diff(original, attempted))
}

/// Produce the caller-facing fallback for an error (spec §4.1 rules).
pub fn handle_edit_failure(error: &AstError) -> EditFallback {
    match &error.kind {
        ErrorKind::StructuralValidationFailed { .. } | ErrorKind::SemanticValidationFailed { .. } => {
            EditFallback {
                status: FallbackStatus::Reverted,
                message: error.message.clone(),
                fallback_content: error.original_content.clone(),
                error_locations: Vec::new(),
                suggested_action: Some(
                    "the proposed body changes more than the function's behavior; narrow the edit to preserve intent".to_string(),
                ),
                diff: rejected_edit_diff(error),
            }
        }

        ErrorKind::NodeNotFound { identifier } => EditFallback {
            status: FallbackStatus::Reverted,
            message: error.message.clone(),
            fallback_content: None,
            error_locations: Vec::new(),
            suggested_action: Some(
                error
                    .enhanced_details
                    .suggested_symbol
                    .as_ref()
                    .map(|s| format!("did you mean `{s}`? identifiers use `name:line` or `Class.method:line`"))
                    .unwrap_or_else(|| {
                        format!("provide the correct function identifier for `{identifier}` (`name:line` or `Class.method:line`)")
                    }),
            ),
            diff: None,
        },

        ErrorKind::ParserNotFound { .. } => EditFallback {
            status: FallbackStatus::Reverted,
            message: error.message.clone(),
            fallback_content: None,
            error_locations: Vec::new(),
            suggested_action: Some("use a file extension for one of the supported languages".to_string()),
            diff: None,
        },

        ErrorKind::ParseError { .. } => EditFallback {
            status: FallbackStatus::Reverted,
            message: error.message.clone(),
            fallback_content: None,
            error_locations: error.error_nodes.clone(),
            suggested_action: error.enhanced_details.source_context.clone(),
            diff: None,
        },

        ErrorKind::IncompatibleEdit | ErrorKind::CacheError { .. } => EditFallback {
            status: FallbackStatus::Alternative,
            message: error.message.clone(),
            fallback_content: None,
            error_locations: Vec::new(),
            suggested_action: Some("fall back to a plain text-based edit for this change".to_string()),
            diff: rejected_edit_diff(error),
        },

        ErrorKind::SymbolNotFound { .. }
        | ErrorKind::RollbackError { .. }
        | ErrorKind::TimeoutError { .. }
        | ErrorKind::MemoryError { .. }
        | ErrorKind::GeneralError { .. } => EditFallback {
            status: FallbackStatus::Reverted,
            message: error.message.clone(),
            fallback_content: error.original_content.clone(),
            error_locations: Vec::new(),
            suggested_action: None,
            diff: None,
        },
    }
}

/// Bounded automatic recovery (spec §4.1, §7): at most 3 attempts per file.
#[derive(Debug, Default)]
pub struct RecoveryTracker {
    attempts_by_path: std::collections::HashMap<PathBuf, u32>,
}

const MAX_RECOVERY_ATTEMPTS: u32 = 3;

impl RecoveryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt bounded recovery for `error` against `current_content`. Returns
    /// `Some(content)` to revert to, or `None` if this kind doesn't recover or
    /// the per-file cap has been reached.
    pub fn attempt_recovery(&mut self, path: &std::path::Path, error: &AstError) -> Option<String> {
        let recovers = matches!(
            error.kind,
            ErrorKind::StructuralValidationFailed { .. }
                | ErrorKind::SemanticValidationFailed { .. }
                | ErrorKind::TimeoutError { .. }
                | ErrorKind::MemoryError { .. }
                | ErrorKind::GeneralError { .. }
        );
        if !recovers {
            return None;
        }

        let attempts = self.attempts_by_path.entry(path.to_path_buf()).or_insert(0);
        if *attempts >= MAX_RECOVERY_ATTEMPTS {
            return None;
        }
        *attempts += 1;

        error.original_content.clone()
    }

    pub fn attempts_for(&self, path: &std::path::Path) -> u32 {
        self.attempts_by_path.get(path).copied().unwrap_or(0)
    }

    pub fn reset(&mut self, path: &std::path::Path) {
        self.attempts_by_path.remove(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_fixed_per_kind() {
        assert_eq!(
            ErrorKind::ParseError { path: "x.rs".into() }.severity(),
            Severity::Fatal
        );
        assert_eq!(
            ErrorKind::NodeNotFound { identifier: "x:1".into() }.severity(),
            Severity::Error
        );
        assert_eq!(
            ErrorKind::StructuralValidationFailed { score: 0.5, threshold: 0.7 }.severity(),
            Severity::Warning
        );
        assert_eq!(
            ErrorKind::CacheError { message: "miss".into() }.severity(),
            Severity::Info
        );
    }

    #[test]
    fn structural_failure_reverts_with_original_content() {
        let error = AstError::new(
            ErrorKind::StructuralValidationFailed { score: 0.4, threshold: 0.7 },
            0,
        )
        .with_original_content("fn add(a, b) { a + b }");
        let fallback = handle_edit_failure(&error);
        assert_eq!(fallback.status, FallbackStatus::Reverted);
        assert_eq!(fallback.fallback_content.as_deref(), Some("fn add(a, b) { a + b }"));
        assert!(fallback.suggested_action.is_some());
    }

    #[test]
    fn node_not_found_has_no_content_but_hints_identifier_grammar() {
        let error = AstError::new(
            ErrorKind::NodeNotFound { identifier: "missing:42".into() },
            0,
        );
        let fallback = handle_edit_failure(&error);
        assert_eq!(fallback.status, FallbackStatus::Reverted);
        assert!(fallback.fallback_content.is_none());
        assert!(fallback.suggested_action.unwrap().contains("name:line"));
    }

    #[test]
    fn incompatible_edit_is_alternative_not_reverted() {
        let error = AstError::new(ErrorKind::IncompatibleEdit, 0);
        let fallback = handle_edit_failure(&error);
        assert_eq!(fallback.status, FallbackStatus::Alternative);
    }

    #[test]
    fn structural_failure_with_attempted_content_carries_a_diff() {
        let error = AstError::new(
            ErrorKind::StructuralValidationFailed { score: 0.1, threshold: 0.7 },
            0,
        )
        .with_original_content("fn add(a, b) { a + b }")
        .with_attempted_content("fn add(a, b) { loop {} }");

        let fallback = handle_edit_failure(&error);
        let diff = fallback.diff.expect("diff should be present when both sides are known");
        assert!(diff.contains("-fn add(a, b) { a + b }"));
        assert!(diff.contains("+fn add(a, b) { loop {} }"));
    }

    #[test]
    fn node_not_found_carries_no_diff() {
        let error = AstError::new(ErrorKind::NodeNotFound { identifier: "missing:1".into() }, 0);
        assert!(handle_edit_failure(&error).diff.is_none());
    }

    #[test]
    fn recovery_is_capped_at_three_attempts_per_file() {
        let mut tracker = RecoveryTracker::new();
        let path = std::path::Path::new("/tmp/x.rs");
        let error = AstError::new(
            ErrorKind::StructuralValidationFailed { score: 0.1, threshold: 0.7 },
            0,
        )
        .with_original_content("original");

        for _ in 0..3 {
            assert!(tracker.attempt_recovery(path, &error).is_some());
        }
        assert!(tracker.attempt_recovery(path, &error).is_none());
    }

    #[test]
    fn recovery_is_noop_for_parse_and_node_errors() {
        let mut tracker = RecoveryTracker::new();
        let path = std::path::Path::new("/tmp/x.rs");
        let error = AstError::new(ErrorKind::ParseError { path: "x.rs".into() }, 0);
        assert!(tracker.attempt_recovery(path, &error).is_none());

        let error = AstError::new(ErrorKind::NodeNotFound { identifier: "x:1".into() }, 0);
        assert!(tracker.attempt_recovery(path, &error).is_none());
    }
}
