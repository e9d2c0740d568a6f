//! Rollback store (C7): per-file LIFO backup stacks the orchestrator snapshots
//! before every edit and pops from on failure, plus an all-or-nothing
//! multi-file variant for transactions spanning more than one file.
//!
//! Grounded on the teacher's `state.rs` (a `Mutex`-guarded `HashMap` behind a
//! small typed façade) and its `fieldwork`-derived accessor convention,
//! generalized from "current edit state per path" to "bounded backup history
//! per path".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use fieldwork::Fieldwork;
use serde::{Deserialize, Serialize};

use crate::error::{AstError, ErrorKind, Result};
use crate::filesystem::FileOperations;

const DEFAULT_MAX_DEPTH: usize = 10;

#[derive(Debug, Clone, Fieldwork, Serialize, Deserialize)]
#[fieldwork(get)]
pub struct EditBackup {
    pub relative_path: PathBuf,
    pub absolute_path: PathBuf,
    pub original_content: String,
    pub timestamp_ms: u64,
    pub operation_name: String,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

struct Inner {
    stacks: HashMap<PathBuf, Vec<EditBackup>>,
    max_depth: usize,
}

/// Bounded per-path LIFO backup history, shared by clone.
#[derive(Clone)]
pub struct RollbackStore {
    inner: Arc<Mutex<Inner>>,
}

impl RollbackStore {
    pub fn new(max_depth: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                stacks: HashMap::new(),
                max_depth,
            })),
        }
    }

    pub fn with_default_depth() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }

    pub fn set_max_depth(&self, max_depth: usize) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.max_depth = max_depth;
        for stack in inner.stacks.values_mut() {
            trim_to_depth(stack, max_depth);
        }
    }

    /// Push a backup for `absolute_path` before mutating it.
    pub fn snapshot(
        &self,
        relative_path: impl Into<PathBuf>,
        absolute_path: impl Into<PathBuf>,
        original_content: impl Into<String>,
        operation_name: impl Into<String>,
    ) -> EditBackup {
        let absolute_path = absolute_path.into();
        let backup = EditBackup {
            relative_path: relative_path.into(),
            absolute_path: absolute_path.clone(),
            original_content: original_content.into(),
            timestamp_ms: now_ms(),
            operation_name: operation_name.into(),
            metadata: serde_json::Map::new(),
        };

        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let max_depth = inner.max_depth;
        let stack = inner.stacks.entry(absolute_path).or_default();
        stack.push(backup.clone());
        trim_to_depth(stack, max_depth);

        backup
    }

    /// Pop the most recent backup for `absolute_path` and write its content
    /// back through `fs`.
    pub fn rollback(&self, absolute_path: &Path, fs: &dyn FileOperations) -> Result<EditBackup> {
        let backup = {
            let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            let stack = inner.stacks.get_mut(absolute_path).ok_or_else(|| {
                AstError::new(
                    ErrorKind::RollbackError {
                        path: absolute_path.display().to_string(),
                        message: "no backup recorded for this file".to_string(),
                    },
                    0,
                )
            })?;
            stack.pop().ok_or_else(|| {
                AstError::new(
                    ErrorKind::RollbackError {
                        path: absolute_path.display().to_string(),
                        message: "backup stack is empty".to_string(),
                    },
                    0,
                )
            })?
        };

        fs.write_file(absolute_path.to_path_buf(), backup.original_content.clone())
            .map_err(|e| {
                AstError::new(
                    ErrorKind::RollbackError {
                        path: absolute_path.display().to_string(),
                        message: e.to_string(),
                    },
                    0,
                )
            })?;

        Ok(backup)
    }

    pub fn peek(&self, absolute_path: &Path) -> Option<EditBackup> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.stacks.get(absolute_path).and_then(|s| s.last()).cloned()
    }

    pub fn backups(&self, absolute_path: &Path) -> Vec<EditBackup> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.stacks.get(absolute_path).cloned().unwrap_or_default()
    }

    pub fn has_backups(&self, absolute_path: &Path) -> bool {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.stacks.get(absolute_path).is_some_and(|s| !s.is_empty())
    }

    pub fn clear(&self, absolute_path: &Path) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.stacks.remove(absolute_path);
    }

    /// Snapshot several files as one transaction, always acquiring backup
    /// slots in sorted path order regardless of the order `files` is given
    /// in (spec §4.7).
    pub fn multi_file_snapshot(
        &self,
        files: &[(PathBuf, PathBuf, String)],
        operation_name: &str,
    ) -> Vec<EditBackup> {
        let mut ordered: Vec<&(PathBuf, PathBuf, String)> = files.iter().collect();
        ordered.sort_by(|a, b| a.1.cmp(&b.1));

        ordered
            .into_iter()
            .map(|(relative, absolute, content)| {
                self.snapshot(relative.clone(), absolute.clone(), content.clone(), operation_name)
            })
            .collect()
    }

    /// Roll back every path in `backups`, in reverse acquisition order.
    /// All-or-nothing: if any rollback fails, the remaining ones are still
    /// attempted and all errors are reported together, since a half-applied
    /// multi-file rollback would leave the transaction in a worse state than
    /// either outcome alone.
    pub fn multi_file_rollback(
        &self,
        backups: &[EditBackup],
        fs: &dyn FileOperations,
    ) -> Result<Vec<EditBackup>> {
        let mut reverted = Vec::new();
        let mut failures = Vec::new();

        for backup in backups.iter().rev() {
            match self.rollback(&backup.absolute_path, fs) {
                Ok(reverted_backup) => reverted.push(reverted_backup),
                Err(err) => failures.push(err),
            }
        }

        if let Some(first) = failures.into_iter().next() {
            return Err(first);
        }

        Ok(reverted)
    }
}

fn trim_to_depth(stack: &mut Vec<EditBackup>, max_depth: usize) {
    if stack.len() > max_depth {
        let excess = stack.len() - max_depth;
        stack.drain(0..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::TestFileOperations;

    #[test]
    fn rollback_restores_original_content() {
        let store = RollbackStore::with_default_depth();
        let fs = TestFileOperations::new();
        let path = PathBuf::from("/tmp/x.rs");
        fs.seed_file(&path, "fn add(a: i32, b: i32) -> i32 { a + b + 1 }");

        store.snapshot("x.rs", &path, "fn add(a: i32, b: i32) -> i32 { a + b }", "modify_function_body");
        let restored = store.rollback(&path, &fs).unwrap();

        assert_eq!(restored.original_content, "fn add(a: i32, b: i32) -> i32 { a + b }");
        assert_eq!(
            fs.get_last_write_content().as_deref(),
            Some("fn add(a: i32, b: i32) -> i32 { a + b }")
        );
    }

    #[test]
    fn rollback_with_no_backups_errors() {
        let store = RollbackStore::with_default_depth();
        let fs = TestFileOperations::new();
        let err = store.rollback(&PathBuf::from("/tmp/missing.rs"), &fs).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::RollbackError { .. }));
    }

    #[test]
    fn stack_depth_is_bounded() {
        let store = RollbackStore::new(3);
        let path = PathBuf::from("/tmp/x.rs");
        for i in 0..10 {
            store.snapshot("x.rs", &path, format!("version {i}"), "modify_function_body");
        }
        assert_eq!(store.backups(&path).len(), 3);
        assert_eq!(store.peek(&path).unwrap().original_content, "version 9");
    }

    #[test]
    fn multi_file_rollback_reverts_all_files_in_reverse_order() {
        let store = RollbackStore::with_default_depth();
        let fs = TestFileOperations::new();
        let a = PathBuf::from("/tmp/a.rs");
        let b = PathBuf::from("/tmp/b.rs");
        fs.seed_file(&a, "new a");
        fs.seed_file(&b, "new b");

        let backups = store.multi_file_snapshot(
            &[
                (PathBuf::from("a.rs"), a.clone(), "old a".to_string()),
                (PathBuf::from("b.rs"), b.clone(), "old b".to_string()),
            ],
            "modify_function_body",
        );

        store.multi_file_rollback(&backups, &fs).unwrap();

        assert_eq!(fs.read_file(&a).unwrap(), "old a");
        assert_eq!(fs.read_file(&b).unwrap(), "old b");
    }
}
