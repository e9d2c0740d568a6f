//! # Filesystem Operations
//!
//! This module provides an abstraction layer for filesystem operations,
//! enabling dependency injection for testing and different deployment scenarios.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Error type for TestFileOperations safe methods
#[derive(Debug)]
pub enum TestFileOperationsError {
    MutexPoisoned,
}

impl<T> From<PoisonError<T>> for TestFileOperationsError {
    fn from(_: PoisonError<T>) -> Self {
        TestFileOperationsError::MutexPoisoned
    }
}

/// Abstraction for file system operations
///
/// This trait allows injecting different file system implementations
/// for production vs testing scenarios, following the dependency inversion principle.
/// The rollback store and edit orchestrator both read through this trait
/// before writing, so a single seam covers both sides of a transaction.
pub trait FileOperations: Send + Sync {
    /// Read the full contents of a file at the given path.
    fn read_file(&self, path: &std::path::Path) -> Result<String>;

    /// Write content to a file at the given path
    fn write_file(&self, path: PathBuf, content: String) -> Result<()>;
}

/// Standard filesystem operations using std::fs
///
/// This is the production implementation that writes to the actual filesystem.
#[derive(Debug, Default)]
pub struct StdFileOperations;

impl FileOperations for StdFileOperations {
    fn read_file(&self, path: &std::path::Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(Into::into)
    }

    fn write_file(&self, path: PathBuf, content: String) -> Result<()> {
        std::fs::write(path, content).map_err(Into::into)
    }
}

/// Test filesystem operations that capture writes in memory
///
/// This implementation captures all write operations for testing purposes,
/// allowing tests to verify what would be written without side effects. Seed
/// it with `seed_file` so reads (snapshot, reparse-before-write) resolve
/// without touching the real filesystem.
#[derive(Debug, Default, Clone)]
pub struct TestFileOperations {
    captured_writes: Arc<Mutex<Vec<(PathBuf, String)>>>,
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
}

impl TestFileOperations {
    /// Create a new test file operations instance
    pub fn new() -> Self {
        Self {
            captured_writes: Arc::new(Mutex::new(Vec::new())),
            files: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Seed in-memory content for a path so `read_file` resolves it.
    pub fn seed_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .lock()
            .expect("Mutex not poisoned")
            .insert(path.into(), content.into());
    }

    /// Get all captured write operations
    pub fn get_captured_writes(&self) -> Vec<(PathBuf, String)> {
        self.captured_writes
            .lock()
            .expect("Mutex not poisoned")
            .clone()
    }

    /// Get the content of the last write operation, if any
    pub fn get_last_write_content(&self) -> Option<String> {
        self.captured_writes
            .lock()
            .expect("Mutex not poisoned")
            .last()
            .map(|(_, content)| content.clone())
    }

    /// Clear all captured writes
    pub fn clear_captures(&self) {
        self.captured_writes
            .lock()
            .expect("Mutex not poisoned")
            .clear();
    }

    /// Get the number of captured writes
    pub fn write_count(&self) -> usize {
        self.captured_writes
            .lock()
            .expect("Mutex not poisoned")
            .len()
    }

    /// Safe version of get_captured_writes that handles mutex poisoning
    pub fn get_captured_writes_safe(
        &self,
    ) -> Result<Vec<(PathBuf, String)>, TestFileOperationsError> {
        match self.captured_writes.lock() {
            Ok(guard) => Ok(guard.clone()),
            Err(poison_error) => Err(poison_error.into()),
        }
    }

    /// Safe version of get_last_write_content that handles mutex poisoning
    pub fn get_last_write_content_safe(&self) -> Result<Option<String>, TestFileOperationsError> {
        match self.captured_writes.lock() {
            Ok(guard) => Ok(guard.last().map(|(_, content)| content.clone())),
            Err(poison_error) => Err(poison_error.into()),
        }
    }

    /// Safe version of clear_captures that handles mutex poisoning
    pub fn clear_captures_safe(&self) -> Result<(), TestFileOperationsError> {
        match self.captured_writes.lock() {
            Ok(mut guard) => {
                guard.clear();
                Ok(())
            }
            Err(poison_error) => Err(poison_error.into()),
        }
    }

    /// Safe version of write_count that handles mutex poisoning
    pub fn write_count_safe(&self) -> Result<usize, TestFileOperationsError> {
        match self.captured_writes.lock() {
            Ok(guard) => Ok(guard.len()),
            Err(poison_error) => Err(poison_error.into()),
        }
    }
}

impl FileOperations for TestFileOperations {
    fn read_file(&self, path: &std::path::Path) -> Result<String> {
        self.files
            .lock()
            .expect("Mutex not poisoned")
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no seeded content for {}", path.display()))
    }

    fn write_file(&self, path: PathBuf, content: String) -> Result<()> {
        self.files
            .lock()
            .expect("Mutex not poisoned")
            .insert(path.clone(), content.clone());
        self.captured_writes
            .lock()
            .expect("Mutex not poisoned")
            .push((path, content));
        Ok(())
    }
}

// Implement FileOperations for Arc<T> to support shared ownership in tests
impl<T: FileOperations + ?Sized> FileOperations for std::sync::Arc<T> {
    fn read_file(&self, path: &std::path::Path) -> Result<String> {
        (**self).read_file(path)
    }

    fn write_file(&self, path: PathBuf, content: String) -> Result<()> {
        (**self).write_file(path, content)
    }
}
