//! Tree cache (C2): file-path-keyed parsed-tree entries with hash
//! invalidation, TTL staleness, priority/memory-bounded eviction, and an
//! optional on-disk sidecar tier.
//!
//! Generalizes the teacher's `state.rs::StatsLruCache` (a plain `lru::LruCache`
//! wrapper with hit/miss counters) into the extended cache spec.md's open
//! question resolves on: priorities, memory accounting, and a disk tier.
//! `lru::LruCache` is kept as the backing store for its access-order
//! bookkeeping, with its own capacity set effectively unbounded — eviction is
//! driven entirely by the priority/age/access-count score below, not by LRU
//! recency alone, since the spec's eviction rule outranks plain recency.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lru::LruCache;
use serde::{Deserialize, Serialize};
use tree_sitter::Tree;

use crate::config::CacheStrategy;
use crate::error::{AstError, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    fn rank(self) -> i64 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

/// An in-memory cache entry (spec §3 `CacheEntry`). The tree is never shared
/// with a mutating caller while resident — `get` hands back a clone, and
/// tree-sitter trees are cheap, reference-counted clones internally.
#[derive(Clone)]
struct CacheEntry {
    tree: Tree,
    content: String,
    last_updated_ms: u64,
    last_accessed_ms: u64,
    content_hash: String,
    priority: Priority,
    access_count: u64,
    estimated_bytes: u64,
}

/// The on-disk sidecar shape (spec §6 "On-disk cache format"). Trees are not
/// portably serializable, so only content + metadata are stored; a disk hit
/// always requires the caller to reparse.
#[derive(Serialize, Deserialize)]
struct DiskEntry {
    content: String,
    #[serde(rename = "lastUpdated")]
    last_updated_ms: u64,
    #[serde(rename = "fileHash")]
    content_hash: String,
    priority: DiskPriority,
}

#[derive(Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum DiskPriority {
    High,
    Medium,
    Low,
}

impl From<Priority> for DiskPriority {
    fn from(p: Priority) -> Self {
        match p {
            Priority::High => DiskPriority::High,
            Priority::Medium => DiskPriority::Medium,
            Priority::Low => DiskPriority::Low,
        }
    }
}

impl From<DiskPriority> for Priority {
    fn from(p: DiskPriority) -> Self {
        match p {
            DiskPriority::High => Priority::High,
            DiskPriority::Medium => Priority::Medium,
            DiskPriority::Low => Priority::Low,
        }
    }
}

/// Content returned by a disk-tier lookup: the caller reparses it.
pub struct DiskHit {
    pub content: String,
    pub content_hash: String,
    pub priority: Priority,
}

pub struct TreeCacheConfig {
    pub max_entries: usize,
    pub max_memory_bytes: u64,
    pub stale_ttl: Duration,
    pub strategy: CacheStrategy,
}

impl Default for TreeCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 100,
            max_memory_bytes: 200 * 1024 * 1024,
            stale_ttl: Duration::from_millis(300_000),
            strategy: CacheStrategy::MemoryOnly,
        }
    }
}

struct Inner {
    entries: LruCache<PathBuf, CacheEntry>,
    enabled: bool,
    config: TreeCacheConfig,
}

/// The tree cache, a process-wide singleton handle shared by clone.
#[derive(Clone)]
pub struct TreeCache {
    inner: Arc<Mutex<Inner>>,
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

fn hash_content(content: &str) -> String {
    format!("{:x}", md5::compute(content.as_bytes()))
}

/// Where the on-disk sidecar tier lives: `SURGICAL_EDIT_CACHE_DIR` if set
/// (tilde-expanded, so `~/.cache/...` works from a shell-style config
/// value), otherwise the platform cache directory, otherwise a temp-dir
/// fallback if neither is available.
fn disk_cache_dir() -> PathBuf {
    if let Ok(configured) = std::env::var("SURGICAL_EDIT_CACHE_DIR") {
        return PathBuf::from(shellexpand::tilde(&configured).into_owned());
    }
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("roo-ast-cache")
}

fn disk_cache_path(path: &Path) -> PathBuf {
    let key = format!("{:x}", md5::compute(path.to_string_lossy().as_bytes()));
    disk_cache_dir().join(format!("{key}.json"))
}

impl TreeCache {
    pub fn new(config: TreeCacheConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::unbounded(),
                enabled: true,
                config,
            })),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TreeCacheConfig::default())
    }

    /// `get(path, current_content)`: staleness/hash-mismatch invalidate and
    /// miss; otherwise a hit bumps `last_accessed_ms`/`access_count` (spec
    /// §4.2). `current_content` is whatever the caller just read through its
    /// `FileOperations` — the cache never touches the real filesystem
    /// directly, so it works the same way against `TestFileOperations`'s
    /// in-memory files as against `StdFileOperations`.
    pub fn get(&self, path: &Path, current_content: &str) -> Option<Tree> {
        let mut inner = self.inner.lock().ok()?;
        if !inner.enabled {
            return None;
        }

        let ttl_ms = inner.config.stale_ttl.as_millis() as u64;
        let now = now_ms();

        let is_stale = match inner.entries.peek(path) {
            Some(entry) => now.saturating_sub(entry.last_updated_ms) > ttl_ms,
            None => return None,
        };
        if is_stale {
            inner.entries.pop(path);
            return None;
        }

        let hash_mismatch = match inner.entries.peek(path) {
            Some(entry) => hash_content(current_content) != entry.content_hash,
            None => return None,
        };
        if hash_mismatch {
            inner.entries.pop(path);
            return None;
        }

        let tree = {
            let entry = inner.entries.get_mut(path)?;
            entry.last_accessed_ms = now;
            entry.access_count += 1;
            entry.tree.clone()
        };
        Some(tree)
    }

    /// `put(path, tree, content, priority)` (spec §4.2).
    pub fn put(&self, path: PathBuf, tree: Tree, content: String, priority: Priority) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.enabled {
            return;
        }

        let now = now_ms();
        let content_hash = hash_content(&content);
        let estimated_bytes = (2 * content.len() + 3 * content.len()) as u64;

        if inner.config.strategy != CacheStrategy::MemoryOnly {
            write_disk_entry(&path, &content, content_hash.clone(), priority, now);
        }

        inner.entries.put(
            path,
            CacheEntry {
                tree,
                content,
                last_updated_ms: now,
                last_accessed_ms: now,
                content_hash,
                priority,
                access_count: 0,
                estimated_bytes,
            },
        );

        enforce_bounds(&mut inner);
    }

    pub fn invalidate(&self, path: &Path) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.pop(path);
        let _ = std::fs::remove_file(disk_cache_path(path));
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.entries.clear();
    }

    pub fn enable(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.enabled = true;
    }

    /// Disabling purges existing entries; while disabled, reads miss and
    /// writes are dropped (spec §4.2).
    pub fn disable(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.enabled = false;
        inner.entries.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.lock().map(|i| i.enabled).unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|i| i.entries.len()).unwrap_or(0)
    }

    /// Filesystem-watch hook: an external change to `path` invalidates it.
    pub fn on_file_changed(&self, path: &Path) {
        self.invalidate(path);
    }

    /// Disk-tier lookup used by the parse service on a memory miss when the
    /// configured strategy includes disk I/O. Never returns a tree, and
    /// never reads the original source file — `current_content` (read by
    /// the caller through its `FileOperations`) is hashed against the
    /// sidecar's recorded hash to decide whether the sidecar is still fresh.
    pub fn disk_get(&self, path: &Path, current_content: &str) -> Option<DiskHit> {
        let strategy = self
            .inner
            .lock()
            .map(|i| i.config.strategy)
            .unwrap_or(CacheStrategy::MemoryOnly);
        if strategy == CacheStrategy::MemoryOnly {
            return None;
        }

        let raw = std::fs::read_to_string(disk_cache_path(path)).ok()?;
        let entry: DiskEntry = serde_json::from_str(&raw).ok()?;

        let ttl_ms = self
            .inner
            .lock()
            .map(|i| i.config.stale_ttl.as_millis() as u64)
            .unwrap_or(300_000);
        if now_ms().saturating_sub(entry.last_updated_ms) > ttl_ms {
            return None;
        }

        if hash_content(current_content) != entry.content_hash {
            return None;
        }

        Some(DiskHit {
            content: entry.content,
            content_hash: entry.content_hash,
            priority: entry.priority.into(),
        })
    }

    /// Background sweep (spec §4.2): remove entries older than the TTL.
    /// Exposed as a plain method so callers can drive it from a timer
    /// thread without this struct owning its own scheduling.
    pub fn sweep_stale(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let ttl_ms = inner.config.stale_ttl.as_millis() as u64;
        let now = now_ms();
        let stale: Vec<PathBuf> = inner
            .entries
            .iter()
            .filter(|(_, entry)| now.saturating_sub(entry.last_updated_ms) > ttl_ms)
            .map(|(path, _)| path.clone())
            .collect();
        for path in stale {
            inner.entries.pop(&path);
        }
    }

    /// Spawn a detached background thread running `sweep_stale` every 10
    /// minutes, holding only a weak reference so the thread exits once every
    /// other handle to this cache is dropped.
    pub fn spawn_background_sweep(&self) {
        let weak = Arc::downgrade(&self.inner);
        std::thread::spawn(move || loop {
            std::thread::sleep(Duration::from_secs(600));
            match weak.upgrade() {
                Some(inner) => {
                    let mut guard = match inner.lock() {
                        Ok(g) => g,
                        Err(e) => e.into_inner(),
                    };
                    let ttl_ms = guard.config.stale_ttl.as_millis() as u64;
                    let now = now_ms();
                    let stale: Vec<PathBuf> = guard
                        .entries
                        .iter()
                        .filter(|(_, entry)| now.saturating_sub(entry.last_updated_ms) > ttl_ms)
                        .map(|(path, _)| path.clone())
                        .collect();
                    for path in stale {
                        guard.entries.pop(&path);
                    }
                }
                None => return,
            }
        });
    }
}

fn write_disk_entry(
    path: &Path,
    content: &str,
    content_hash: String,
    priority: Priority,
    now: u64,
) {
    let dir = disk_cache_dir();
    if std::fs::create_dir_all(&dir).is_err() {
        return;
    }
    let entry = DiskEntry {
        content: content.to_string(),
        last_updated_ms: now,
        content_hash,
        priority: priority.into(),
    };
    if let Ok(json) = serde_json::to_string(&entry) {
        let _ = std::fs::write(disk_cache_path(path), json);
    }
}

fn enforce_bounds(inner: &mut Inner) {
    let max_entries = inner.config.max_entries;
    let max_bytes = inner.config.max_memory_bytes;

    loop {
        let total_bytes: u64 = inner.entries.iter().map(|(_, e)| e.estimated_bytes).sum();
        let over_capacity = inner.entries.len() > max_entries;
        let over_memory = total_bytes > max_bytes;
        if !over_capacity && !over_memory {
            break;
        }

        let now = now_ms();
        let ttl_ms = inner.config.stale_ttl.as_millis().max(1) as u64;
        let worst = inner
            .entries
            .iter()
            .map(|(path, entry)| {
                let age_ratio = now.saturating_sub(entry.last_updated_ms) as f64 / ttl_ms as f64;
                let access_term = 1.0 / ((entry.access_count as f64 + 1.0).ln() + f64::EPSILON);
                let score = entry.priority.rank() as f64 - age_ratio - access_term;
                (path.clone(), score)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(path, _)| path);

        match worst {
            Some(path) => {
                inner.entries.pop(&path);
            }
            None => break,
        }
    }
}

/// Tracks per-run recovery attempts; kept separate from the cache config so
/// `TreeCache` stays `Clone` without dragging a mutex-guarded counter along.
pub fn cache_error(message: impl Into<String>) -> AstError {
    AstError::new(
        ErrorKind::CacheError {
            message: message.into(),
        },
        now_ms(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    fn parse_rust(source: &str) -> Tree {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        parser.parse(source, None).unwrap()
    }

    #[test]
    fn put_then_get_returns_same_tree() {
        let path = PathBuf::from("x.rs");
        let content = "fn add(a: i32, b: i32) -> i32 { a + b }";

        let cache = TreeCache::with_defaults();
        cache.put(path.clone(), parse_rust(content), content.to_string(), Priority::Medium);

        assert!(cache.get(&path, content).is_some());
    }

    #[test]
    fn invalidate_clears_entry() {
        let path = PathBuf::from("x.rs");
        let content = "fn add(a: i32, b: i32) -> i32 { a + b }";

        let cache = TreeCache::with_defaults();
        cache.put(path.clone(), parse_rust(content), content.to_string(), Priority::Medium);
        cache.invalidate(&path);

        assert!(cache.get(&path, content).is_none());
    }

    #[test]
    fn external_modification_invalidates_on_next_get() {
        let path = PathBuf::from("x.rs");
        let content = "fn add(a: i32, b: i32) -> i32 { a + b }";

        let cache = TreeCache::with_defaults();
        cache.put(path.clone(), parse_rust(content), content.to_string(), Priority::Medium);
        assert!(cache.get(&path, content).is_some());

        let changed = "fn add(a: i32, b: i32) -> i32 { a - b }";
        assert!(cache.get(&path, changed).is_none());
    }

    #[test]
    fn disabled_cache_misses_on_read_and_drops_writes() {
        let path = PathBuf::from("x.rs");
        let content = "fn add(a: i32, b: i32) -> i32 { a + b }";

        let cache = TreeCache::with_defaults();
        cache.disable();
        cache.put(path.clone(), parse_rust(content), content.to_string(), Priority::Medium);
        assert!(cache.get(&path, content).is_none());

        cache.enable();
        assert!(cache.get(&path, content).is_none());
    }

    #[test]
    fn capacity_eviction_keeps_size_bounded() {
        let cache = TreeCache::new(TreeCacheConfig {
            max_entries: 2,
            ..TreeCacheConfig::default()
        });

        for i in 0..5 {
            let path = PathBuf::from(format!("f{i}.rs"));
            let content = format!("fn f{i}() {{}}");
            cache.put(path, parse_rust(&content), content, Priority::Low);
        }

        assert!(cache.len() <= 2);
    }

    #[test]
    fn high_priority_entries_survive_low_priority_eviction() {
        let cache = TreeCache::new(TreeCacheConfig {
            max_entries: 1,
            ..TreeCacheConfig::default()
        });

        let important = PathBuf::from("important.rs");
        cache.put(
            important.clone(),
            parse_rust("fn important() {}"),
            "fn important() {}".to_string(),
            Priority::High,
        );

        let disposable = PathBuf::from("disposable.rs");
        cache.put(
            disposable,
            parse_rust("fn disposable() {}"),
            "fn disposable() {}".to_string(),
            Priority::Low,
        );

        assert!(cache.get(&important, "fn important() {}").is_some());
    }
}
