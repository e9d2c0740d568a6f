//! Engine-wide configuration (spec §6 "Configuration options").
//!
//! Mirrors the teacher's `get_config`/`update_config` façade pattern: one
//! struct with `Default`, plus a partial-update method so callers don't have
//! to reconstruct every field to change one knob.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    MemoryOnly,
    DiskAndMemory,
    MemoryWithDiskFallback,
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::MemoryOnly
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_api_key: Option<String>,
    pub max_backups_per_file: u32,
    pub semantic_threshold: f32,
    pub structural_threshold: f32,
    pub enable_cache: bool,
    pub cache_strategy: CacheStrategy,
    pub max_cache_entries: u32,
    pub max_memory_bytes: u64,
    pub stale_ttl_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            embedding_api_key: None,
            max_backups_per_file: 10,
            semantic_threshold: 0.82,
            structural_threshold: 0.7,
            enable_cache: true,
            cache_strategy: CacheStrategy::MemoryOnly,
            max_cache_entries: 100,
            max_memory_bytes: 200 * 1024 * 1024,
            stale_ttl_ms: 300_000,
        }
    }
}

/// A partial update: every field optional, `None` means "leave as-is".
/// Matches the façade's `update_config(partial)` operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfigPatch {
    pub embedding_api_key: Option<String>,
    pub max_backups_per_file: Option<u32>,
    pub semantic_threshold: Option<f32>,
    pub structural_threshold: Option<f32>,
    pub enable_cache: Option<bool>,
    pub cache_strategy: Option<CacheStrategy>,
    pub max_cache_entries: Option<u32>,
    pub max_memory_bytes: Option<u64>,
    pub stale_ttl_ms: Option<u64>,
}

impl EngineConfig {
    pub fn apply_patch(&mut self, patch: EngineConfigPatch) {
        if let Some(v) = patch.embedding_api_key {
            self.embedding_api_key = Some(v);
        }
        if let Some(v) = patch.max_backups_per_file {
            self.max_backups_per_file = v;
        }
        if let Some(v) = patch.semantic_threshold {
            self.semantic_threshold = v;
        }
        if let Some(v) = patch.structural_threshold {
            self.structural_threshold = v;
        }
        if let Some(v) = patch.enable_cache {
            self.enable_cache = v;
        }
        if let Some(v) = patch.cache_strategy {
            self.cache_strategy = v;
        }
        if let Some(v) = patch.max_cache_entries {
            self.max_cache_entries = v;
        }
        if let Some(v) = patch.max_memory_bytes {
            self.max_memory_bytes = v;
        }
        if let Some(v) = patch.stale_ttl_ms {
            self.stale_ttl_ms = v;
        }
    }
}
