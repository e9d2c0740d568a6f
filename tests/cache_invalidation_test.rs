//! External file modification driving cache invalidation through a full
//! reparse (spec §8 scenario 6), exercised at the `ParseService` level and
//! end-to-end through `EditOrchestrator`.

use std::fs;
use std::path::PathBuf;

use surgical_edit_core::cache::TreeCache;
use surgical_edit_core::config::EngineConfig;
use surgical_edit_core::filesystem::StdFileOperations;
use surgical_edit_core::languages::LanguageRegistry;
use surgical_edit_core::orchestrator::EditOrchestrator;
use surgical_edit_core::parser::ParseService;
use surgical_edit_core::rollback::RollbackStore;
use surgical_edit_core::symbols::SymbolIndex;
use tempfile::TempDir;

#[test]
fn parse_service_reparses_after_content_changes_underneath_the_cache() {
    let cache = TreeCache::with_defaults();
    let service = ParseService::new(LanguageRegistry::new(), cache.clone());
    let path = PathBuf::from("lib.rs");

    let original = "fn add(a: i32, b: i32) -> i32 { a + b }";
    let first = service.parse_file(&path, original).unwrap();
    assert!(first.error_locations.is_empty());
    assert_eq!(cache.len(), 1);

    let changed = "fn add(a: i32, b: i32) -> i32 { a - b }";
    let second = service.parse_file(&path, changed).unwrap();
    assert_eq!(second.source, changed);

    let root = second.tree.root_node();
    assert_eq!(root.utf8_text(changed.as_bytes()).unwrap(), changed);
}

#[test]
fn external_edit_between_two_modify_calls_is_picked_up_on_reparse() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("lib.rs");
    fs::write(&path, "fn add(a: i32, b: i32) -> i32 { a + b }").unwrap();

    let parser = ParseService::new(LanguageRegistry::new(), TreeCache::with_defaults());
    let orchestrator = EditOrchestrator::new(
        parser,
        SymbolIndex::new(),
        RollbackStore::with_default_depth(),
        EngineConfig::default(),
    );
    let fs_ops = StdFileOperations;

    orchestrator
        .modify_function_body(&fs_ops, &path, "add:1", "{ /* v1 */ a + b }", None)
        .unwrap();

    // Something else rewrites the file outside the engine's own write path.
    fs::write(&path, "fn add(a: i32, b: i32) -> i32 { /* external */ a + b }").unwrap();

    let result = orchestrator
        .modify_function_body(&fs_ops, &path, "add:1", "{ /* v2 */ a + b }", None)
        .unwrap();

    assert_eq!(result.semantic_score, 1.0);
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "fn add(a: i32, b: i32) -> i32 { /* v2 */ a + b }"
    );
}
