//! Multi-file rollback transactions (spec §4.7, §8 scenario 7) and the
//! per-path lease ordering transactions rely on (spec §5).

use std::fs;
use std::path::PathBuf;

use surgical_edit_core::filesystem::StdFileOperations;
use surgical_edit_core::leases::PathLeases;
use surgical_edit_core::rollback::RollbackStore;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn multi_file_snapshot_then_rollback_restores_every_file() {
    let dir = TempDir::new().unwrap();
    let a = write_file(&dir, "a.rs", "fn a() -> i32 { 1 }");
    let b = write_file(&dir, "b.rs", "fn b() -> i32 { 2 }");
    let c = write_file(&dir, "c.rs", "fn c() -> i32 { 3 }");

    let store = RollbackStore::with_default_depth();
    let fs_ops = StdFileOperations;

    let originals: Vec<(PathBuf, PathBuf, String)> = [&a, &b, &c]
        .iter()
        .map(|p| {
            (
                PathBuf::from(p.file_name().unwrap()),
                (*p).clone(),
                fs::read_to_string(p).unwrap(),
            )
        })
        .collect();
    let backups = store.multi_file_snapshot(&originals, "refactor");

    fs::write(&a, "fn a() -> i32 { 100 }").unwrap();
    fs::write(&b, "fn b() -> i32 { 200 }").unwrap();
    fs::write(&c, "fn c() -> i32 { 300 }").unwrap();

    store.multi_file_rollback(&backups, &fs_ops).unwrap();

    assert_eq!(fs::read_to_string(&a).unwrap(), "fn a() -> i32 { 1 }");
    assert_eq!(fs::read_to_string(&b).unwrap(), "fn b() -> i32 { 2 }");
    assert_eq!(fs::read_to_string(&c).unwrap(), "fn c() -> i32 { 3 }");
}

#[test]
fn leases_for_overlapping_path_sets_do_not_deadlock() {
    // Both threads lease the same two paths in opposite order. `with_leases`
    // sorts its path set before acquiring, so they end up contending for the
    // same lock in the same order regardless of which order the caller
    // listed them in; a `start` barrier lines the threads up right before
    // that contention so the overlap is exercised instead of hoping for a
    // lucky interleaving. Nothing synchronizes *inside* the leased region —
    // that would just be re-introducing the deadlock this test rules out.
    use std::sync::{Arc, Barrier};
    use std::thread;

    let leases = PathLeases::new();
    let start = Arc::new(Barrier::new(2));

    let paths_1 = vec![PathBuf::from("/tmp/a.rs"), PathBuf::from("/tmp/b.rs")];
    let paths_2 = vec![PathBuf::from("/tmp/b.rs"), PathBuf::from("/tmp/a.rs")];

    let t1 = {
        let leases = leases.clone();
        let start = start.clone();
        thread::spawn(move || {
            start.wait();
            leases.with_leases(&paths_1, || {});
        })
    };
    let t2 = {
        let leases = leases.clone();
        let start = start.clone();
        thread::spawn(move || {
            start.wait();
            leases.with_leases(&paths_2, || {});
        })
    };

    t1.join().unwrap();
    t2.join().unwrap();
}
