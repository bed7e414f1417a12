// crates/overlay-state-store-sqlite/tests/tracked_path_tables.rs
// ============================================================================
// Module: Tracked Path Table Tests
// Description: Validate set-membership semantics of the path tables.
// Purpose: Ensure add/remove are idempotent and rows persist across reopen.
// Dependencies: overlay-state-core, overlay-state-store-sqlite, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Exercises add, remove, scans, point lookups, marker upserts, shared
//! handles, and corrupt-row detection.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use std::path::Path;
use std::thread;

use overlay_state_core::CURRENT_SCHEMA_VERSION;
use overlay_state_core::ContentMarker;
use overlay_state_core::IncludedFolder;
use overlay_state_core::ModifiedPathEntry;
use overlay_state_core::NoopTracer;
use overlay_state_core::PathKind;
use overlay_state_core::PhysicalFileSystem;
use overlay_state_core::PlaceholderEntry;
use overlay_state_core::TrackedPath;
use overlay_state_store_sqlite::MetadataStore;
use overlay_state_store_sqlite::SqliteStoreConfig;
use overlay_state_store_sqlite::StoreError;
use rusqlite::Connection;
use tempfile::TempDir;

fn current_store(path: &Path) -> MetadataStore {
    let store =
        MetadataStore::open(&SqliteStoreConfig::new(path), &PhysicalFileSystem, &NoopTracer)
            .unwrap();
    store.set_version(CURRENT_SCHEMA_VERSION).unwrap();
    store
}

fn tracked(raw: &str) -> TrackedPath {
    TrackedPath::parse(raw).unwrap()
}

fn placeholder(path: &str, marker: &str) -> PlaceholderEntry {
    PlaceholderEntry::new(tracked(path), ContentMarker::parse(marker).unwrap())
}

#[test]
fn add_twice_leaves_one_entry() {
    let temp = TempDir::new().unwrap();
    let store = current_store(&temp.path().join("store.sqlite"));
    let tables = store.tables().unwrap();
    let modified = tables.modified_paths();
    let entry = ModifiedPathEntry::new(tracked("src/main.rs"), PathKind::File);
    assert!(modified.add(&entry).unwrap());
    assert!(!modified.add(&entry).unwrap());
    assert_eq!(modified.get_all().unwrap(), vec![entry]);
    assert_eq!(modified.count().unwrap(), 1);
}

#[test]
fn re_add_keeps_the_first_marker() {
    let temp = TempDir::new().unwrap();
    let store = current_store(&temp.path().join("store.sqlite"));
    let placeholders = store.tables().unwrap().placeholders();
    placeholders.add(&placeholder("a.txt", "deadbeef")).unwrap();
    placeholders.add(&placeholder("a.txt", "cafebabe")).unwrap();
    let stored = placeholders.get(&tracked("a.txt")).unwrap();
    assert_eq!(stored, Some(placeholder("a.txt", "deadbeef")));
}

#[test]
fn remove_of_absent_path_is_a_no_op() {
    let temp = TempDir::new().unwrap();
    let store = current_store(&temp.path().join("store.sqlite"));
    let included = store.tables().unwrap().included_folders();
    included.add(&IncludedFolder::new(tracked("docs"))).unwrap();
    assert!(!included.remove(&tracked("missing")).unwrap());
    assert!(included.remove(&tracked("docs")).unwrap());
    assert!(!included.remove(&tracked("docs")).unwrap());
    assert!(included.get_all().unwrap().is_empty());
}

#[test]
fn get_all_is_ordered_by_path_and_case_sensitive() {
    let temp = TempDir::new().unwrap();
    let store = current_store(&temp.path().join("store.sqlite"));
    let included = store.tables().unwrap().included_folders();
    for raw in ["src/b", "Src", "src/a", "src"] {
        included.add(&IncludedFolder::new(tracked(raw))).unwrap();
    }
    let paths: Vec<String> =
        included.get_all().unwrap().into_iter().map(|folder| folder.path.to_string()).collect();
    assert_eq!(paths, vec!["Src", "src", "src/a", "src/b"]);
    assert!(included.contains(&tracked("Src")).unwrap());
    assert!(!included.contains(&tracked("SRC")).unwrap());
}

#[test]
fn set_marker_inserts_or_replaces() {
    let temp = TempDir::new().unwrap();
    let store = current_store(&temp.path().join("store.sqlite"));
    let placeholders = store.tables().unwrap().placeholders();
    let path = tracked("dir");
    placeholders.set_marker(&path, &ContentMarker::AllZero).unwrap();
    placeholders.set_marker(&path, &ContentMarker::PartialFolder).unwrap();
    let entry = placeholders.get(&path).unwrap().unwrap();
    assert_eq!(entry.marker, ContentMarker::PartialFolder);
    assert_eq!(placeholders.count().unwrap(), 1);
}

#[test]
fn entries_persist_across_reopen() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    {
        let store = current_store(&path);
        let tables = store.tables().unwrap();
        tables
            .modified_paths()
            .add(&ModifiedPathEntry::new(tracked("lib"), PathKind::Folder))
            .unwrap();
        tables.placeholders().add(&placeholder("lib/mod.rs", "0123abcd")).unwrap();
    }
    let store =
        MetadataStore::open(&SqliteStoreConfig::new(&path), &PhysicalFileSystem, &NoopTracer)
            .unwrap();
    let tables = store.tables().unwrap();
    let modified = tables.modified_paths().get(&tracked("lib")).unwrap().unwrap();
    assert_eq!(modified.kind, PathKind::Folder);
    assert!(tables.placeholders().contains(&tracked("lib/mod.rs")).unwrap());
}

#[test]
fn clones_share_one_handle_across_threads() {
    let temp = TempDir::new().unwrap();
    let store = current_store(&temp.path().join("store.sqlite"));
    let workers: Vec<_> = (0 .. 4)
        .map(|worker| {
            let store = store.clone();
            thread::spawn(move || {
                let included = store.tables().unwrap().included_folders();
                for index in 0 .. 25 {
                    let folder = IncludedFolder::new(tracked(&format!("w{worker}/f{index}")));
                    included.add(&folder).unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(store.tables().unwrap().included_folders().count().unwrap(), 100);
}

#[test]
fn undecodable_rows_surface_as_corruption() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    drop(current_store(&path));
    {
        let raw = Connection::open(&path).unwrap();
        raw.execute(
            "INSERT INTO placeholders (path, content_marker) VALUES ('a/../b', 'deadbeef')",
            [],
        )
        .unwrap();
    }
    let store =
        MetadataStore::open(&SqliteStoreConfig::new(&path), &PhysicalFileSystem, &NoopTracer)
            .unwrap();
    let placeholders = store.tables().unwrap().placeholders();
    assert!(matches!(placeholders.get_all(), Err(StoreError::Corrupt(_))));
    assert_eq!(placeholders.count().unwrap(), 1);
}

#[test]
fn engine_failures_under_a_live_handle_surface_as_access_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = current_store(&path);
    let tables = store.tables().unwrap();
    let included = tables.included_folders();
    included.add(&IncludedFolder::new(tracked("src"))).unwrap();

    let raw = Connection::open(&path).unwrap();
    raw.execute_batch("DROP TABLE included_folders;").unwrap();
    drop(raw);

    let folder = IncludedFolder::new(tracked("docs"));
    assert!(matches!(included.add(&folder), Err(StoreError::Access(_))));
    assert!(matches!(included.remove(&tracked("src")), Err(StoreError::Access(_))));
    assert!(matches!(included.get_all(), Err(StoreError::Access(_))));
    assert!(matches!(included.contains(&tracked("src")), Err(StoreError::Access(_))));
    assert!(matches!(included.count(), Err(StoreError::Access(_))));
}

#[test]
fn constraint_failures_surface_as_access_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = current_store(&path);
    let placeholders = store.tables().unwrap().placeholders();

    let raw = Connection::open(&path).unwrap();
    raw.execute_batch(
        "CREATE TRIGGER reject_placeholders BEFORE INSERT ON placeholders
         BEGIN SELECT RAISE(ABORT, 'placeholder rejected'); END;",
    )
    .unwrap();
    drop(raw);

    let entry = placeholder("a.txt", "deadbeef");
    match placeholders.add(&entry) {
        Err(StoreError::Access(message)) => assert!(message.contains("placeholder rejected")),
        other => panic!("expected access error, got {}", other.is_ok()),
    }
    assert!(matches!(
        placeholders.set_marker(&entry.path, &entry.marker),
        Err(StoreError::Access(_))
    ));
    assert_eq!(placeholders.count().unwrap(), 0);
}

#[test]
fn import_placeholders_upserts_in_one_transaction() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path().join("store.sqlite"));
    let store = MetadataStore::open(&config, &PhysicalFileSystem, &NoopTracer).unwrap();
    let entries = vec![placeholder("a", "deadbeef"), placeholder("b", "0000")];
    assert_eq!(store.import_placeholders(&entries).unwrap(), 2);
    assert_eq!(store.import_placeholders(&entries).unwrap(), 2);
    store.set_version(CURRENT_SCHEMA_VERSION).unwrap();
    assert_eq!(store.tables().unwrap().placeholders().get_all().unwrap(), entries);
}
