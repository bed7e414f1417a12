// crates/overlay-state-store-sqlite/tests/store_lifecycle.rs
// ============================================================================
// Module: Metadata Store Lifecycle Tests
// Description: Validate bootstrap, pragmas, version stamping, and gating.
// Purpose: Ensure the store is durable and only usable at the current version.
// Dependencies: overlay-state-core, overlay-state-store-sqlite, rusqlite, tempfile
// ============================================================================

//! ## Overview
//! Covers first creation versus reopen, durability pragmas, version stamp
//! monotonicity, and the table-access gate.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use overlay_state_core::BASELINE_SCHEMA_VERSION;
use overlay_state_core::CURRENT_SCHEMA_VERSION;
use overlay_state_core::MemoryTracer;
use overlay_state_core::NoopTracer;
use overlay_state_core::PhysicalFileSystem;
use overlay_state_store_sqlite::MetadataStore;
use overlay_state_store_sqlite::SqliteStoreConfig;
use overlay_state_store_sqlite::StoreError;
use rusqlite::Connection;
use tempfile::TempDir;

fn open(config: &SqliteStoreConfig) -> MetadataStore {
    MetadataStore::open(config, &PhysicalFileSystem, &NoopTracer).unwrap()
}

#[test]
fn first_open_creates_directory_and_stamps_baseline() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".gvfs").join("databases").join("VFSForGit.sqlite");
    let config = SqliteStoreConfig::new(&path);
    let tracer = MemoryTracer::new();
    let store = MetadataStore::open(&config, &PhysicalFileSystem, &tracer).unwrap();
    assert!(store.was_created());
    assert!(path.is_file());
    assert_eq!(store.version().unwrap(), BASELINE_SCHEMA_VERSION);
    assert_eq!(tracer.events_named("metadata_store_created").len(), 1);
}

#[test]
fn first_open_enables_wal_and_every_open_applies_full_sync() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let config = SqliteStoreConfig::new(&path);
    drop(open(&config));

    let raw = Connection::open(&path).unwrap();
    let journal: String = raw.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
    assert_eq!(journal, "wal");
    drop(raw);

    let store = open(&config);
    assert!(!store.was_created());
    assert_eq!(store.version().unwrap(), BASELINE_SCHEMA_VERSION);
}

#[test]
fn reopen_switches_a_rollback_journal_store_back_to_wal() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let raw = Connection::open(&path).unwrap();
    raw.execute_batch("PRAGMA journal_mode = delete; PRAGMA user_version = 17;").unwrap();
    drop(raw);

    let store = open(&SqliteStoreConfig::new(&path));
    assert!(!store.was_created());
    assert_eq!(store.version().unwrap(), 17);
    drop(store);

    let raw = Connection::open(&path).unwrap();
    let journal: String = raw.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
    assert_eq!(journal, "wal");
}

#[test]
fn reopen_never_resets_a_higher_stamp() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path().join("store.sqlite"));
    let store = open(&config);
    store.set_version(18).unwrap();
    drop(store);

    let tracer = MemoryTracer::new();
    let reopened = MetadataStore::open(&config, &PhysicalFileSystem, &tracer).unwrap();
    assert!(!reopened.was_created());
    assert_eq!(reopened.version().unwrap(), 18);
    assert!(tracer.events_named("metadata_store_created").is_empty());
}

#[test]
fn set_version_rejects_decrease_and_non_positive_values() {
    let temp = TempDir::new().unwrap();
    let store = open(&SqliteStoreConfig::new(temp.path().join("store.sqlite")));
    store.set_version(17).unwrap();
    store.set_version(17).unwrap();
    assert!(matches!(store.set_version(16), Err(StoreError::Invalid(_))));
    assert!(matches!(store.set_version(0), Err(StoreError::Invalid(_))));
    assert!(matches!(store.set_version(-3), Err(StoreError::Invalid(_))));
    assert_eq!(store.version().unwrap(), 17);
}

#[test]
fn tables_are_gated_until_current_version() {
    let temp = TempDir::new().unwrap();
    let store = open(&SqliteStoreConfig::new(temp.path().join("store.sqlite")));
    assert!(matches!(store.tables(), Err(StoreError::VersionMismatch(_))));
    store.set_version(CURRENT_SCHEMA_VERSION).unwrap();
    assert!(store.tables().is_ok());
}

#[test]
fn ensure_tables_creates_every_path_set_table() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("store.sqlite");
    let store = open(&SqliteStoreConfig::new(&path));
    store.ensure_tables().unwrap();
    drop(store);

    let raw = Connection::open(&path).unwrap();
    let mut statement =
        raw.prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name").unwrap();
    let names: Vec<String> =
        statement.query_map([], |row| row.get(0)).unwrap().map(Result::unwrap).collect();
    assert_eq!(names, vec!["included_folders", "modified_paths", "placeholders"]);
}

#[test]
fn directory_store_path_is_rejected() {
    let temp = TempDir::new().unwrap();
    let config = SqliteStoreConfig::new(temp.path());
    let result = MetadataStore::open(&config, &PhysicalFileSystem, &NoopTracer);
    assert!(matches!(result, Err(StoreError::Invalid(_))));
}

#[test]
fn unusable_parent_directory_is_a_configuration_error() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("blocker");
    std::fs::write(&blocker, b"not a directory").unwrap();
    let config = SqliteStoreConfig::new(blocker.join("databases").join("store.sqlite"));
    let result = MetadataStore::open(&config, &PhysicalFileSystem, &NoopTracer);
    assert!(matches!(result, Err(StoreError::Configuration(_))));
}
