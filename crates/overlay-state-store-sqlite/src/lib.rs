// crates/overlay-state-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Metadata Store
// Description: Durable tracked-path metadata store using SQLite WAL.
// Purpose: Persist placeholder, modified-path, and include state per enlistment.
// Dependencies: overlay-state-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides the [`MetadataStore`] that owns an enlistment's SQLite
//! handle and disk layout version stamp, plus the typed path-set tables
//! handed out through [`TrackedPathTables`] once the stamp is current.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;
pub mod tables;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::DEFAULT_CACHE_SIZE_KIB;
pub use store::MetadataStore;
pub use store::SqliteStoreConfig;
pub use store::StoreError;
pub use tables::IncludedFoldersTable;
pub use tables::ModifiedPathsTable;
pub use tables::PathSetTable;
pub use tables::PlaceholdersTable;
pub use tables::TableRow;
pub use tables::TrackedPathTables;
