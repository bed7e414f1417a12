// crates/overlay-state-store-sqlite/src/tables.rs
// ============================================================================
// Module: Tracked Path Tables
// Description: Typed set-membership access to the modified, placeholder, and
//              included-folder tables.
// Purpose: Keep SQL and row decoding behind typed entries at the table edge.
// Dependencies: overlay-state-core, rusqlite
// ============================================================================

//! ## Overview
//! Every table is a set keyed by [`TrackedPath`]. [`PathSetTable`] provides
//! the shared operations once, parameterized by a [`TableRow`] that knows its
//! table name, column list, and how to encode and decode one row.
//!
//! Each call runs as a single statement. Engine failures surface as
//! [`StoreError::Access`]; rows that no longer decode surface as
//! [`StoreError::Corrupt`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::marker::PhantomData;

use overlay_state_core::ContentMarker;
use overlay_state_core::EntryError;
use overlay_state_core::IncludedFolder;
use overlay_state_core::ModifiedPathEntry;
use overlay_state_core::PathKind;
use overlay_state_core::PlaceholderEntry;
use overlay_state_core::TrackedPath;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::store::MetadataStore;
use crate::store::StoreError;

// ============================================================================
// SECTION: SQL
// ============================================================================

/// Inserts or replaces the content marker for one placeholder path.
pub(crate) const UPSERT_PLACEHOLDER_SQL: &str = "INSERT INTO placeholders (path, content_marker) \
                                                 VALUES (?1, ?2) ON CONFLICT(path) DO UPDATE SET \
                                                 content_marker = excluded.content_marker";

// ============================================================================
// SECTION: Row Trait
// ============================================================================

/// A typed entry stored as one row of a path-keyed table.
pub trait TableRow: Sized {
    /// Table name.
    const TABLE: &'static str;
    /// Comma-separated column list, `path` first.
    const COLUMNS: &'static str;
    /// Undecoded column values as read from the engine.
    type Raw;

    /// Reads the raw column values from a row selected with [`Self::COLUMNS`].
    ///
    /// # Errors
    ///
    /// Returns an engine error when a column has an unexpected storage type.
    fn read_raw(row: &Row<'_>) -> rusqlite::Result<Self::Raw>;

    /// Validates raw column values into a typed entry.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError`] when a stored value is no longer valid.
    fn decode(raw: Self::Raw) -> Result<Self, EntryError>;

    /// Returns the key of this entry.
    fn path(&self) -> &TrackedPath;

    /// Inserts this entry unless its path is already present.
    ///
    /// # Errors
    ///
    /// Returns an engine error when the statement fails.
    fn insert_or_ignore(&self, connection: &Connection) -> rusqlite::Result<usize>;
}

impl TableRow for ModifiedPathEntry {
    const TABLE: &'static str = "modified_paths";
    const COLUMNS: &'static str = "path, kind";
    type Raw = (String, i64);

    fn read_raw(row: &Row<'_>) -> rusqlite::Result<Self::Raw> {
        Ok((row.get(0)?, row.get(1)?))
    }

    fn decode(raw: Self::Raw) -> Result<Self, EntryError> {
        let (path, kind) = raw;
        Ok(Self::new(TrackedPath::parse(&path)?, PathKind::from_code(kind)?))
    }

    fn path(&self) -> &TrackedPath {
        &self.path
    }

    fn insert_or_ignore(&self, connection: &Connection) -> rusqlite::Result<usize> {
        connection.execute(
            "INSERT OR IGNORE INTO modified_paths (path, kind) VALUES (?1, ?2)",
            params![self.path.as_str(), self.kind.code()],
        )
    }
}

impl TableRow for PlaceholderEntry {
    const TABLE: &'static str = "placeholders";
    const COLUMNS: &'static str = "path, content_marker";
    type Raw = (String, String);

    fn read_raw(row: &Row<'_>) -> rusqlite::Result<Self::Raw> {
        Ok((row.get(0)?, row.get(1)?))
    }

    fn decode(raw: Self::Raw) -> Result<Self, EntryError> {
        let (path, marker) = raw;
        Ok(Self::new(TrackedPath::parse(&path)?, ContentMarker::parse(&marker)?))
    }

    fn path(&self) -> &TrackedPath {
        &self.path
    }

    fn insert_or_ignore(&self, connection: &Connection) -> rusqlite::Result<usize> {
        connection.execute(
            "INSERT OR IGNORE INTO placeholders (path, content_marker) VALUES (?1, ?2)",
            params![self.path.as_str(), self.marker.as_str()],
        )
    }
}

impl TableRow for IncludedFolder {
    const TABLE: &'static str = "included_folders";
    const COLUMNS: &'static str = "path";
    type Raw = String;

    fn read_raw(row: &Row<'_>) -> rusqlite::Result<Self::Raw> {
        row.get(0)
    }

    fn decode(raw: Self::Raw) -> Result<Self, EntryError> {
        Ok(Self::new(TrackedPath::parse(&raw)?))
    }

    fn path(&self) -> &TrackedPath {
        &self.path
    }

    fn insert_or_ignore(&self, connection: &Connection) -> rusqlite::Result<usize> {
        connection.execute(
            "INSERT OR IGNORE INTO included_folders (path) VALUES (?1)",
            params![self.path.as_str()],
        )
    }
}

// ============================================================================
// SECTION: Tables
// ============================================================================

/// Set-membership operations over one path-keyed table.
pub struct PathSetTable<'a, R> {
    /// Store that owns the connection.
    store: &'a MetadataStore,
    /// Row type marker.
    row: PhantomData<fn() -> R>,
}

/// Paths the user changed locally, excluded from re-projection.
pub type ModifiedPathsTable<'a> = PathSetTable<'a, ModifiedPathEntry>;
/// Materialized stubs and their content markers.
pub type PlaceholdersTable<'a> = PathSetTable<'a, PlaceholderEntry>;
/// Folders selected for sparse projection.
pub type IncludedFoldersTable<'a> = PathSetTable<'a, IncludedFolder>;

impl<'a, R: TableRow> PathSetTable<'a, R> {
    /// Binds a table to the store connection.
    const fn new(store: &'a MetadataStore) -> Self {
        Self {
            store,
            row: PhantomData,
        }
    }

    /// Adds an entry; returns false when its path was already present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] when the insert fails.
    pub fn add(&self, entry: &R) -> Result<bool, StoreError> {
        let inserted = self.store.with_connection(|connection| entry.insert_or_ignore(connection))?;
        Ok(inserted > 0)
    }

    /// Removes a path; returns false when it was absent.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] when the delete fails.
    pub fn remove(&self, path: &TrackedPath) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM {} WHERE path = ?1", R::TABLE);
        let deleted = self
            .store
            .with_connection(|connection| connection.execute(&sql, params![path.as_str()]))?;
        Ok(deleted > 0)
    }

    /// Returns every entry ordered by path.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] on query failure and
    /// [`StoreError::Corrupt`] when a row does not decode.
    pub fn get_all(&self) -> Result<Vec<R>, StoreError> {
        let sql = format!("SELECT {} FROM {} ORDER BY path", R::COLUMNS, R::TABLE);
        let raws = self.store.with_connection(|connection| {
            let mut statement = connection.prepare(&sql)?;
            let mut raws = Vec::new();
            for raw in statement.query_map(params![], R::read_raw)? {
                raws.push(raw?);
            }
            Ok(raws)
        })?;
        raws.into_iter().map(decode_row::<R>).collect()
    }

    /// Returns the entry stored for `path`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] on query failure and
    /// [`StoreError::Corrupt`] when the row does not decode.
    pub fn get(&self, path: &TrackedPath) -> Result<Option<R>, StoreError> {
        let sql = format!("SELECT {} FROM {} WHERE path = ?1", R::COLUMNS, R::TABLE);
        let raw = self.store.with_connection(|connection| {
            connection.query_row(&sql, params![path.as_str()], R::read_raw).optional()
        })?;
        raw.map(decode_row::<R>).transpose()
    }

    /// Returns true when `path` is present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] on query failure.
    pub fn contains(&self, path: &TrackedPath) -> Result<bool, StoreError> {
        let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE path = ?1)", R::TABLE);
        self.store.with_connection(|connection| {
            connection.query_row(&sql, params![path.as_str()], |row| row.get(0))
        })
    }

    /// Returns the number of entries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] on query failure.
    pub fn count(&self) -> Result<u64, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", R::TABLE);
        let count: i64 = self
            .store
            .with_connection(|connection| connection.query_row(&sql, params![], |row| row.get(0)))?;
        u64::try_from(count).map_err(|_| StoreError::Corrupt(format!("negative row count: {count}")))
    }
}

impl PathSetTable<'_, PlaceholderEntry> {
    /// Inserts the placeholder or replaces its content marker.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] when the upsert fails.
    pub fn set_marker(&self, path: &TrackedPath, marker: &ContentMarker) -> Result<(), StoreError> {
        self.store.with_connection(|connection| {
            connection.execute(UPSERT_PLACEHOLDER_SQL, params![path.as_str(), marker.as_str()])
        })?;
        Ok(())
    }
}

/// Typed tables handed out by [`MetadataStore::tables`].
pub struct TrackedPathTables<'a> {
    /// Store that owns the connection.
    store: &'a MetadataStore,
}

impl<'a> TrackedPathTables<'a> {
    /// Wraps a store whose version stamp has been checked.
    pub(crate) const fn new(store: &'a MetadataStore) -> Self {
        Self {
            store,
        }
    }

    /// Returns the modified-paths table.
    #[must_use]
    pub const fn modified_paths(&self) -> ModifiedPathsTable<'a> {
        PathSetTable::new(self.store)
    }

    /// Returns the placeholders table.
    #[must_use]
    pub const fn placeholders(&self) -> PlaceholdersTable<'a> {
        PathSetTable::new(self.store)
    }

    /// Returns the included-folders table.
    #[must_use]
    pub const fn included_folders(&self) -> IncludedFoldersTable<'a> {
        PathSetTable::new(self.store)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Decodes one raw row, reporting decode failures as corruption.
fn decode_row<R: TableRow>(raw: R::Raw) -> Result<R, StoreError> {
    R::decode(raw).map_err(|err| StoreError::Corrupt(format!("{} row: {err}", R::TABLE)))
}
