// crates/overlay-state-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Metadata Store
// Description: Lifecycle of the enlistment metadata store backed by SQLite WAL.
// Purpose: Bootstrap, configure, and version-stamp the durable store handle.
// Dependencies: overlay-state-core, rusqlite, thiserror
// ============================================================================

//! ## Overview
//! [`MetadataStore`] owns the single SQLite handle for an enlistment. Opening
//! a store creates the containing directory, configures durability, stamps
//! the baseline disk layout version on first creation, and ensures every
//! path-set table exists. The version stamp lives in the database header
//! (`PRAGMA user_version`), not in an ordinary table.
//!
//! Table access is gated: [`MetadataStore::tables`] refuses to hand out
//! [`TrackedPathTables`] until the stamp equals
//! [`CURRENT_SCHEMA_VERSION`], so nothing touches the tables before the
//! upgrade pipeline has finished.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::time::Duration;

use overlay_state_core::BASELINE_SCHEMA_VERSION;
use overlay_state_core::CURRENT_SCHEMA_VERSION;
use overlay_state_core::FileSystem;
use overlay_state_core::PlaceholderEntry;
use overlay_state_core::TraceEvent;
use overlay_state_core::TraceLevel;
use overlay_state_core::Tracer;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::params;
use thiserror::Error;

use crate::tables::TrackedPathTables;
use crate::tables::UPSERT_PLACEHOLDER_SQL;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default page cache budget in KiB.
pub const DEFAULT_CACHE_SIZE_KIB: u32 = 40_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Journal mode every store runs in.
const JOURNAL_MODE: &str = "wal";
/// Synchronous level applied on every open.
const SYNCHRONOUS: &str = "FULL";
/// Path-set tables created on every open.
const CREATE_TABLES_SQL: &str = "CREATE TABLE IF NOT EXISTS modified_paths (
        path TEXT PRIMARY KEY,
        kind INTEGER NOT NULL CHECK (kind IN (0, 1))
    );
    CREATE TABLE IF NOT EXISTS placeholders (
        path TEXT PRIMARY KEY,
        content_marker TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS included_folders (
        path TEXT PRIMARY KEY
    );";

// ============================================================================
// SECTION: Config
// ============================================================================

/// Configuration for the `SQLite` metadata store.
///
/// Durability is not configurable: every open runs the store in WAL mode
/// with `synchronous = FULL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u64,
    /// Page cache budget in KiB applied on every open.
    pub cache_size_kib: u32,
}

impl SqliteStoreConfig {
    /// Builds a config with the default busy timeout and 40 MB cache.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            cache_size_kib: DEFAULT_CACHE_SIZE_KIB,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Metadata store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// State directory or store file could not be created or opened.
    #[error("metadata store configuration error: {0}")]
    Configuration(String),
    /// A single store operation failed.
    #[error("metadata store access error: {0}")]
    Access(String),
    /// A stored row could not be decoded.
    #[error("metadata store corruption: {0}")]
    Corrupt(String),
    /// Store version does not permit the requested access.
    #[error("metadata store version mismatch: {0}")]
    VersionMismatch(String),
    /// Caller supplied an invalid argument.
    #[error("metadata store invalid request: {0}")]
    Invalid(String),
}

/// Maps an engine error raised by a single store operation.
pub(crate) fn access_error(err: &rusqlite::Error) -> StoreError {
    StoreError::Access(err.to_string())
}

/// Maps an engine error raised while bootstrapping the store.
fn configuration_error(err: &rusqlite::Error) -> StoreError {
    StoreError::Configuration(err.to_string())
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed metadata store for one enlistment.
///
/// Clones share the same handle, so every clone observes committed writes
/// immediately.
#[derive(Clone)]
pub struct MetadataStore {
    /// Store file path.
    path: PathBuf,
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
    /// Whether this open created (and stamped) the store.
    created: bool,
}

impl MetadataStore {
    /// Opens or creates the metadata store.
    ///
    /// A store whose file did not exist (or was never stamped) is stamped
    /// with [`BASELINE_SCHEMA_VERSION`]. WAL journaling, full synchronous
    /// commits, the cache budget, and table creation are applied on every
    /// open.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Configuration`] when the directory or store file
    /// cannot be created or opened, and [`StoreError::Invalid`] for unusable
    /// paths.
    pub fn open(
        config: &SqliteStoreConfig,
        fs: &dyn FileSystem,
        tracer: &dyn Tracer,
    ) -> Result<Self, StoreError> {
        validate_store_path(fs, &config.path)?;
        ensure_parent_dir(fs, &config.path)?;
        let existed = fs.file_exists(&config.path);
        let connection = open_connection(config)?;
        let stamped = read_user_version(&connection).map_err(|err| configuration_error(&err))?;
        let created = !existed || stamped == 0;
        apply_durability(&connection)?;
        if created {
            stamp_baseline(&connection)?;
            tracer.record(
                TraceEvent::new(TraceLevel::Info, "metadata_store_created", "created metadata store")
                    .with_field("path", config.path.display().to_string())
                    .with_field("version", BASELINE_SCHEMA_VERSION),
            );
        }
        apply_connection_pragmas(&connection, config)?;
        create_tables(&connection).map_err(|err| configuration_error(&err))?;
        Ok(Self {
            path: config.path.clone(),
            connection: Arc::new(Mutex::new(connection)),
            created,
        })
    }

    /// Returns the store file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when this open created and stamped the store.
    #[must_use]
    pub const fn was_created(&self) -> bool {
        self.created
    }

    /// Creates every path-set table that is missing.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] when table creation fails.
    pub fn ensure_tables(&self) -> Result<(), StoreError> {
        self.with_connection(create_tables)
    }

    /// Reads the disk layout version stamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] when the stamp cannot be read.
    pub fn version(&self) -> Result<i64, StoreError> {
        self.with_connection(read_user_version)
    }

    /// Advances the disk layout version stamp.
    ///
    /// The write is committed with full synchronous durability before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] when `version` is out of range or lower
    /// than the current stamp, and [`StoreError::Access`] on write failure.
    pub fn set_version(&self, version: i64) -> Result<(), StoreError> {
        if version < 1 || i32::try_from(version).is_err() {
            return Err(StoreError::Invalid(format!("schema version out of range: {version}")));
        }
        let guard = self.lock()?;
        let current = read_user_version(&guard).map_err(|err| access_error(&err))?;
        if version < current {
            return Err(StoreError::Invalid(format!(
                "schema version cannot decrease from {current} to {version}"
            )));
        }
        guard
            .execute_batch(&format!("PRAGMA user_version = {version};"))
            .map_err(|err| access_error(&err))?;
        drop(guard);
        Ok(())
    }

    /// Hands out the typed path-set tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::VersionMismatch`] until the upgrade pipeline has
    /// brought the stamp to [`CURRENT_SCHEMA_VERSION`].
    pub fn tables(&self) -> Result<TrackedPathTables<'_>, StoreError> {
        let version = self.version()?;
        if version != CURRENT_SCHEMA_VERSION {
            return Err(StoreError::VersionMismatch(format!(
                "store is at version {version}, expected {CURRENT_SCHEMA_VERSION}; run the upgrade \
                 pipeline first"
            )));
        }
        Ok(TrackedPathTables::new(self))
    }

    /// Inserts or replaces placeholder rows in one transaction.
    ///
    /// Used by disk layout upgrades, which run before the version gate in
    /// [`MetadataStore::tables`] opens. Re-importing the same entries leaves
    /// the table unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Access`] when any row fails; no row is committed.
    pub fn import_placeholders(&self, entries: &[PlaceholderEntry]) -> Result<usize, StoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| access_error(&err))?;
        {
            let mut statement =
                tx.prepare(UPSERT_PLACEHOLDER_SQL).map_err(|err| access_error(&err))?;
            for entry in entries {
                statement
                    .execute(params![entry.path.as_str(), entry.marker.as_str()])
                    .map_err(|err| access_error(&err))?;
            }
        }
        tx.commit().map_err(|err| access_error(&err))?;
        drop(guard);
        Ok(entries.len())
    }

    /// Runs one operation against the shared connection.
    pub(crate) fn with_connection<T>(
        &self,
        operation: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let guard = self.lock()?;
        let result = operation(&guard).map_err(|err| access_error(&err));
        drop(guard);
        result
    }

    /// Locks the shared connection.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Access("mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(fs: &dyn FileSystem, path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Configuration("store path missing parent directory".to_string()));
    };
    fs.create_dir_all(parent).map_err(|err| StoreError::Configuration(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(fs: &dyn FileSystem, path: &Path) -> Result<(), StoreError> {
    if path.as_os_str().is_empty() {
        return Err(StoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(StoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(StoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if fs.dir_exists(path) {
        return Err(StoreError::Invalid("store path must be a file, not a directory".to_string()));
    }
    Ok(())
}

/// Opens an `SQLite` connection that can be shared within the process.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    Connection::open_with_flags(&config.path, flags).map_err(|err| configuration_error(&err))
}

/// Switches the store to WAL journaling and full synchronous commits.
///
/// `SQLite` answers the journal mode request with the mode it actually
/// adopted; anything other than WAL fails the open.
fn apply_durability(connection: &Connection) -> Result<(), StoreError> {
    let adopted: String = connection
        .query_row(&format!("PRAGMA journal_mode = {JOURNAL_MODE}"), params![], |row| row.get(0))
        .map_err(|err| configuration_error(&err))?;
    if !adopted.eq_ignore_ascii_case(JOURNAL_MODE) {
        return Err(StoreError::Configuration(format!(
            "store refused {JOURNAL_MODE} journaling (journal mode is {adopted})"
        )));
    }
    connection
        .execute_batch(&format!("PRAGMA synchronous = {SYNCHRONOUS};"))
        .map_err(|err| configuration_error(&err))
}

/// Stamps a newly created store with the baseline disk layout version.
fn stamp_baseline(connection: &Connection) -> Result<(), StoreError> {
    connection
        .execute_batch(&format!("PRAGMA user_version = {BASELINE_SCHEMA_VERSION};"))
        .map_err(|err| configuration_error(&err))
}

/// Applies the per-connection cache budget and busy timeout.
fn apply_connection_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), StoreError> {
    connection
        .execute_batch(&format!("PRAGMA cache_size = -{};", config.cache_size_kib))
        .map_err(|err| configuration_error(&err))?;
    connection
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| configuration_error(&err))?;
    Ok(())
}

/// Creates every path-set table that is missing.
fn create_tables(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(CREATE_TABLES_SQL)
}

/// Reads the version stamp from the database header.
fn read_user_version(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row("PRAGMA user_version", params![], |row| row.get(0))
}
