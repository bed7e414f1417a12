// crates/overlay-state-core/src/interfaces/mod.rs
// ============================================================================
// Module: Overlay State Interfaces
// Description: Collaborator interfaces for tracing and filesystem access.
// Purpose: Define the contract surfaces consumed by store bootstrap and upgrades.
// Dependencies: serde, serde_json
// ============================================================================

//! ## Overview
//! The metadata store and upgrade pipeline never talk to a logging backend or
//! the filesystem directly for bootstrap work; they go through [`Tracer`] and
//! [`FileSystem`]. Tracing is fire-and-forget: sinks swallow their own output
//! failures and never return errors to the caller.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::Path;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Trace Events
// ============================================================================

/// Severity of a trace event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    /// Informational progress.
    Info,
    /// Recoverable anomaly.
    Warning,
    /// Operation failure.
    Error,
}

/// Structured trace event payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceEvent {
    /// Stable event identifier (e.g. `upgrade_step_applied`).
    pub event: String,
    /// Event severity.
    pub level: TraceLevel,
    /// Event timestamp (milliseconds since epoch).
    pub timestamp_ms: u128,
    /// Human-readable message.
    pub message: String,
    /// Additional structured fields, serialized in key order.
    pub fields: BTreeMap<String, Value>,
}

impl TraceEvent {
    /// Creates a new trace event with a consistent timestamp.
    #[must_use]
    pub fn new(level: TraceLevel, event: &str, message: impl Into<String>) -> Self {
        let timestamp_ms =
            SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis();
        Self {
            event: event.to_string(),
            level,
            timestamp_ms,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Attaches a structured field to the event.
    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }
}

// ============================================================================
// SECTION: Tracer
// ============================================================================

/// Fire-and-forget structured event sink.
pub trait Tracer: Send + Sync {
    /// Records a trace event. Must never panic or report failure.
    fn record(&self, event: TraceEvent);

    /// Records an informational event.
    fn info(&self, event: &str, message: &str) {
        self.record(TraceEvent::new(TraceLevel::Info, event, message));
    }

    /// Records an error event.
    fn error(&self, event: &str, message: &str) {
        self.record(TraceEvent::new(TraceLevel::Error, event, message));
    }
}

// ============================================================================
// SECTION: File System
// ============================================================================

/// Filesystem capability used by store bootstrap and the legacy flat store.
pub trait FileSystem: Send + Sync {
    /// Creates a directory and all missing parents.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the directory cannot be created.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Returns true when `path` exists and is a regular file.
    fn file_exists(&self, path: &Path) -> bool;

    /// Returns true when `path` exists and is a directory.
    fn dir_exists(&self, path: &Path) -> bool;

    /// Reads the full contents of a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replaces `path` with `bytes` so that readers observe either the old
    /// complete file or the new complete file, never a partial write.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the temporary file cannot be written,
    /// synced, or renamed into place.
    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()>;

    /// Opens `path` for advisory locking, creating it when missing.
    ///
    /// Existing contents are left untouched.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be created or opened.
    fn open_lock_file(&self, path: &Path) -> io::Result<File>;

    /// Removes a file.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when the file cannot be removed.
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}
