// crates/overlay-state-upgrade/src/legacy.rs
// ============================================================================
// Module: Legacy Placeholder File
// Description: Reader and writer for the flat, line-oriented placeholder list.
// Purpose: Give disk layout upgrades lossless access to pre-database state.
// Dependencies: overlay-state-core, thiserror
// ============================================================================

//! ## Overview
//! The legacy placeholder list is an append-style log of records:
//!
//! - add: `A ` + path + NUL + marker + `\r\n`
//! - delete: `D ` + path + `\r\n`
//!
//! Replaying the log (later records win) yields the current placeholder set.
//! A bare `\n` terminator is accepted on read. Rewrites always emit one add
//! record per entry, sorted by path, and replace the file atomically.
//!
//! Security posture: the file is untrusted input; every record is validated
//! and failures report the 1-based line number.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use overlay_state_core::ContentMarker;
use overlay_state_core::FileSystem;
use overlay_state_core::PlaceholderEntry;
use overlay_state_core::TrackedPath;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Prefix of an add record.
const ADD_PREFIX: &str = "A ";
/// Prefix of a delete record.
const DELETE_PREFIX: &str = "D ";
/// Separator between path and marker in an add record.
const PATH_MARKER_SEPARATOR: char = '\0';
/// Record terminator written on rewrite.
const RECORD_TERMINATOR: &str = "\r\n";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Legacy placeholder file errors.
#[derive(Debug, Error)]
pub enum LegacyStoreError {
    /// File could not be read, written, or removed.
    #[error("legacy placeholder file io error: {0}")]
    Io(String),
    /// A record could not be parsed.
    #[error("legacy placeholder file malformed at line {line}: {reason}")]
    Malformed {
        /// 1-based line number of the offending record.
        line: usize,
        /// Description of the defect.
        reason: String,
    },
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// Handle to the legacy placeholder list at a fixed path.
///
/// The file is opened only for the duration of each call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFlatStore {
    /// Location of the placeholder list.
    path: PathBuf,
}

impl LegacyFlatStore {
    /// Creates a handle for the file at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
        }
    }

    /// Returns the file location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when the file exists.
    #[must_use]
    pub fn exists(&self, fs: &dyn FileSystem) -> bool {
        fs.file_exists(&self.path)
    }

    /// Replays every record and returns the live entries sorted by path.
    ///
    /// A missing file yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`LegacyStoreError::Io`] on read failure and
    /// [`LegacyStoreError::Malformed`] for any invalid record.
    pub fn read_all(&self, fs: &dyn FileSystem) -> Result<Vec<PlaceholderEntry>, LegacyStoreError> {
        match fs.read(&self.path) {
            Ok(bytes) => parse_records(&bytes),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(LegacyStoreError::Io(err.to_string())),
        }
    }

    /// Replaces the whole file with one add record per entry.
    ///
    /// # Errors
    ///
    /// Returns [`LegacyStoreError::Io`] when the atomic replace fails; the
    /// previous file is left intact in that case.
    pub fn write_all(
        &self,
        fs: &dyn FileSystem,
        entries: &[PlaceholderEntry],
    ) -> Result<(), LegacyStoreError> {
        fs.write_atomic(&self.path, &serialize_records(entries))
            .map_err(|err| LegacyStoreError::Io(err.to_string()))
    }

    /// Deletes the file; returns false when it was already absent.
    ///
    /// # Errors
    ///
    /// Returns [`LegacyStoreError::Io`] when the file exists but cannot be
    /// removed.
    pub fn remove(&self, fs: &dyn FileSystem) -> Result<bool, LegacyStoreError> {
        match fs.remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(LegacyStoreError::Io(err.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Codec
// ============================================================================

/// Parses a record log into live entries sorted by path.
///
/// # Errors
///
/// Returns [`LegacyStoreError::Malformed`] for invalid UTF-8, unknown
/// prefixes, missing separators, invalid paths or markers, and a final
/// record without terminator.
pub fn parse_records(bytes: &[u8]) -> Result<Vec<PlaceholderEntry>, LegacyStoreError> {
    let text = std::str::from_utf8(bytes).map_err(|err| {
        let valid = bytes.get(.. err.valid_up_to()).unwrap_or_default();
        let line = valid.iter().filter(|byte| **byte == b'\n').count() + 1;
        malformed(line, "invalid utf-8")
    })?;
    let mut live: BTreeMap<TrackedPath, ContentMarker> = BTreeMap::new();
    let mut rest = text;
    let mut line = 0;
    while !rest.is_empty() {
        line += 1;
        let Some((record, remainder)) = rest.split_once('\n') else {
            return Err(malformed(line, "record is missing its terminator"));
        };
        rest = remainder;
        let record = record.strip_suffix('\r').unwrap_or(record);
        apply_record(&mut live, record, line)?;
    }
    Ok(live.into_iter().map(|(path, marker)| PlaceholderEntry::new(path, marker)).collect())
}

/// Serializes entries as sorted add records.
#[must_use]
pub fn serialize_records(entries: &[PlaceholderEntry]) -> Vec<u8> {
    let mut sorted: Vec<&PlaceholderEntry> = entries.iter().collect();
    sorted.sort_by(|left, right| left.path.cmp(&right.path));
    let mut out = String::new();
    for entry in sorted {
        out.push_str(ADD_PREFIX);
        out.push_str(entry.path.as_str());
        out.push(PATH_MARKER_SEPARATOR);
        out.push_str(entry.marker.as_str());
        out.push_str(RECORD_TERMINATOR);
    }
    out.into_bytes()
}

/// Applies one record (terminator already stripped) to the live set.
fn apply_record(
    live: &mut BTreeMap<TrackedPath, ContentMarker>,
    record: &str,
    line: usize,
) -> Result<(), LegacyStoreError> {
    if let Some(body) = record.strip_prefix(ADD_PREFIX) {
        let Some((path, marker)) = body.split_once(PATH_MARKER_SEPARATOR) else {
            return Err(malformed(line, "add record is missing the path separator"));
        };
        let path = TrackedPath::parse(path).map_err(|err| malformed(line, &err.to_string()))?;
        let marker =
            ContentMarker::parse(marker).map_err(|err| malformed(line, &err.to_string()))?;
        live.insert(path, marker);
        return Ok(());
    }
    if let Some(path) = record.strip_prefix(DELETE_PREFIX) {
        let path = TrackedPath::parse(path).map_err(|err| malformed(line, &err.to_string()))?;
        live.remove(&path);
        return Ok(());
    }
    Err(malformed(line, "unknown record prefix"))
}

/// Builds a malformed-record error.
fn malformed(line: usize, reason: &str) -> LegacyStoreError {
    LegacyStoreError::Malformed {
        line,
        reason: reason.to_string(),
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
