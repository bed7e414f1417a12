// crates/overlay-state-core/src/core/paths.rs
// ============================================================================
// Module: Tracked Paths
// Description: Normalized enlistment-relative paths used as table keys.
// Purpose: Guarantee a single canonical spelling for every tracked path.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! A [`TrackedPath`] is the unique key of every path-set table. Construction
//! normalizes separators and rejects anything that could escape the
//! enlistment root or break the line-oriented legacy placeholder format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Validation errors for tracked paths and content markers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    /// Path is empty after normalization.
    #[error("tracked path is empty")]
    EmptyPath,
    /// Path is rooted or carries a drive prefix.
    #[error("tracked path must be relative: {0}")]
    AbsolutePath(String),
    /// Path contains a `..` component.
    #[error("tracked path must not contain parent components: {0}")]
    ParentComponent(String),
    /// Path contains NUL, CR, or LF.
    #[error("tracked path contains a forbidden character: {0:?}")]
    InvalidPathCharacter(String),
    /// Content marker is empty.
    #[error("content marker is empty")]
    EmptyMarker,
    /// Content marker contains NUL, CR, or LF.
    #[error("content marker contains a forbidden character: {0:?}")]
    InvalidMarkerCharacter(String),
    /// Path kind code is not recognized.
    #[error("unknown path kind: {0}")]
    UnknownPathKind(String),
}

// ============================================================================
// SECTION: Tracked Path
// ============================================================================

/// Normalized, enlistment-relative path.
///
/// # Invariants
/// - Components are separated by a single `/`.
/// - No empty, `.`, or `..` components; no leading or trailing separator.
/// - Never contains NUL, CR, or LF.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackedPath(String);

impl TrackedPath {
    /// Parses and normalizes a raw relative path.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError`] when the path is empty, absolute, escapes the
    /// root, or contains forbidden characters.
    pub fn parse(raw: &str) -> Result<Self, EntryError> {
        if raw.contains(['\0', '\r', '\n']) {
            return Err(EntryError::InvalidPathCharacter(raw.to_string()));
        }
        let unified = raw.replace('\\', "/");
        if unified.starts_with('/') || has_drive_prefix(&unified) {
            return Err(EntryError::AbsolutePath(raw.to_string()));
        }
        let mut components = Vec::new();
        for component in unified.split('/') {
            match component {
                "" | "." => {}
                ".." => return Err(EntryError::ParentComponent(raw.to_string())),
                other => components.push(other),
            }
        }
        if components.is_empty() {
            return Err(EntryError::EmptyPath);
        }
        Ok(Self(components.join("/")))
    }

    /// Returns the normalized path as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true when `self` equals `other` or lies beneath it.
    #[must_use]
    pub fn starts_with(&self, other: &Self) -> bool {
        self.0 == other.0
            || (self.0.len() > other.0.len()
                && self.0.starts_with(other.as_str())
                && self.0.as_bytes().get(other.0.len()) == Some(&b'/'))
    }
}

impl fmt::Display for TrackedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TrackedPath {
    type Error = EntryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TrackedPath> for String {
    fn from(value: TrackedPath) -> Self {
        value.0
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns true for Windows drive prefixes such as `C:`.
fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

// ============================================================================
// SECTION: Tests
// ============================================================================
