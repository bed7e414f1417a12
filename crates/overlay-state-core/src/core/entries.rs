// crates/overlay-state-core/src/core/entries.rs
// ============================================================================
// Module: Tracked Path Entries
// Description: Row types for the modified-path, placeholder, and include sets.
// Purpose: Model each persisted row as a typed structure with fixed fields.
// Dependencies: serde, crate::core::paths
// ============================================================================

//! ## Overview
//! Entries are the typed rows of the three path-set tables. Placeholder rows
//! carry a [`ContentMarker`], which is either a real content identifier or
//! one of two reserved sentinels:
//! - [`ContentMarker::AllZero`]: legacy "no real content yet", historically
//!   shared by empty files and unenumerated folders.
//! - [`ContentMarker::PartialFolder`]: folder partially enumerated and not
//!   hydrated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::core::paths::EntryError;
use crate::core::paths::TrackedPath;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Wire form of the legacy all-zero sentinel (40 `0` characters).
pub const ALL_ZERO_MARKER: &str = "0000000000000000000000000000000000000000";
/// Wire form of the partial-folder sentinel (40 spaces).
pub const PARTIAL_FOLDER_MARKER: &str = "                                        ";

// ============================================================================
// SECTION: Content Marker
// ============================================================================

/// Placeholder content marker.
///
/// # Invariants
/// - Sentinel wire forms always parse to their sentinel variant, so
///   `Content` never holds [`ALL_ZERO_MARKER`] or [`PARTIAL_FOLDER_MARKER`].
/// - `Content` identifiers are non-empty and free of NUL, CR, and LF.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ContentMarker {
    /// Legacy "no real content yet" sentinel.
    AllZero,
    /// Folder partially enumerated, not hydrated.
    PartialFolder,
    /// Opaque content identifier (typically an object id).
    Content(String),
}

impl ContentMarker {
    /// Parses a marker from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError`] when the marker is empty or contains NUL, CR,
    /// or LF.
    pub fn parse(raw: &str) -> Result<Self, EntryError> {
        match raw {
            ALL_ZERO_MARKER => Ok(Self::AllZero),
            PARTIAL_FOLDER_MARKER => Ok(Self::PartialFolder),
            "" => Err(EntryError::EmptyMarker),
            other if other.contains(['\0', '\r', '\n']) => {
                Err(EntryError::InvalidMarkerCharacter(other.to_string()))
            }
            other => Ok(Self::Content(other.to_string())),
        }
    }

    /// Returns the wire form of the marker.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AllZero => ALL_ZERO_MARKER,
            Self::PartialFolder => PARTIAL_FOLDER_MARKER,
            Self::Content(id) => id,
        }
    }

    /// Returns true for either reserved sentinel.
    #[must_use]
    pub const fn is_sentinel(&self) -> bool {
        matches!(self, Self::AllZero | Self::PartialFolder)
    }

    /// Rewrites the legacy all-zero sentinel to the partial-folder sentinel.
    ///
    /// Every other marker is returned unchanged, so applying this twice is the
    /// same as applying it once.
    #[must_use]
    pub fn disambiguate_folder(self) -> Self {
        match self {
            Self::AllZero => Self::PartialFolder,
            other => other,
        }
    }
}

impl fmt::Display for ContentMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for ContentMarker {
    type Error = EntryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ContentMarker> for String {
    fn from(value: ContentMarker) -> Self {
        match value {
            ContentMarker::Content(id) => id,
            sentinel => sentinel.as_str().to_string(),
        }
    }
}

// ============================================================================
// SECTION: Rows
// ============================================================================

/// Placeholder row: a stub path and the marker describing its content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaceholderEntry {
    /// Unique placeholder path.
    pub path: TrackedPath,
    /// Content marker for the placeholder.
    pub marker: ContentMarker,
}

impl PlaceholderEntry {
    /// Creates a placeholder entry.
    #[must_use]
    pub const fn new(path: TrackedPath, marker: ContentMarker) -> Self {
        Self {
            path,
            marker,
        }
    }
}

/// Kind of a tracked path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathKind {
    /// Regular file.
    File,
    /// Folder.
    Folder,
}

impl PathKind {
    /// Returns the stable integer code stored in the metadata store.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::File => 0,
            Self::Folder => 1,
        }
    }

    /// Decodes a stored integer code.
    ///
    /// # Errors
    ///
    /// Returns [`EntryError::UnknownPathKind`] for unrecognized codes.
    pub fn from_code(code: i64) -> Result<Self, EntryError> {
        match code {
            0 => Ok(Self::File),
            1 => Ok(Self::Folder),
            other => Err(EntryError::UnknownPathKind(other.to_string())),
        }
    }

    /// Returns a stable label for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

/// Modified path row: local divergence that excludes the path from re-projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModifiedPathEntry {
    /// Unique modified path.
    pub path: TrackedPath,
    /// Whether the path is a file or folder.
    pub kind: PathKind,
}

impl ModifiedPathEntry {
    /// Creates a modified path entry.
    #[must_use]
    pub const fn new(path: TrackedPath, kind: PathKind) -> Self {
        Self {
            path,
            kind,
        }
    }
}

/// Included folder row for sparse projection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncludedFolder {
    /// Unique included folder path.
    pub path: TrackedPath,
}

impl IncludedFolder {
    /// Creates an included folder entry.
    #[must_use]
    pub const fn new(path: TrackedPath) -> Self {
        Self {
            path,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
