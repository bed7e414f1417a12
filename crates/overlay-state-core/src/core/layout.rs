// crates/overlay-state-core/src/core/layout.rs
// ============================================================================
// Module: Enlistment Layout
// Description: Fixed on-disk locations under an enlistment's state directory.
// Purpose: Single source of truth for store, legacy, and lock file paths.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Every enlistment owns one hidden state directory. The metadata store, the
//! legacy flat placeholder file, and the upgrade lock all live in its
//! `databases` subdirectory:
//!
//! ```text
//! <root>/.gvfs/databases/VFSForGit.sqlite        (+ -wal, -shm sidecars)
//! <root>/.gvfs/databases/PlaceholderList.dat     (legacy, upgrade input only)
//! <root>/.gvfs/databases/upgrade.lock
//! ```

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Version stamped into a freshly created metadata store.
pub const BASELINE_SCHEMA_VERSION: i64 = 16;
/// Disk layout version produced by this build.
pub const CURRENT_SCHEMA_VERSION: i64 = 20;
/// Default hidden state directory name under the enlistment root.
pub const DEFAULT_STATE_DIR: &str = ".gvfs";
/// Subdirectory of the state directory that holds the databases.
pub const DATABASES_DIR: &str = "databases";
/// Metadata store file name.
pub const METADATA_STORE_FILE: &str = "VFSForGit.sqlite";
/// Legacy flat placeholder file name.
pub const LEGACY_PLACEHOLDER_FILE: &str = "PlaceholderList.dat";
/// Advisory lock file held while the upgrade pipeline runs.
pub const UPGRADE_LOCK_FILE: &str = "upgrade.lock";

// ============================================================================
// SECTION: Layout
// ============================================================================

/// Resolved on-disk layout for one enlistment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnlistmentLayout {
    /// Enlistment (working tree) root.
    root: PathBuf,
    /// Hidden state directory name relative to the root.
    state_dir: PathBuf,
}

impl EnlistmentLayout {
    /// Creates a layout using the default state directory name.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_state_dir(root, DEFAULT_STATE_DIR)
    }

    /// Creates a layout with a custom state directory name.
    #[must_use]
    pub fn with_state_dir(root: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state_dir: state_dir.into(),
        }
    }

    /// Returns the enlistment root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the hidden state directory.
    #[must_use]
    pub fn state_root(&self) -> PathBuf {
        self.root.join(&self.state_dir)
    }

    /// Returns the directory holding the store, legacy file, and lock.
    #[must_use]
    pub fn databases_dir(&self) -> PathBuf {
        self.state_root().join(DATABASES_DIR)
    }

    /// Returns the metadata store file path.
    #[must_use]
    pub fn metadata_store_path(&self) -> PathBuf {
        self.databases_dir().join(METADATA_STORE_FILE)
    }

    /// Returns the legacy flat placeholder file path.
    #[must_use]
    pub fn legacy_placeholders_path(&self) -> PathBuf {
        self.databases_dir().join(LEGACY_PLACEHOLDER_FILE)
    }

    /// Returns the upgrade lock file path.
    #[must_use]
    pub fn upgrade_lock_path(&self) -> PathBuf {
        self.databases_dir().join(UPGRADE_LOCK_FILE)
    }
}
