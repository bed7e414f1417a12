// crates/overlay-state-core/src/core/mod.rs
// ============================================================================
// Module: Overlay State Core Types
// Description: Tracked paths, placeholder markers, and enlistment layout.
// Purpose: Group the strongly typed values persisted by the metadata store.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! Core types are plain values with validating constructors. Untyped strings
//! read from disk are converted into these types at storage boundaries and
//! never leak past them.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod entries;
pub mod layout;
pub mod paths;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use entries::ALL_ZERO_MARKER;
pub use entries::ContentMarker;
pub use entries::IncludedFolder;
pub use entries::ModifiedPathEntry;
pub use entries::PARTIAL_FOLDER_MARKER;
pub use entries::PathKind;
pub use entries::PlaceholderEntry;
pub use layout::BASELINE_SCHEMA_VERSION;
pub use layout::CURRENT_SCHEMA_VERSION;
pub use layout::DEFAULT_STATE_DIR;
pub use layout::EnlistmentLayout;
pub use paths::EntryError;
pub use paths::TrackedPath;
