// crates/overlay-state-upgrade/src/steps.rs
// ============================================================================
// Module: Standard Upgrade Steps
// Description: Disk layout upgrades from the baseline version to current.
// Purpose: Carry legacy placeholder state forward into the metadata store.
// Dependencies: overlay-state-core, overlay-state-store-sqlite
// ============================================================================

//! ## Overview
//! Each step must be safe to rerun: a crash after the step's writes but
//! before the pipeline advances the stamp leads to the same step running
//! again on the next start.
//!
//! | From | Step                          | Effect                                   |
//! |------|-------------------------------|------------------------------------------|
//! | 16   | `folder_placeholder_values`   | legacy `AllZero` folders -> `PartialFolder` |
//! | 17   | `import_legacy_placeholders`  | legacy entries -> `placeholders` table   |
//! | 18   | `retire_legacy_placeholders`  | delete the legacy file                   |
//! | 19   | `included_folders_table`      | ensure `included_folders` exists         |

// ============================================================================
// SECTION: Imports
// ============================================================================

use overlay_state_core::ContentMarker;
use overlay_state_core::PlaceholderEntry;
use overlay_state_core::TraceEvent;
use overlay_state_core::TraceLevel;

use crate::legacy::LegacyFlatStore;
use crate::pipeline::UpgradeError;
use crate::registry::UpgradeContext;
use crate::registry::UpgradeStep;

// ============================================================================
// SECTION: Step Names
// ============================================================================

/// Rewrites legacy folder sentinels.
pub const FOLDER_PLACEHOLDER_VALUES: &str = "folder_placeholder_values";
/// Imports legacy placeholders into the store.
pub const IMPORT_LEGACY_PLACEHOLDERS: &str = "import_legacy_placeholders";
/// Deletes the legacy placeholder file.
pub const RETIRE_LEGACY_PLACEHOLDERS: &str = "retire_legacy_placeholders";
/// Introduces the included-folders table.
pub const INCLUDED_FOLDERS_TABLE: &str = "included_folders_table";

// ============================================================================
// SECTION: Registry Contents
// ============================================================================

/// Returns the steps shipped with this build in ascending order.
#[must_use]
pub fn standard_steps() -> Vec<UpgradeStep> {
    vec![
        UpgradeStep::new(16, FOLDER_PLACEHOLDER_VALUES, folder_placeholder_values),
        UpgradeStep::new(17, IMPORT_LEGACY_PLACEHOLDERS, import_legacy_placeholders),
        UpgradeStep::new(18, RETIRE_LEGACY_PLACEHOLDERS, retire_legacy_placeholders),
        UpgradeStep::new(19, INCLUDED_FOLDERS_TABLE, included_folders_table),
    ]
}

// ============================================================================
// SECTION: Transforms
// ============================================================================

/// Replaces every legacy `AllZero` marker with `PartialFolder`.
///
/// Paths, entry count, and non-sentinel markers are preserved, and the
/// transform is idempotent.
#[must_use]
pub fn disambiguate_folder_markers(entries: Vec<PlaceholderEntry>) -> Vec<PlaceholderEntry> {
    entries
        .into_iter()
        .map(|entry| PlaceholderEntry::new(entry.path, entry.marker.disambiguate_folder()))
        .collect()
}

// ============================================================================
// SECTION: Steps
// ============================================================================

/// 16 -> 17: rewrites folder placeholder values in the legacy file.
///
/// # Errors
///
/// Returns [`UpgradeError::Legacy`] when the file cannot be read or rewritten.
pub fn folder_placeholder_values(context: &UpgradeContext<'_>) -> Result<(), UpgradeError> {
    let legacy = LegacyFlatStore::new(context.layout.legacy_placeholders_path());
    if !legacy.exists(context.fs) {
        context.tracer.info("legacy_placeholders_absent", "no legacy placeholder file to rewrite");
        return Ok(());
    }
    let entries = legacy.read_all(context.fs)?;
    let rewritten =
        entries.iter().filter(|entry| entry.marker == ContentMarker::AllZero).count();
    let migrated = disambiguate_folder_markers(entries);
    legacy.write_all(context.fs, &migrated)?;
    context.tracer.record(
        TraceEvent::new(TraceLevel::Info, "legacy_placeholders_rewritten", "rewrote folder markers")
            .with_field("entries", migrated.len())
            .with_field("sentinels", rewritten),
    );
    Ok(())
}

/// 17 -> 18: copies legacy entries into the placeholders table.
///
/// # Errors
///
/// Returns [`UpgradeError::Legacy`] on read failure and
/// [`UpgradeError::Store`] when the import transaction fails.
pub fn import_legacy_placeholders(context: &UpgradeContext<'_>) -> Result<(), UpgradeError> {
    let legacy = LegacyFlatStore::new(context.layout.legacy_placeholders_path());
    let entries = legacy.read_all(context.fs)?;
    let imported = context.store.import_placeholders(&entries)?;
    context.tracer.record(
        TraceEvent::new(TraceLevel::Info, "legacy_placeholders_imported", "imported placeholders")
            .with_field("entries", imported),
    );
    Ok(())
}

/// 18 -> 19: deletes the legacy placeholder file.
///
/// # Errors
///
/// Returns [`UpgradeError::Legacy`] when the file exists but cannot be removed.
pub fn retire_legacy_placeholders(context: &UpgradeContext<'_>) -> Result<(), UpgradeError> {
    let legacy = LegacyFlatStore::new(context.layout.legacy_placeholders_path());
    if legacy.remove(context.fs)? {
        context.tracer.info("legacy_placeholders_retired", "removed legacy placeholder file");
    }
    Ok(())
}

/// 19 -> 20: ensures the included-folders table exists.
///
/// # Errors
///
/// Returns [`UpgradeError::Store`] when table creation fails.
pub fn included_folders_table(context: &UpgradeContext<'_>) -> Result<(), UpgradeError> {
    context.store.ensure_tables()?;
    Ok(())
}
