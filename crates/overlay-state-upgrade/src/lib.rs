// crates/overlay-state-upgrade/src/lib.rs
// ============================================================================
// Module: Disk Layout Upgrades
// Description: Legacy placeholder access and the versioned upgrade pipeline.
// Purpose: Carry local enlistment state forward across on-disk format changes.
// Dependencies: overlay-state-core, overlay-state-store-sqlite
// ============================================================================

//! ## Overview
//! Startup runs [`UpgradePipeline::run_all`] before anything reads the
//! tracked path tables. The pipeline walks an [`UpgradeRegistry`] of
//! `(source_version, step)` pairs from the stamped version to the current
//! one, advancing the stamp after each successful step.
//! [`EnlistmentSession`] packages that sequence.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod legacy;
pub mod pipeline;
pub mod registry;
pub mod session;
pub mod steps;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use legacy::LegacyFlatStore;
pub use legacy::LegacyStoreError;
pub use pipeline::AppliedStep;
pub use pipeline::UpgradeError;
pub use pipeline::UpgradePipeline;
pub use pipeline::UpgradeReport;
pub use registry::UpgradeContext;
pub use registry::UpgradeRegistry;
pub use registry::UpgradeStep;
pub use session::EnlistmentSession;
