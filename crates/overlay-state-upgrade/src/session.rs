// crates/overlay-state-upgrade/src/session.rs
// ============================================================================
// Module: Enlistment Session
// Description: Startup sequence that upgrades before exposing the store.
// Purpose: Guarantee no table access happens on an out-of-date layout.
// Dependencies: overlay-state-core, overlay-state-store-sqlite
// ============================================================================

//! ## Overview
//! [`EnlistmentSession::open`] runs the upgrade pipeline and only then hands
//! out the metadata store for normal use. The session keeps the enlistment's
//! upgrade lock for its whole lifetime, so no other pipeline or session can
//! open the enlistment until it is dropped.

// ============================================================================
// SECTION: Imports
// ============================================================================

use overlay_state_core::EnlistmentLayout;
use overlay_state_core::FileSystem;
use overlay_state_core::Tracer;
use overlay_state_store_sqlite::MetadataStore;
use overlay_state_store_sqlite::SqliteStoreConfig;
use overlay_state_store_sqlite::StoreError;
use overlay_state_store_sqlite::TrackedPathTables;

use crate::pipeline::UpgradeError;
use crate::pipeline::UpgradeLock;
use crate::pipeline::UpgradePipeline;
use crate::pipeline::UpgradeReport;
use crate::pipeline::UpgradedStore;

// ============================================================================
// SECTION: Session
// ============================================================================

/// An enlistment whose local state is at the current layout.
pub struct EnlistmentSession {
    /// Enlistment layout.
    layout: EnlistmentLayout,
    /// Open metadata store.
    store: MetadataStore,
    /// Outcome of the startup upgrade.
    report: UpgradeReport,
    /// Upgrade lock held until the session is dropped.
    _lock: UpgradeLock,
}

impl EnlistmentSession {
    /// Upgrades the enlistment and takes ownership of its metadata store.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::Locked`] when another session or pipeline holds
    /// the enlistment, and any other [`UpgradeError`] when the upgrade fails.
    pub fn open(
        layout: EnlistmentLayout,
        store_config: &SqliteStoreConfig,
        pipeline: &UpgradePipeline,
        fs: &dyn FileSystem,
        tracer: &dyn Tracer,
    ) -> Result<Self, UpgradeError> {
        let UpgradedStore {
            lock,
            store,
            report,
        } = pipeline.upgrade_and_hold(&layout, store_config, fs, tracer)?;
        Ok(Self {
            layout,
            store,
            report,
            _lock: lock,
        })
    }

    /// Returns the enlistment layout.
    #[must_use]
    pub const fn layout(&self) -> &EnlistmentLayout {
        &self.layout
    }

    /// Returns the metadata store.
    #[must_use]
    pub const fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Returns the startup upgrade report.
    #[must_use]
    pub const fn report(&self) -> &UpgradeReport {
        &self.report
    }

    /// Returns the typed path tables.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the stamp cannot be read or is not current.
    pub fn tables(&self) -> Result<TrackedPathTables<'_>, StoreError> {
        self.store.tables()
    }
}
