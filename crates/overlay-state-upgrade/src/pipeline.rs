// crates/overlay-state-upgrade/src/pipeline.rs
// ============================================================================
// Module: Upgrade Pipeline
// Description: Runs registered disk layout upgrades against the live stamp.
// Purpose: Bring an enlistment to the current layout exactly once per step.
// Dependencies: overlay-state-core, overlay-state-store-sqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`UpgradePipeline::run_all`] takes the enlistment's exclusive upgrade lock,
//! opens the metadata store, and repeatedly runs the step registered for the
//! current stamp. The stamp advances only after a step succeeds, so a failure
//! or crash leaves it at the last completed version and the interrupted step
//! reruns on the next start.
//!
//! The run ends when no step matches the stamp. Ending anywhere other than
//! [`CURRENT_SCHEMA_VERSION`] is an error: either the store was written by a
//! newer build or it is at a version this build cannot upgrade.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::TryLockError;
use std::path::Path;

use overlay_state_core::CURRENT_SCHEMA_VERSION;
use overlay_state_core::EnlistmentLayout;
use overlay_state_core::FileSystem;
use overlay_state_core::TraceEvent;
use overlay_state_core::TraceLevel;
use overlay_state_core::Tracer;
use overlay_state_store_sqlite::MetadataStore;
use overlay_state_store_sqlite::SqliteStoreConfig;
use overlay_state_store_sqlite::StoreError;
use serde::Serialize;
use thiserror::Error;

use crate::legacy::LegacyStoreError;
use crate::registry::UpgradeContext;
use crate::registry::UpgradeRegistry;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Disk layout upgrade errors.
#[derive(Debug, Error)]
pub enum UpgradeError {
    /// Legacy placeholder file could not be read or written.
    #[error(transparent)]
    Legacy(#[from] LegacyStoreError),
    /// Metadata store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Lock file could not be created or opened.
    #[error("upgrade io error: {0}")]
    Io(String),
    /// Another process holds the upgrade lock.
    #[error("upgrade lock is held by another process: {0}")]
    Locked(String),
    /// No registered step leads from the stamped version to the current one.
    #[error("no upgrade path from version {version} to {expected}")]
    NoUpgradePath {
        /// Version found in the store.
        version: i64,
        /// Version this build requires.
        expected: i64,
    },
    /// A step reported failure; the stamp was not advanced.
    #[error("upgrade step {name} from version {source_version} failed: {reason}")]
    StepFailed {
        /// Version the step upgrades from.
        source_version: i64,
        /// Step name.
        name: String,
        /// Failure description.
        reason: String,
    },
    /// Registry contents are inconsistent.
    #[error("invalid upgrade registry: {0}")]
    InvalidRegistry(String),
}

// ============================================================================
// SECTION: Report
// ============================================================================

/// One step applied during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedStep {
    /// Version the step upgraded from.
    pub source_version: i64,
    /// Version stamped after the step.
    pub target_version: i64,
    /// Step name.
    pub name: String,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpgradeReport {
    /// Stamp read when the run started.
    pub starting_version: i64,
    /// Stamp when the run finished.
    pub final_version: i64,
    /// Steps applied, in order.
    pub applied: Vec<AppliedStep>,
}

impl UpgradeReport {
    /// Returns true when the store was already current.
    #[must_use]
    pub const fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

// ============================================================================
// SECTION: Pipeline
// ============================================================================

/// Runs an [`UpgradeRegistry`] to completion.
pub struct UpgradePipeline {
    /// Registered steps.
    registry: UpgradeRegistry,
}

impl Default for UpgradePipeline {
    fn default() -> Self {
        Self::new(UpgradeRegistry::standard())
    }
}

impl UpgradePipeline {
    /// Creates a pipeline over a registry.
    #[must_use]
    pub const fn new(registry: UpgradeRegistry) -> Self {
        Self {
            registry,
        }
    }

    /// Returns the registry.
    #[must_use]
    pub const fn registry(&self) -> &UpgradeRegistry {
        &self.registry
    }

    /// Upgrades the enlistment to [`CURRENT_SCHEMA_VERSION`].
    ///
    /// Every failure is traced before it is returned.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::Locked`] when another upgrade is running,
    /// [`UpgradeError::StepFailed`] when a step fails, and
    /// [`UpgradeError::NoUpgradePath`] when the stamp cannot reach the
    /// current version.
    pub fn run_all(
        &self,
        layout: &EnlistmentLayout,
        store_config: &SqliteStoreConfig,
        fs: &dyn FileSystem,
        tracer: &dyn Tracer,
    ) -> Result<UpgradeReport, UpgradeError> {
        self.upgrade_and_hold(layout, store_config, fs, tracer).map(|upgraded| upgraded.report)
    }

    /// Upgrades the enlistment and keeps its upgrade lock held.
    ///
    /// The returned [`UpgradedStore`] owns the lock, so no other pipeline can
    /// run against the enlistment until it is dropped.
    pub(crate) fn upgrade_and_hold(
        &self,
        layout: &EnlistmentLayout,
        store_config: &SqliteStoreConfig,
        fs: &dyn FileSystem,
        tracer: &dyn Tracer,
    ) -> Result<UpgradedStore, UpgradeError> {
        let result = UpgradeLock::acquire(fs, &layout.upgrade_lock_path()).and_then(|lock| {
            let (store, report) = self.run_steps(layout, store_config, fs, tracer)?;
            Ok(UpgradedStore {
                lock,
                store,
                report,
            })
        });
        if let Err(err) = &result {
            tracer.record(TraceEvent::new(TraceLevel::Error, "upgrade_failed", err.to_string()));
        }
        result
    }

    /// Runs every applicable step; the caller holds the upgrade lock.
    fn run_steps(
        &self,
        layout: &EnlistmentLayout,
        store_config: &SqliteStoreConfig,
        fs: &dyn FileSystem,
        tracer: &dyn Tracer,
    ) -> Result<(MetadataStore, UpgradeReport), UpgradeError> {
        let store = MetadataStore::open(store_config, fs, tracer)?;
        let starting_version = store.version()?;
        tracer.record(
            TraceEvent::new(TraceLevel::Info, "upgrade_started", "checking disk layout version")
                .with_field("version", starting_version)
                .with_field("target", CURRENT_SCHEMA_VERSION),
        );
        let context = UpgradeContext {
            layout,
            store: &store,
            fs,
            tracer,
        };
        let mut version = starting_version;
        let mut applied = Vec::new();
        while let Some(step) = self.registry.step_for(version) {
            tracer.record(
                TraceEvent::new(TraceLevel::Info, "upgrade_step_started", step.name())
                    .with_field("source_version", version),
            );
            if let Err(err) = step.run(&context) {
                tracer.record(
                    TraceEvent::new(TraceLevel::Error, "upgrade_step_failed", err.to_string())
                        .with_field("step", step.name())
                        .with_field("source_version", version),
                );
                return Err(UpgradeError::StepFailed {
                    source_version: version,
                    name: step.name().to_string(),
                    reason: err.to_string(),
                });
            }
            let target = step.target_version();
            store.set_version(target)?;
            tracer.record(
                TraceEvent::new(TraceLevel::Info, "upgrade_version_advanced", step.name())
                    .with_field("source_version", version)
                    .with_field("target_version", target),
            );
            applied.push(AppliedStep {
                source_version: version,
                target_version: target,
                name: step.name().to_string(),
            });
            version = target;
        }
        if version != CURRENT_SCHEMA_VERSION {
            return Err(UpgradeError::NoUpgradePath {
                version,
                expected: CURRENT_SCHEMA_VERSION,
            });
        }
        tracer.record(
            TraceEvent::new(TraceLevel::Info, "upgrade_completed", "disk layout is current")
                .with_field("starting_version", starting_version)
                .with_field("applied", applied.len()),
        );
        let report = UpgradeReport {
            starting_version,
            final_version: version,
            applied,
        };
        Ok((store, report))
    }
}

/// A current store together with the upgrade lock that guarded its upgrade.
pub(crate) struct UpgradedStore {
    /// Held upgrade lock.
    pub(crate) lock: UpgradeLock,
    /// Store at the current version.
    pub(crate) store: MetadataStore,
    /// Outcome of the run.
    pub(crate) report: UpgradeReport,
}

// ============================================================================
// SECTION: Lock
// ============================================================================

/// Exclusive advisory lock on the enlistment's upgrade lock file.
///
/// Released when dropped.
pub(crate) struct UpgradeLock {
    /// Locked file handle.
    file: File,
}

impl UpgradeLock {
    /// Takes the lock without blocking.
    fn acquire(fs: &dyn FileSystem, path: &Path) -> Result<Self, UpgradeError> {
        if let Some(parent) = path.parent() {
            fs.create_dir_all(parent).map_err(|err| UpgradeError::Io(err.to_string()))?;
        }
        let file = fs.open_lock_file(path).map_err(|err| UpgradeError::Io(err.to_string()))?;
        match file.try_lock() {
            Ok(()) => Ok(Self {
                file,
            }),
            Err(TryLockError::WouldBlock) => Err(UpgradeError::Locked(path.display().to_string())),
            Err(TryLockError::Error(err)) => Err(UpgradeError::Io(err.to_string())),
        }
    }
}

impl Drop for UpgradeLock {
    fn drop(&mut self) {
        // Closing the handle releases the lock as well, so a failed unlock
        // cannot leave the enlistment locked.
        let _ = self.file.unlock();
    }
}
