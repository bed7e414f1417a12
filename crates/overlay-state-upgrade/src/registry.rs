// crates/overlay-state-upgrade/src/registry.rs
// ============================================================================
// Module: Upgrade Registry
// Description: Ordered set of version-gated disk layout upgrade steps.
// Purpose: Map each source version to the single step that leaves it.
// Dependencies: overlay-state-core, overlay-state-store-sqlite
// ============================================================================

//! ## Overview
//! An [`UpgradeStep`] transforms on-disk state from `source_version` to
//! `source_version + 1`. Steps are stateless; everything they touch is passed
//! in through [`UpgradeContext`]. The pipeline, not the step, advances the
//! version stamp after a step returns successfully.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use overlay_state_core::EnlistmentLayout;
use overlay_state_core::FileSystem;
use overlay_state_core::Tracer;
use overlay_state_store_sqlite::MetadataStore;

use crate::pipeline::UpgradeError;
use crate::steps::standard_steps;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Collaborators available to an upgrade step.
pub struct UpgradeContext<'a> {
    /// Enlistment layout used to locate state files.
    pub layout: &'a EnlistmentLayout,
    /// Open metadata store; the version stamp is owned by the pipeline.
    pub store: &'a MetadataStore,
    /// File system used for legacy file access.
    pub fs: &'a dyn FileSystem,
    /// Structured event sink.
    pub tracer: &'a dyn Tracer,
}

/// Step body signature.
pub type StepFn = dyn Fn(&UpgradeContext<'_>) -> Result<(), UpgradeError> + Send + Sync;

/// One disk layout transformation keyed by the version it upgrades from.
pub struct UpgradeStep {
    /// Version this step upgrades from.
    source_version: i64,
    /// Stable step name used in traces and reports.
    name: String,
    /// Step body.
    run: Box<StepFn>,
}

impl UpgradeStep {
    /// Creates a step from a body function.
    pub fn new(
        source_version: i64,
        name: impl Into<String>,
        run: impl Fn(&UpgradeContext<'_>) -> Result<(), UpgradeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            source_version,
            name: name.into(),
            run: Box::new(run),
        }
    }

    /// Returns the version this step upgrades from.
    #[must_use]
    pub const fn source_version(&self) -> i64 {
        self.source_version
    }

    /// Returns the version the stamp advances to after this step.
    #[must_use]
    pub const fn target_version(&self) -> i64 {
        self.source_version + 1
    }

    /// Returns the step name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the step body.
    ///
    /// # Errors
    ///
    /// Returns whatever error the step body reports.
    pub fn run(&self, context: &UpgradeContext<'_>) -> Result<(), UpgradeError> {
        (self.run)(context)
    }
}

// ============================================================================
// SECTION: Registry
// ============================================================================

/// Steps indexed by source version.
pub struct UpgradeRegistry {
    /// Steps in ascending source-version order.
    steps: BTreeMap<i64, UpgradeStep>,
}

impl UpgradeRegistry {
    /// Builds a registry from custom steps.
    ///
    /// # Errors
    ///
    /// Returns [`UpgradeError::InvalidRegistry`] when two steps share a
    /// source version.
    pub fn new(steps: Vec<UpgradeStep>) -> Result<Self, UpgradeError> {
        let mut indexed = BTreeMap::new();
        for step in steps {
            let version = step.source_version;
            if indexed.insert(version, step).is_some() {
                return Err(UpgradeError::InvalidRegistry(format!(
                    "duplicate upgrade step for source version {version}"
                )));
            }
        }
        Ok(Self {
            steps: indexed,
        })
    }

    /// Returns the registry of steps shipped with this build.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            steps: standard_steps().into_iter().map(|step| (step.source_version, step)).collect(),
        }
    }

    /// Returns the step that upgrades from `version`, if any.
    #[must_use]
    pub fn step_for(&self, version: i64) -> Option<&UpgradeStep> {
        self.steps.get(&version)
    }

    /// Returns every step in ascending source-version order.
    pub fn steps(&self) -> impl Iterator<Item = &UpgradeStep> {
        self.steps.values()
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
