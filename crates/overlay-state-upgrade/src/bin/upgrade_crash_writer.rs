//! Upgrade crash writer for disk layout recovery tests.
// crates/overlay-state-upgrade/src/bin/upgrade_crash_writer.rs
// ============================================================================
// Binary: Upgrade Crash Writer
// Description: Aborts right after an upgrade step writes, before the stamp.
// Purpose: Support crash recovery tests for the upgrade pipeline.
// Dependencies: overlay-state-core, overlay-state-store-sqlite, overlay-state-upgrade
// ============================================================================

use std::env;
use std::path::PathBuf;

use overlay_state_core::EnlistmentLayout;
use overlay_state_core::NoopTracer;
use overlay_state_core::PhysicalFileSystem;
use overlay_state_store_sqlite::SqliteStoreConfig;
use overlay_state_upgrade::UpgradePipeline;
use overlay_state_upgrade::UpgradeRegistry;
use overlay_state_upgrade::UpgradeStep;
use overlay_state_upgrade::steps::standard_steps;

/// Runs the standard pipeline with the selected step aborting after it writes.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let root = args.next().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "missing enlistment root")
    })?;
    let crash_after: i64 = args.next().map(|raw| raw.parse()).transpose()?.unwrap_or(16);

    let layout = EnlistmentLayout::new(PathBuf::from(root));
    let config = SqliteStoreConfig::new(layout.metadata_store_path());
    let steps = standard_steps()
        .into_iter()
        .map(|step| {
            if step.source_version() != crash_after {
                return step;
            }
            let source_version = step.source_version();
            let name = step.name().to_string();
            UpgradeStep::new(source_version, name, move |context| {
                step.run(context)?;
                std::process::abort();
            })
        })
        .collect();
    let pipeline = UpgradePipeline::new(UpgradeRegistry::new(steps)?);
    pipeline.run_all(&layout, &config, &PhysicalFileSystem, &NoopTracer)?;
    Ok(())
}
