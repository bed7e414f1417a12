// crates/overlay-state-config/src/lib.rs
// ============================================================================
// Module: Overlay State Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for overlay-state.toml semantics.
// Dependencies: overlay-state-core, overlay-state-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `overlay-state-config` defines the configuration model for the enlistment
//! layout, metadata store pragmas, and trace sink. Validation is strict and
//! fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
