// crates/overlay-state-core/src/lib.rs
// ============================================================================
// Module: Overlay State Core Library
// Description: Public API surface for the overlay state core.
// Purpose: Expose tracked-path types, enlistment layout, and collaborator interfaces.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Overlay state core defines the vocabulary shared by the metadata store and
//! the disk layout upgrade pipeline: normalized tracked paths, placeholder
//! content markers, the on-disk enlistment layout, and the `Tracer` and
//! `FileSystem` collaborator interfaces. It carries no storage engine of its
//! own.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use core::*;

pub use interfaces::FileSystem;
pub use interfaces::TraceEvent;
pub use interfaces::TraceLevel;
pub use interfaces::Tracer;
pub use runtime::FileTracer;
pub use runtime::MemoryTracer;
pub use runtime::NoopTracer;
pub use runtime::PhysicalFileSystem;
pub use runtime::StderrTracer;
