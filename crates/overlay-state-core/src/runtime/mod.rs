// crates/overlay-state-core/src/runtime/mod.rs
// ============================================================================
// Module: Overlay State Runtime Implementations
// Description: Default implementations of the collaborator interfaces.
// Purpose: Provide physical filesystem access and JSON-line tracing sinks.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! Runtime implementations back the [`crate::interfaces`] traits with the
//! local filesystem and JSON-line trace sinks.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod filesystem;
pub mod tracer;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use filesystem::PhysicalFileSystem;
pub use tracer::FileTracer;
pub use tracer::MemoryTracer;
pub use tracer::NoopTracer;
pub use tracer::StderrTracer;
