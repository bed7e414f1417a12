// crates/overlay-state-core/src/runtime/tracer.rs
// ============================================================================
// Module: Trace Sinks
// Description: JSON-line and in-memory implementations of the Tracer interface.
// Purpose: Route structured store and upgrade events without hard dependencies.
// Dependencies: serde_json, crate::interfaces
// ============================================================================

//! ## Overview
//! Sinks serialize each [`TraceEvent`] as one JSON object per line. Output
//! failures are dropped on the floor: tracing is fire-and-forget and must
//! never turn a successful store operation into a failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use crate::interfaces::TraceEvent;
use crate::interfaces::Tracer;

// ============================================================================
// SECTION: Sinks
// ============================================================================

/// Tracer that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl Tracer for NoopTracer {
    fn record(&self, _event: TraceEvent) {}
}

/// Tracer that logs JSON lines to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn record(&self, event: TraceEvent) {
        if let Ok(payload) = serde_json::to_string(&event) {
            let _ = writeln!(std::io::stderr(), "{payload}");
        }
    }
}

/// Tracer that appends JSON lines to a file.
pub struct FileTracer {
    /// File handle used for append-only logging.
    file: Mutex<std::fs::File>,
}

impl FileTracer {
    /// Opens the trace log file in append mode, creating it if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl Tracer for FileTracer {
    fn record(&self, event: TraceEvent) {
        let Ok(payload) = serde_json::to_string(&event) else {
            return;
        };
        if let Ok(mut guard) = self.file.lock() {
            let _ = writeln!(guard, "{payload}");
        }
    }
}

/// Tracer that keeps events in memory for inspection.
#[derive(Debug, Default)]
pub struct MemoryTracer {
    /// Recorded events in arrival order.
    events: Mutex<Vec<TraceEvent>>,
}

impl MemoryTracer {
    /// Creates an empty in-memory tracer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<TraceEvent> {
        self.events.lock().map(|guard| guard.clone()).unwrap_or_default()
    }

    /// Returns the recorded events with the given identifier.
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<TraceEvent> {
        self.events().into_iter().filter(|event| event.event == name).collect()
    }
}

impl Tracer for MemoryTracer {
    fn record(&self, event: TraceEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
