// crates/overlay-state-core/tests/trace_sinks.rs
// ============================================================================
// Module: Trace Sink Tests
// Description: Validate JSON-line and in-memory trace sinks.
// Purpose: Ensure trace output is structured and append-only.
// Dependencies: overlay-state-core, serde_json, tempfile
// ============================================================================

//! ## Overview
//! Exercises the trace sinks used by the metadata store and upgrade pipeline.

#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use overlay_state_core::FileTracer;
use overlay_state_core::MemoryTracer;
use overlay_state_core::TraceEvent;
use overlay_state_core::TraceLevel;
use overlay_state_core::Tracer;
use serde_json::Value;
use tempfile::TempDir;

#[test]
fn file_tracer_appends_one_json_object_per_line() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("trace.jsonl");
    {
        let tracer = FileTracer::new(&path).unwrap();
        tracer.info("store_created", "created metadata store");
        tracer.record(
            TraceEvent::new(TraceLevel::Error, "upgrade_step_failed", "boom")
                .with_field("source_version", 16),
        );
    }
    {
        let tracer = FileTracer::new(&path).unwrap();
        tracer.info("store_opened", "reopened");
    }
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<Value> =
        contents.lines().map(|line| serde_json::from_str(line).unwrap()).collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["event"], "store_created");
    assert_eq!(lines[0]["level"], "info");
    assert_eq!(lines[1]["level"], "error");
    assert_eq!(lines[1]["fields"]["source_version"], 16);
    assert_eq!(lines[2]["event"], "store_opened");
}

#[test]
fn memory_tracer_filters_by_event_name() {
    let tracer = MemoryTracer::new();
    tracer.info("a", "first");
    tracer.error("b", "second");
    tracer.info("a", "third");
    let named = tracer.events_named("a");
    assert_eq!(named.len(), 2);
    assert_eq!(named[1].message, "third");
    assert_eq!(tracer.events().len(), 3);
}
