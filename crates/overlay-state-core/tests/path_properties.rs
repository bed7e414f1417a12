// crates/overlay-state-core/tests/path_properties.rs
// ============================================================================
// Module: Tracked Path Property Tests
// Description: Property checks for path normalization and marker parsing.
// Purpose: Ensure normalization is canonical and marker wire forms are stable.
// Dependencies: overlay-state-core, proptest
// ============================================================================

//! ## Overview
//! Normalizing an already-normalized path must be a no-op, and every accepted
//! marker must reproduce its own wire form.

#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "Test-only assertions and helpers are permitted."
)]

use overlay_state_core::ContentMarker;
use overlay_state_core::TrackedPath;
use proptest::prelude::*;

proptest! {
    #[test]
    fn normalization_is_idempotent(raw in "[a-zA-Z0-9 _./\\\\-]{1,48}") {
        if let Ok(path) = TrackedPath::parse(&raw) {
            let again = TrackedPath::parse(path.as_str()).unwrap();
            prop_assert_eq!(again, path.clone());
            prop_assert!(!path.as_str().starts_with('/'));
            prop_assert!(!path.as_str().ends_with('/'));
            prop_assert!(!path.as_str().contains("//"));
        }
    }

    #[test]
    fn marker_wire_form_round_trips(raw in "[ 0-9a-f]{1,40}") {
        let marker = ContentMarker::parse(&raw).unwrap();
        prop_assert_eq!(marker.as_str(), raw.as_str());
        prop_assert_eq!(ContentMarker::parse(marker.as_str()).unwrap(), marker);
    }
}
