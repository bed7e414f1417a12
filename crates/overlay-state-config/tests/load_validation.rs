//! Config load validation tests for overlay-state-config.
// crates/overlay-state-config/tests/load_validation.rs
// =============================================================================
// Module: Config Load Validation Tests
// Description: Validate config loading guards and section validation.
// Purpose: Ensure config input handling is strict and fail-closed.
// =============================================================================

use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use overlay_state_config::ConfigError;
use overlay_state_config::OverlayStateConfig;
use overlay_state_config::TraceSinkKind;
use overlay_state_core::Tracer;
use overlay_state_store_sqlite::DEFAULT_CACHE_SIZE_KIB;
use tempfile::NamedTempFile;
use tempfile::TempDir;

type TestResult = Result<(), String>;

fn assert_invalid(result: Result<OverlayStateConfig, ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error {message} did not contain {needle}"))
            }
        }
        Ok(_) => Err("expected invalid config load".to_string()),
    }
}

fn ensure(condition: bool, message: &str) -> TestResult {
    if condition { Ok(()) } else { Err(message.to_string()) }
}

#[test]
fn load_rejects_path_too_long() -> TestResult {
    let long_path = "a".repeat(5_000);
    let path = Path::new(&long_path);
    assert_invalid(OverlayStateConfig::load(Some(path)), "config path exceeds max length")
}

#[test]
fn load_rejects_path_component_too_long() -> TestResult {
    let long_component = "a".repeat(300);
    let path = Path::new(&long_component);
    assert_invalid(OverlayStateConfig::load(Some(path)), "config path component too long")
}

#[test]
fn load_rejects_oversized_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    let payload = vec![b'#'; 1_048_577];
    file.write_all(&payload).map_err(|err| err.to_string())?;
    assert_invalid(OverlayStateConfig::load(Some(file.path())), "config file exceeds size limit")
}

#[test]
fn load_rejects_non_utf8_file() -> TestResult {
    let mut file = NamedTempFile::new().map_err(|err| err.to_string())?;
    file.write_all(&[0xFF, 0xFE, 0xFF]).map_err(|err| err.to_string())?;
    assert_invalid(OverlayStateConfig::load(Some(file.path())), "config file must be utf-8")
}

#[test]
fn explicit_missing_file_fails_closed() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let missing = temp.path().join("absent.toml");
    assert_invalid(OverlayStateConfig::load(Some(&missing)), "config io error")
}

#[test]
fn empty_file_yields_durable_defaults() -> TestResult {
    let config = OverlayStateConfig::from_toml_str("").map_err(|err| err.to_string())?;
    ensure(config == OverlayStateConfig::default(), "empty config should equal defaults")?;
    ensure(config.store.cache_size_kib == DEFAULT_CACHE_SIZE_KIB, "default cache size")?;
    ensure(config.tracing.sink == TraceSinkKind::Stderr, "default sink")
}

#[test]
fn store_config_follows_the_layout_unless_overridden() -> TestResult {
    let config = OverlayStateConfig::from_toml_str(
        "[layout]\nroot = \"/work/repo\"\nstate_dir = \".state\"\n\n[store]\nbusy_timeout_ms = \
         250\ncache_size_kib = 2048\n",
    )
    .map_err(|err| err.to_string())?;
    let layout = config.enlistment_layout(None);
    let store = config.store_config(&layout);
    ensure(
        store.path == PathBuf::from("/work/repo/.state/databases/VFSForGit.sqlite"),
        "store path should live under the state dir",
    )?;
    ensure(store.busy_timeout_ms == 250, "busy timeout override")?;
    ensure(store.cache_size_kib == 2048, "cache size override")?;

    let overridden = config.enlistment_layout(Some(Path::new("/other")));
    ensure(overridden.root() == Path::new("/other"), "root override")
}

#[test]
fn unknown_fields_are_rejected() -> TestResult {
    assert_invalid(OverlayStateConfig::from_toml_str("[store]\nwal = true\n"), "config parse error")
}

#[test]
fn durability_settings_cannot_be_configured() -> TestResult {
    assert_invalid(
        OverlayStateConfig::from_toml_str("[store]\njournal_mode = \"delete\"\n"),
        "config parse error",
    )?;
    assert_invalid(
        OverlayStateConfig::from_toml_str("[store]\nsync_mode = \"normal\"\n"),
        "config parse error",
    )
}

#[test]
fn state_dir_must_stay_inside_the_enlistment() -> TestResult {
    assert_invalid(
        OverlayStateConfig::from_toml_str("[layout]\nstate_dir = \"../elsewhere\"\n"),
        "layout.state_dir must be relative",
    )?;
    assert_invalid(
        OverlayStateConfig::from_toml_str("[layout]\nstate_dir = \"/abs\"\n"),
        "layout.state_dir must be relative",
    )
}

#[test]
fn cache_budget_must_be_positive() -> TestResult {
    assert_invalid(
        OverlayStateConfig::from_toml_str("[store]\ncache_size_kib = 0\n"),
        "store.cache_size_kib",
    )
}

#[test]
fn file_sink_requires_a_path() -> TestResult {
    assert_invalid(
        OverlayStateConfig::from_toml_str("[tracing]\nsink = \"file\"\n"),
        "requires tracing.path",
    )?;
    assert_invalid(
        OverlayStateConfig::from_toml_str("[tracing]\nsink = \"none\"\npath = \"x.log\"\n"),
        "only valid for the file sink",
    )
}

#[test]
fn file_sink_builds_an_appending_tracer() -> TestResult {
    let temp = TempDir::new().map_err(|err| err.to_string())?;
    let log = temp.path().join("trace.jsonl");
    let text = format!("[tracing]\nsink = \"file\"\npath = '{}'\n", log.display());
    let config = OverlayStateConfig::from_toml_str(&text).map_err(|err| err.to_string())?;
    let tracer = config.tracing.build_tracer().map_err(|err| err.to_string())?;
    Tracer::info(tracer.as_ref(), "config_loaded", "ok");
    drop(tracer);
    let contents = std::fs::read_to_string(&log).map_err(|err| err.to_string())?;
    ensure(contents.contains("\"event\":\"config_loaded\""), "trace line should be written")
}
