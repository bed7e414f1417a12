// crates/overlay-state-config/src/config.rs
// ============================================================================
// Module: Overlay State Configuration
// Description: Configuration loading and validation for local state tooling.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: overlay-state-core, overlay-state-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and defaults to the standard enlistment layout:
//! a store with a 40 MB cache, traced to stderr. WAL journaling and full
//! synchronous commits are not configurable. When no
//! path is given and neither the environment override nor the default file
//! exists, the defaults are used as-is.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use overlay_state_core::DEFAULT_STATE_DIR;
use overlay_state_core::EnlistmentLayout;
use overlay_state_core::FileTracer;
use overlay_state_core::NoopTracer;
use overlay_state_core::StderrTracer;
use overlay_state_core::Tracer;
use overlay_state_store_sqlite::DEFAULT_CACHE_SIZE_KIB;
use overlay_state_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "overlay-state.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "OVERLAY_STATE_CONFIG";
/// Maximum configuration file size in bytes.
pub const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Upper bound for the busy timeout in milliseconds.
const MAX_BUSY_TIMEOUT_MS: u64 = 600_000;
/// Upper bound for the page cache budget in KiB (4 GiB).
const MAX_CACHE_SIZE_KIB: u32 = 4 * 1024 * 1024;

// ============================================================================
// SECTION: Config Model
// ============================================================================

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverlayStateConfig {
    /// Enlistment layout settings.
    #[serde(default)]
    pub layout: LayoutConfig,
    /// Metadata store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Trace sink settings.
    #[serde(default)]
    pub tracing: TracingConfig,
}

impl OverlayStateConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (resolved, explicit) = resolve_path(path)?;
        validate_path(&resolved)?;
        if !explicit && !resolved.is_file() {
            return Ok(Self::default());
        }
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.layout.validate()?;
        self.store.validate()?;
        self.tracing.validate()
    }

    /// Builds the enlistment layout, preferring `root_override` when given.
    #[must_use]
    pub fn enlistment_layout(&self, root_override: Option<&Path>) -> EnlistmentLayout {
        let root = root_override.map_or_else(|| self.layout.root.clone(), Path::to_path_buf);
        EnlistmentLayout::with_state_dir(root, self.layout.state_dir.clone())
    }

    /// Builds the store configuration for an enlistment.
    #[must_use]
    pub fn store_config(&self, layout: &EnlistmentLayout) -> SqliteStoreConfig {
        let path = self.store.path.clone().unwrap_or_else(|| layout.metadata_store_path());
        SqliteStoreConfig {
            path,
            busy_timeout_ms: self.store.busy_timeout_ms,
            cache_size_kib: self.store.cache_size_kib,
        }
    }
}

/// Enlistment layout configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LayoutConfig {
    /// Enlistment root directory.
    #[serde(default = "default_enlistment_root")]
    pub root: PathBuf,
    /// State directory relative to the root.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            root: default_enlistment_root(),
            state_dir: default_state_dir(),
        }
    }
}

impl LayoutConfig {
    /// Validates layout configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("layout.root", &self.root.to_string_lossy())?;
        validate_path_string("layout.state_dir", &self.state_dir.to_string_lossy())?;
        let escapes = self
            .state_dir
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(ConfigError::Invalid(
                "layout.state_dir must be relative and stay inside the enlistment".to_string(),
            ));
        }
        Ok(())
    }
}

/// Metadata store configuration.
///
/// Journal and synchronous modes are fixed by the store and have no keys
/// here, so a file naming them fails to parse.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Store file override; defaults to the layout's databases directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_store_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Page cache budget in KiB.
    #[serde(default = "default_cache_size_kib")]
    pub cache_size_kib: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: default_store_busy_timeout_ms(),
            cache_size_kib: default_cache_size_kib(),
        }
    }
}

impl StoreConfig {
    /// Validates store configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.path {
            validate_path_string("store.path", &path.to_string_lossy())?;
        }
        if self.busy_timeout_ms > MAX_BUSY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "store.busy_timeout_ms must be at most {MAX_BUSY_TIMEOUT_MS}"
            )));
        }
        if self.cache_size_kib == 0 || self.cache_size_kib > MAX_CACHE_SIZE_KIB {
            return Err(ConfigError::Invalid(format!(
                "store.cache_size_kib must be between 1 and {MAX_CACHE_SIZE_KIB}"
            )));
        }
        Ok(())
    }
}

/// Trace sink selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TraceSinkKind {
    /// JSON lines on stderr.
    #[default]
    Stderr,
    /// JSON lines appended to a file.
    File,
    /// Discard events.
    None,
}

/// Trace sink configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracingConfig {
    /// Sink kind.
    #[serde(default)]
    pub sink: TraceSinkKind,
    /// Log file path for the file sink.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl TracingConfig {
    /// Validates trace sink configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        match (self.sink, &self.path) {
            (TraceSinkKind::File, None) => {
                Err(ConfigError::Invalid("file tracing sink requires tracing.path".to_string()))
            }
            (TraceSinkKind::File, Some(path)) => {
                validate_path_string("tracing.path", &path.to_string_lossy())
            }
            (_, Some(_)) => {
                Err(ConfigError::Invalid("tracing.path is only valid for the file sink".to_string()))
            }
            (_, None) => Ok(()),
        }
    }

    /// Builds the configured tracer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] when the trace file cannot be opened.
    pub fn build_tracer(&self) -> Result<Box<dyn Tracer>, ConfigError> {
        match (self.sink, &self.path) {
            (TraceSinkKind::Stderr, _) => Ok(Box::new(StderrTracer)),
            (TraceSinkKind::None, _) => Ok(Box::new(NoopTracer)),
            (TraceSinkKind::File, Some(path)) => {
                let tracer = FileTracer::new(path).map_err(|err| ConfigError::Io(err.to_string()))?;
                Ok(Box::new(tracer))
            }
            (TraceSinkKind::File, None) => {
                Err(ConfigError::Invalid("file tracing sink requires tracing.path".to_string()))
            }
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
///
/// Returns the path and whether it was requested explicitly.
fn resolve_path(path: Option<&Path>) -> Result<(PathBuf, bool), ConfigError> {
    if let Some(path) = path {
        return Ok((path.to_path_buf(), true));
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok((PathBuf::from(env_path), true));
    }
    Ok((PathBuf::from(DEFAULT_CONFIG_NAME), false))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    for component in Path::new(trimmed).components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}

/// Default enlistment root (the working directory).
fn default_enlistment_root() -> PathBuf {
    PathBuf::from(".")
}

/// Default state directory name.
fn default_state_dir() -> PathBuf {
    PathBuf::from(DEFAULT_STATE_DIR)
}

/// Default store busy timeout in milliseconds.
const fn default_store_busy_timeout_ms() -> u64 {
    5_000
}

/// Default page cache budget in KiB.
const fn default_cache_size_kib() -> u32 {
    DEFAULT_CACHE_SIZE_KIB
}
