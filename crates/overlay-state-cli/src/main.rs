// crates/overlay-state-cli/src/main.rs
// ============================================================================
// Module: Overlay State CLI Entry Point
// Description: Command dispatcher for enlistment local-state maintenance.
// Purpose: Upgrade, inspect, and edit tracked path state from the shell.
// Dependencies: clap, overlay-state-config, overlay-state-upgrade, serde_json, thiserror
// ============================================================================

//! ## Overview
//! Every command first brings the enlistment to the current disk layout via
//! the upgrade pipeline, then reads or edits the tracked path tables. The CLI
//! never invokes the version-control tool; changing the included folder set
//! only updates the store.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use clap::Parser;
use clap::Subcommand;
use overlay_state_config::OverlayStateConfig;
use overlay_state_core::CURRENT_SCHEMA_VERSION;
use overlay_state_core::ContentMarker;
use overlay_state_core::IncludedFolder;
use overlay_state_core::PhysicalFileSystem;
use overlay_state_core::TrackedPath;
use overlay_state_store_sqlite::StoreError;
use overlay_state_upgrade::EnlistmentSession;
use overlay_state_upgrade::UpgradePipeline;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Separator between folders in `include add` and `include remove`.
const FOLDER_LIST_SEPARATOR: char = ';';

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "overlay-state", disable_help_subcommand = true)]
struct Cli {
    /// Config file path (overrides `OVERLAY_STATE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Enlistment root (overrides `layout.root`).
    #[arg(long, value_name = "DIR", global = true)]
    root: Option<PathBuf>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Upgrade the disk layout and print the report as JSON.
    Upgrade,
    /// Print the disk layout version.
    Version,
    /// Inspect or edit the included folder set.
    Include {
        /// Selected include subcommand.
        #[command(subcommand)]
        command: IncludeCommand,
    },
    /// Inspect placeholders.
    Placeholders {
        /// Selected placeholders subcommand.
        #[command(subcommand)]
        command: ListCommand,
    },
    /// Inspect modified paths.
    Modified {
        /// Selected modified subcommand.
        #[command(subcommand)]
        command: ListCommand,
    },
}

/// Included folder subcommands.
#[derive(Subcommand, Debug)]
enum IncludeCommand {
    /// List included folders.
    List,
    /// Add folders to the included set.
    Add(FolderListArgs),
    /// Remove folders from the included set.
    Remove(FolderListArgs),
}

/// Arguments naming a set of folders.
#[derive(Args, Debug)]
struct FolderListArgs {
    /// Semicolon-delimited list of root-relative folders.
    folders: String,
}

/// Read-only table subcommands.
#[derive(Subcommand, Debug)]
enum ListCommand {
    /// List every entry ordered by path.
    List,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

/// Maps a store failure to a CLI error.
fn store_error(err: &StoreError) -> CliError {
    CliError::new(format!("metadata store failure: {err}"))
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let config = OverlayStateConfig::load(cli.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let tracer = config
        .tracing
        .build_tracer()
        .map_err(|err| CliError::new(format!("failed to open trace sink: {err}")))?;
    let layout = config.enlistment_layout(cli.root.as_deref());
    let store_config = config.store_config(&layout);
    let session = EnlistmentSession::open(
        layout,
        &store_config,
        &UpgradePipeline::default(),
        &PhysicalFileSystem,
        tracer.as_ref(),
    )
    .map_err(|err| CliError::new(format!("disk layout upgrade failed: {err}")))?;
    for line in execute(&session, cli.command)? {
        write_stdout_line(&line)
            .map_err(|err| CliError::new(format!("failed to write stdout: {err}")))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs one command against an upgraded session and returns output lines.
fn execute(session: &EnlistmentSession, command: Commands) -> CliResult<Vec<String>> {
    match command {
        Commands::Upgrade => command_upgrade(session),
        Commands::Version => command_version(session),
        Commands::Include {
            command,
        } => command_include(session, command),
        Commands::Placeholders {
            command: ListCommand::List,
        } => command_placeholders(session),
        Commands::Modified {
            command: ListCommand::List,
        } => command_modified(session),
    }
}

// ============================================================================
// SECTION: Commands
// ============================================================================

/// Prints the startup upgrade report.
fn command_upgrade(session: &EnlistmentSession) -> CliResult<Vec<String>> {
    let report = serde_json::to_string_pretty(session.report())
        .map_err(|err| CliError::new(format!("failed to render upgrade report: {err}")))?;
    Ok(vec![report])
}

/// Prints the stamped and supported disk layout versions.
fn command_version(session: &EnlistmentSession) -> CliResult<Vec<String>> {
    let version = session.store().version().map_err(|err| store_error(&err))?;
    let mut lines = vec![format!("disk layout version {version} (supported {CURRENT_SCHEMA_VERSION})")];
    let report = session.report();
    if !report.is_noop() {
        lines.push(format!("upgraded from version {}", report.starting_version));
    }
    Ok(lines)
}

/// Lists or edits the included folder set.
fn command_include(session: &EnlistmentSession, command: IncludeCommand) -> CliResult<Vec<String>> {
    let tables = session.tables().map_err(|err| store_error(&err))?;
    let included = tables.included_folders();
    match command {
        IncludeCommand::List => {
            let folders = included.get_all().map_err(|err| store_error(&err))?;
            if folders.is_empty() {
                return Ok(vec!["No folders in included list.".to_string()]);
            }
            Ok(folders.into_iter().map(|folder| folder.path.to_string()).collect())
        }
        IncludeCommand::Add(args) => {
            let mut changed = 0_usize;
            for path in parse_folder_list(&args.folders)? {
                if included.add(&IncludedFolder::new(path)).map_err(|err| store_error(&err))? {
                    changed += 1;
                }
            }
            Ok(vec![folder_update_summary("Added", changed)])
        }
        IncludeCommand::Remove(args) => {
            let mut changed = 0_usize;
            for path in parse_folder_list(&args.folders)? {
                if included.remove(&path).map_err(|err| store_error(&err))? {
                    changed += 1;
                }
            }
            Ok(vec![folder_update_summary("Removed", changed)])
        }
    }
}

/// Lists placeholders as `marker<TAB>path`.
fn command_placeholders(session: &EnlistmentSession) -> CliResult<Vec<String>> {
    let tables = session.tables().map_err(|err| store_error(&err))?;
    let entries = tables.placeholders().get_all().map_err(|err| store_error(&err))?;
    if entries.is_empty() {
        return Ok(vec!["No placeholders.".to_string()]);
    }
    Ok(entries
        .into_iter()
        .map(|entry| format!("{}\t{}", marker_label(&entry.marker), entry.path))
        .collect())
}

/// Lists modified paths as `kind<TAB>path`.
fn command_modified(session: &EnlistmentSession) -> CliResult<Vec<String>> {
    let tables = session.tables().map_err(|err| store_error(&err))?;
    let entries = tables.modified_paths().get_all().map_err(|err| store_error(&err))?;
    if entries.is_empty() {
        return Ok(vec!["No modified paths.".to_string()]);
    }
    Ok(entries.into_iter().map(|entry| format!("{}\t{}", entry.kind.as_str(), entry.path)).collect())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Splits a semicolon-delimited folder list, dropping empty items.
fn parse_folder_list(raw: &str) -> CliResult<Vec<TrackedPath>> {
    raw.split(FOLDER_LIST_SEPARATOR)
        .filter(|item| !item.is_empty())
        .map(|item| {
            TrackedPath::parse(item)
                .map_err(|err| CliError::new(format!("invalid folder '{item}': {err}")))
        })
        .collect()
}

/// Describes the outcome of an include edit.
fn folder_update_summary(verb: &str, changed: usize) -> String {
    if changed == 0 {
        "No folders to update in included set.".to_string()
    } else {
        format!("{verb} {changed} folder(s) in the included set.")
    }
}

/// Renders a marker, naming the sentinels.
fn marker_label(marker: &ContentMarker) -> &str {
    match marker {
        ContentMarker::AllZero => "all_zero",
        ContentMarker::PartialFolder => "partial_folder",
        ContentMarker::Content(id) => id,
    }
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
