// pakt-cli/src/main.rs
mod models;

use anyhow::{anyhow, Context, Result};
use colored::*;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{debug, error, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, time::LocalTime},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use pakt_core::commands::{self, InstallOptions, RemoveOptions};
use pakt_core::{
    CatalogEngine, InterruptAction, Out, OutputMode, PaktError, RuntimeState, Session,
    SessionConfig, Verbosity,
};

use crate::models::cli::{Cli, Commands, InstallArgs, RemoveArgs};

const CONFIG_FILENAME: &str = "pakt.toml";
const CATALOG_FILENAME: &str = "catalog.toml";
const STATE_FILENAME: &str = "installed.json";
const LOG_FILE_NAME: &str = "pakt.log";

// --- Logging ---

fn init_logging(verbose: u8) -> Result<(WorkerGuard, PathBuf)> {
    let default_level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let log_dir = dirs::cache_dir()
        .or_else(dirs::runtime_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("pakt");
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let time_format_desc = time::format_description::parse(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]",
    )
    .context("Failed to parse the log time format")?;
    let local_timer = LocalTime::new(time_format_desc);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_writer)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .with_timer(local_timer.clone());

    let stderr_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_timer(local_timer)
        .with_target(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    info!(
        "Logging initialized. Level determined by RUST_LOG or -v flags (default: {}).",
        default_level
    );
    Ok((guard, log_dir.join(LOG_FILE_NAME)))
}

// --- Configuration ---

fn load_config(cli: &Cli) -> Result<SessionConfig> {
    let path = match &cli.config {
        Some(path) => {
            if !path.is_file() {
                return Err(anyhow!("Config file {} does not exist", path.display()));
            }
            Some(path.clone())
        }
        None => dirs::config_dir()
            .map(|d| d.join("pakt").join(CONFIG_FILENAME))
            .filter(|p| p.is_file()),
    };

    let mut config = match path {
        Some(path) => {
            info!("Found configuration file at: {:?}", path);
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            SessionConfig::from_toml_str(&content)
                .context("Failed to parse or validate configuration content")?
        }
        None => {
            debug!("No configuration file, using defaults.");
            SessionConfig::default()
        }
    };

    // command line wins over the file
    config.non_interactive |= cli.non_interactive;
    config.machine_readable |= cli.machine_readable;
    config.ignore_unknown |= cli.ignore_unknown;
    config.no_color |= cli.no_color;
    if let Some(catalog) = &cli.catalog {
        config.catalog.path = Some(catalog.clone());
    }
    if let Some(state) = &cli.state {
        config.catalog.state = Some(state.clone());
    }
    Ok(config)
}

fn open_engine(config: &SessionConfig) -> Result<CatalogEngine> {
    let catalog = config
        .catalog
        .path
        .clone()
        .or_else(|| dirs::config_dir().map(|d| d.join("pakt").join(CATALOG_FILENAME)))
        .context("Could not determine the catalog location, use '--catalog'")?;
    let state = config
        .catalog
        .state
        .clone()
        .or_else(|| dirs::data_dir().map(|d| d.join("pakt").join(STATE_FILENAME)))
        .unwrap_or_else(|| catalog.with_file_name(STATE_FILENAME));
    debug!(catalog = %catalog.display(), state = %state.display(), "Opening package catalog.");
    CatalogEngine::load(&catalog, Some(&state))
        .with_context(|| format!("Failed to load the package catalog {}", catalog.display()))
}

// --- Signals ---

fn install_interrupt_handler(runtime: Arc<RuntimeState>) -> Result<()> {
    ctrlc::set_handler(move || match runtime.on_interrupt() {
        InterruptAction::ExitNow => {
            eprintln!();
            std::process::exit(i32::from(pakt_core::ExitCode::OnSignal.code()));
        }
        InterruptAction::Deferred => {
            warn!("Interrupt received, leaving after the current step.");
        }
    })
    .context("Failed to install the interrupt handler")
}

// --- Commands ---

fn install_options(args: &InstallArgs) -> InstallOptions {
    InstallOptions {
        kinds: args.selection.kinds.clone(),
        select_by_name: args.selection.name,
        select_by_cap: args.selection.capability,
        details: args.selection.details,
        from_repos: args.from.clone(),
        oldpackage: args.oldpackage,
        allow_unsigned: args.allow_unsigned_rpm,
        entire_catalog: args.entire_catalog.clone(),
        force: args.force,
        dry_run: args.selection.dry_run,
    }
}

fn remove_options(args: &RemoveArgs) -> RemoveOptions {
    RemoveOptions {
        kinds: args.selection.kinds.clone(),
        select_by_name: args.selection.name,
        select_by_cap: args.selection.capability,
        details: args.selection.details,
        dry_run: args.selection.dry_run,
    }
}

fn run(cli: &Cli, session: &mut Session) -> Result<pakt_core::ExitCode, PaktError> {
    let mut engine = match open_engine(&session.config) {
        Ok(engine) => engine,
        Err(e) => {
            error!("{:#}", e);
            session.out.error(&format!("{:#}", e), None);
            return Ok(pakt_core::ExitCode::ErrZypp);
        }
    };

    match &cli.command {
        Commands::Install(args) => commands::install(
            session,
            &mut engine,
            &install_options(args),
            &args.packages,
        ),
        Commands::Remove(args) => {
            commands::remove(session, &mut engine, &remove_options(args), &args.packages)
        }
        Commands::Repos => commands::repos(session, &engine),
    }
}

// --- Main Function ---

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (_guard, log_path) = match init_logging(cli.verbose) {
        Ok(logging) => logging,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::FAILURE;
        }
    };
    debug!(log = %log_path.display(), "Logging to file.");

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            eprintln!("{} {:#}", "Error:".red(), e);
            return ExitCode::from(pakt_core::ExitCode::ErrSyntax.code());
        }
    };

    if config.no_color {
        colored::control::set_override(false);
    }
    let mode = if config.machine_readable {
        OutputMode::Machine
    } else {
        OutputMode::Normal
    };
    let verbosity = if cli.quiet {
        Verbosity::Quiet
    } else {
        Verbosity::Normal
    };
    let out = Out::stdout(mode, verbosity, !config.no_color);

    let runtime = Arc::new(RuntimeState::new());
    if let Err(e) = install_interrupt_handler(Arc::clone(&runtime)) {
        warn!("{:#}", e);
    }

    let mut session = match Session::new(config, out.clone(), runtime) {
        Ok(session) => session,
        Err(e) => {
            error!("Failed to set up the session: {}", e);
            out.error(&e.to_string(), None);
            return ExitCode::from(e.exit_code().code());
        }
    };

    let code = match run(&cli, &mut session) {
        Ok(code) => code,
        Err(e) => {
            let code = e.exit_code();
            match &e {
                // already reported where it was raised
                PaktError::ExitRequest { reason, .. } => info!(code = %code, reason = %reason, "Exit requested."),
                _ => {
                    error!("Operation failed: {}", e);
                    out.error(&e.to_string(), None);
                }
            }
            code
        }
    };
    info!(code = %code, "Done.");
    ExitCode::from(code.code())
}
