use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, EnvFilter};

use crate::app::{App, SyncWorker};
use crate::config::ConfigLoader;
use crate::gateway::HttpGateway;

pub mod commands;

use self::commands::{AddArgs, DeleteArgs, EditArgs};

#[derive(Parser, Debug)]
#[command(
    name = "noteclient",
    version,
    about = "Terminal client for a REST notes collection"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTECLIENT_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Backend base address, e.g. http://localhost:3003
    #[arg(long)]
    pub base_url: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Print every note in the collection
    List,
    /// Create a note
    Add(AddArgs),
    /// Update the title and/or content of a note
    Edit(EditArgs),
    /// Delete a note
    Delete(DeleteArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var("NOTECLIENT_CONFIG", path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let command = cli.command.unwrap_or(Commands::Tui);
    let log_target = match command {
        Commands::Tui => LogTarget::File(loader.paths().log_file()),
        _ => LogTarget::Stderr,
    };
    init_tracing(&cli.log_level, &log_target)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    if let Some(base_url) = &cli.base_url {
        config.set_base_url(base_url)?;
    }
    let gateway = HttpGateway::new(&config.server)?;
    tracing::info!(collection = %gateway.collection_url(), "using notes backend");

    match command {
        Commands::Tui => {
            let worker = SyncWorker::spawn(gateway)?;
            let mut app = App::new(&config, worker)?;
            commands::run_tui(&mut app)
        }
        Commands::List => commands::list_notes(&config, &gateway),
        Commands::Add(args) => commands::add_note(&config, &gateway, args),
        Commands::Edit(args) => commands::edit_note(&config, &gateway, args),
        Commands::Delete(args) => commands::delete_note(&config, &gateway, args),
    }
}

enum LogTarget {
    Stderr,
    File(PathBuf),
}

fn init_tracing(level: &str, target: &LogTarget) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match target {
            LogTarget::Stderr => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
            LogTarget::File(path) => {
                let file = open_log_file(path)?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_timer(UtcTime::rfc_3339())
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))
}
