use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use songplay_etl::Config;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "songplay", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the database (default: ~/.local/share/songplay/songplay.db)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
}

#[derive(Debug, clap::Subcommand)]
enum Commands {
    /// Load the song catalog, then the event logs (the default command)
    ///
    /// Every `*.json` file under the catalog tree is loaded into the `songs`
    /// and `artists` tables. Every `*.json` file under the event tree is then
    /// reduced to its NextSong rows, which populate `time`, `users` and
    /// `songplays`. Each play is matched against the catalog by exact title,
    /// artist name and duration; unmatched plays are kept with empty song and
    /// artist references.
    ///
    /// Each file is loaded in its own transaction. A file that fails is rolled
    /// back, reported, and skipped; the command exits nonzero if any file
    /// failed.
    Load {
        /// Root of the song catalog tree
        #[arg(long)]
        song_data: Option<PathBuf>,
        /// Root of the event log tree
        #[arg(long)]
        log_data: Option<PathBuf>,
    },
    /// Show row counts for every table
    Status,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Debug, clap::Subcommand)]
enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Print the config file path
    Path,
    /// Create the config file with defaults if it does not exist
    Init,
    /// Print an example config file
    Example,
}

fn init_logging(opts: twyg::Opts) -> Result<()> {
    twyg::setup(opts).map_err(|e| anyhow::anyhow!("Failed to set up logging: {e}"))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.db {
        Some(db) => Config::load_with_db_path(db)?,
        None => Config::load()?,
    };
    init_logging(config.logging.clone())?;

    // Ensure database directory exists
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create database directory {}", parent.display())
        })?;
    }

    match cli.command.unwrap_or(Commands::Load {
        song_data: None,
        log_data: None,
    }) {
        Commands::Load {
            song_data,
            log_data,
        } => {
            let song_root = song_data.unwrap_or_else(|| config.song_data_dir.clone());
            let log_root = log_data.unwrap_or_else(|| config.log_data_dir.clone());
            commands::run_load(&config, &song_root, &log_root)?;
        }
        Commands::Status => commands::show_status(&config.database_path)?,
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show_config(&config),
            ConfigAction::Path => commands::config::show_path(),
            ConfigAction::Init => commands::config::init_config()?,
            ConfigAction::Example => commands::config::show_example(),
        },
    }

    Ok(())
}
