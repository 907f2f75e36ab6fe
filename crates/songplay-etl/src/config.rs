use anyhow::{Context, Result};
use confyg::{env, Confygery};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::load::CopyOptions;

/// Configuration for songplay.
///
/// Configuration is loaded from multiple sources with the following priority:
/// 1. CLI arguments (highest priority)
/// 2. Environment variables (SONGPLAY_* prefix)
/// 3. Config file (~/.config/songplay/config.toml)
/// 4. Built-in defaults (lowest priority)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the SQLite database.
    ///
    /// Can be set via:
    /// - CLI: --db /path/to/db
    /// - ENV: SONGPLAY_DATABASE_PATH
    /// - Config: database_path = "/path/to/db"
    /// - Default: ~/.local/share/songplay/songplay.db
    #[serde(default = "default_db_path")]
    pub database_path: PathBuf,

    /// Root of the song catalog tree.
    #[serde(default = "default_song_data_dir")]
    pub song_data_dir: PathBuf,

    /// Root of the event log tree.
    #[serde(default = "default_log_data_dir")]
    pub log_data_dir: PathBuf,

    /// Field delimiter for the bulk load buffer.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Load empty fields as NULL.
    #[serde(default = "default_true")]
    pub null_as_empty: bool,

    /// Extra attempts for a file whose transaction fails at the storage
    /// layer. Malformed files are never retried.
    #[serde(default)]
    pub retries: usize,

    /// Logger options, passed unchanged to twyg. An unknown level fails
    /// config loading.
    #[serde(default = "default_logging")]
    pub logging: twyg::Opts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_db_path(),
            song_data_dir: default_song_data_dir(),
            log_data_dir: default_log_data_dir(),
            delimiter: default_delimiter(),
            null_as_empty: true,
            retries: 0,
            logging: default_logging(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Searches for config file at: ~/.config/songplay/config.toml
    /// Reads environment variables with SONGPLAY_ prefix.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_path = config_file_path();

        let mut builder = Confygery::new().context("Failed to create config builder")?;

        if config_path.exists() {
            let path_str = config_path
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("Config path contains invalid UTF-8"))?;
            builder
                .add_file(path_str)
                .context("Failed to load config file")?;
        }

        let env_opts = env::Options::with_top_level("songplay");
        builder
            .add_env(env_opts)
            .context("Failed to load environment variables")?;

        let config: Self = builder.build().context("Failed to build configuration")?;

        Ok(config)
    }

    /// Load configuration with custom database path.
    ///
    /// This is used when the --db CLI flag is provided.
    pub fn load_with_db_path(db_path: PathBuf) -> Result<Self> {
        let mut config = Self::load()?;
        config.database_path = db_path;
        Ok(config)
    }

    /// The bulk load buffer format.
    ///
    /// # Errors
    ///
    /// Returns an error if the delimiter collides with the escape syntax.
    pub fn copy_options(&self) -> Result<CopyOptions> {
        let options = CopyOptions {
            delimiter: self.delimiter,
            null_as_empty: self.null_as_empty,
        };
        options
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid delimiter setting: {e}"))?;
        Ok(options)
    }
}

/// Returns: ~/.local/share/songplay/songplay.db (or platform equivalent)
fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("songplay")
        .join("songplay.db")
}

fn default_song_data_dir() -> PathBuf {
    PathBuf::from("data").join("song_data")
}

fn default_log_data_dir() -> PathBuf {
    PathBuf::from("data").join("log_data")
}

const fn default_delimiter() -> char {
    ','
}

const fn default_true() -> bool {
    true
}

fn default_logging() -> twyg::Opts {
    twyg::OptsBuilder::new()
        .coloured(true)
        .level(twyg::LogLevel::Info)
        .build()
        .unwrap_or_default()
}

/// Get the config file path.
///
/// Returns:
/// - Linux: ~/.config/songplay/config.toml
/// - macOS: ~/Library/Application Support/songplay/config.toml
/// - Windows: %APPDATA%\songplay\config.toml
pub fn config_file_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("songplay")
        .join("config.toml")
}

/// Get the example config file content.
pub fn example_config() -> &'static str {
    r#"# Songplay Configuration File
#
# Configuration is loaded from multiple sources with the following priority:
# 1. CLI arguments (highest priority)
# 2. Environment variables (SONGPLAY_* prefix)
# 3. This config file
# 4. Built-in defaults (lowest priority)

# Path to the SQLite database holding the star schema
#
# Can also be set via:
# - CLI: songplay --db /custom/path.db
# - Environment: SONGPLAY_DATABASE_PATH=/custom/path.db
#
# Default: Platform-specific data directory
#database_path = "/path/to/custom/songplay.db"

# Input trees of line-delimited JSON files.
# The catalog is always loaded before the event logs.
song_data_dir = "data/song_data"
log_data_dir = "data/log_data"

# Bulk load buffer format
delimiter = ","
null_as_empty = true

# Extra attempts for a file whose load fails at the storage layer
retries = 0

# Logger options. level is one of trace, debug, info, warn, error, fatal.
# Keys left out of this section take twyg's own defaults.
[logging]
level = "info"
coloured = true
"#
}

/// Create default config file if it doesn't exist.
///
/// Returns true if a new file was created, false if it already existed.
pub fn ensure_config_file() -> Result<bool> {
    let config_path = config_file_path();

    if config_path.exists() {
        return Ok(false);
    }

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create config directory")?;
    }

    std::fs::write(&config_path, example_config()).context("Failed to write config file")?;

    Ok(true)
}
