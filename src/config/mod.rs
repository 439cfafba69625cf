pub mod toml_config;

#[cfg(feature = "cli")]
use clap::Parser;
#[cfg(feature = "cli")]
use std::path::PathBuf;

pub use toml_config::TomlConfig;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "rental-etl")]
#[command(about = "Cleans rental CSV extracts and loads them into SQLite")]
pub struct CliConfig {
    /// Path to TOML configuration file; built-in defaults are used when it does not exist
    #[arg(short, long, default_value = "rental-etl.toml")]
    pub config: PathBuf,

    /// Override the database path from the configuration
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Write every rejected record as JSON to this path
    #[arg(long)]
    pub rejections: Option<PathBuf>,

    /// Directory for a JSON application.log
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Read and validate the sources without touching the database
    #[arg(long)]
    pub dry_run: bool,

    #[arg(long, help = "Emit console logs as JSON")]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Loads the TOML file (or the defaults) and applies command-line overrides.
    pub fn resolve(&self) -> crate::utils::error::Result<TomlConfig> {
        let mut config = if self.config.exists() {
            TomlConfig::from_file(&self.config)?
        } else {
            tracing::warn!(
                "Config file {} not found, using built-in defaults",
                self.config.display()
            );
            TomlConfig::default()
        };

        if let Some(database) = &self.database {
            config.database.path = database.clone();
        }

        Ok(config)
    }
}
