//! Command-line argument parsing

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the game server
///
/// Values given here override the configuration file.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    ///
    /// If the file doesn't exist, a default configuration will be created.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Server listen address, e.g. "0.0.0.0:3000"
    #[arg(short, long)]
    pub listen: Option<String>,

    /// Card pack file to load instead of the configured one
    #[arg(long)]
    pub cards: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.toml"),
            listen: None,
            cards: None,
            debug: false,
        }
    }
}
