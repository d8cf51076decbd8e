//! Logging system setup
//!
//! Structured logging through `tracing`. `RUST_LOG` takes precedence over the
//! `--debug` flag, which takes precedence over the configured level.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::{Args, LoggingSettings};

/// Initialize the global tracing subscriber.
///
/// Fails if a subscriber has already been installed.
pub fn setup_logging(args: &Args, settings: Option<&LoggingSettings>) -> Result<()> {
    let level = if args.debug {
        "debug"
    } else {
        settings.map(|s| s.level.as_str()).unwrap_or("info")
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let json_format = settings.is_some_and(|s| s.json_format);

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }

    Ok(())
}
