//! Game server entry point.

use anyhow::Result;
use clap::Parser;
use game_server::{
    config::{self, Args},
    load_catalog, logging, shutdown, GameServer, ServerConfig,
};
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let startup_start = Instant::now();

    let args = Args::parse();

    // Read the file before logging is up so its [logging] table applies
    let config = config::load_config(&args)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    if let Err(e) = logging::setup_logging(&args, config.logging.as_ref()) {
        eprintln!("Failed to initialize logging: {e}");
        return Err(anyhow::anyhow!("Failed to initialize logging: {}", e));
    }

    info!("Starting game server");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from: {}", args.config.display());

    let server_config = config::create_server_config(&config, &args)?;

    let pack_file = config::pack_file(&config, &args);
    let catalog_start = Instant::now();
    let catalog = load_catalog(&pack_file)?;
    info!(
        "Loaded {} pack(s) from {} in {:.2?}",
        catalog.packs().len(),
        pack_file.display(),
        catalog_start.elapsed()
    );

    log_server_configuration(&server_config);

    let server = GameServer::new(server_config, catalog);
    let shutdown_receiver = shutdown::setup_shutdown_handler();

    info!("Startup complete in {:.2?}", startup_start.elapsed());

    tokio::select! {
        result = server.start() => {
            match result {
                Ok(_) => info!("Server stopped normally"),
                Err(e) => {
                    error!("Server error: {}", e);
                    return Err(e.into());
                }
            }
        }
        _ = shutdown_receiver => {
            let shutdown_start = Instant::now();
            info!("Shutdown signal received");
            if let Err(e) = server.shutdown().await {
                error!("Error during shutdown: {}", e);
            }
            info!("Server shutdown completed in {:.2?}", shutdown_start.elapsed());
        }
    }

    Ok(())
}

fn log_server_configuration(config: &ServerConfig) {
    info!("Server configuration:");
    info!("  Listen address: {}", config.bind_address);
    info!("  Outbound queue: {} event(s)", config.connection.outbound_capacity);
    match config.connection.idle_timeout {
        Some(timeout) => info!("  Idle timeout: {:?}", timeout),
        None => info!("  Idle timeout: disabled"),
    }
    info!("  Sweep interval: {:?}", config.sweep_interval);
    info!(
        "  Eviction: lobby {:?}, running {:?}, empty {:?}",
        config.eviction.max_lobby_age,
        config.eviction.max_in_progress_age,
        config.eviction.empty_game_grace
    );
}
