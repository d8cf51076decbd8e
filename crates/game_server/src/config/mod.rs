//! Configuration for the game server
//!
//! Handles command-line arguments, the TOML configuration file and the
//! resolved [`ServerConfig`] the server runs with.

pub mod args;
pub mod settings;

pub use args::Args;
pub use settings::{CardSettings, Config, LifecycleSettings, LoggingSettings, ServerSettings};

use crate::connection::ConnectionSettings;
use crate::error::ServerError;
use anyhow::Result;
use game_repo::EvictionPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};

/// Resolved runtime configuration of a [`GameServer`](crate::GameServer).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The socket address to bind the server to
    pub bind_address: SocketAddr,

    /// Per-connection queue size and idle timeout
    pub connection: ConnectionSettings,

    /// Time a fresh socket gets to upgrade and send its hello
    pub handshake_timeout: Duration,

    /// How often stale games are looked for
    pub sweep_interval: Duration,

    pub eviction: EvictionPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8080)),
            connection: ConnectionSettings::default(),
            handshake_timeout: Duration::from_secs(10),
            sweep_interval: Duration::from_secs(1),
            eviction: EvictionPolicy::default(),
        }
    }
}

/// Load configuration from file or create default configuration
///
/// If the file doesn't exist, a default configuration file is written and
/// the defaults are returned.
pub async fn load_config(args: &Args) -> Result<Config> {
    if args.config.exists() {
        let config_str = tokio::fs::read_to_string(&args.config).await?;
        match toml::de::from_str::<Config>(&config_str) {
            Ok(config) => Ok(config),
            Err(e) => {
                warn!("Failed to parse config file {}: {}", args.config.display(), e);
                Err(e.into())
            }
        }
    } else {
        warn!("Configuration file not found: {}, using defaults", args.config.display());

        let default_config = Config::default();
        let config_str = toml::to_string_pretty(&default_config)?;
        tokio::fs::write(&args.config, config_str).await?;
        info!("Created default configuration file: {}", args.config.display());

        Ok(default_config)
    }
}

/// Combines the file configuration with command-line overrides.
pub fn create_server_config(config: &Config, args: &Args) -> Result<ServerConfig, ServerError> {
    let bind_address = args
        .listen
        .as_deref()
        .unwrap_or(&config.server.listen_addr)
        .parse()
        .map_err(|e| ServerError::Config(format!("Failed to parse listen address: {e}")))?;

    if config.server.outbound_queue_capacity == 0 {
        return Err(ServerError::Config(
            "outbound_queue_capacity must be at least 1".to_string(),
        ));
    }
    if config.lifecycle.sweep_interval_secs == 0 {
        return Err(ServerError::Config(
            "sweep_interval_secs must be at least 1".to_string(),
        ));
    }

    let idle_timeout = match config.server.connection_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    Ok(ServerConfig {
        bind_address,
        connection: ConnectionSettings {
            outbound_capacity: config.server.outbound_queue_capacity,
            idle_timeout,
        },
        handshake_timeout: Duration::from_secs(config.server.handshake_timeout_secs.max(1)),
        sweep_interval: Duration::from_secs(config.lifecycle.sweep_interval_secs),
        eviction: EvictionPolicy {
            max_lobby_age: Duration::from_secs(config.lifecycle.max_lobby_age_secs),
            max_in_progress_age: Duration::from_secs(config.lifecycle.max_in_progress_age_secs),
            empty_game_grace: Duration::from_secs(config.lifecycle.empty_game_grace_secs),
        },
    })
}

/// The card pack file to load, preferring the command line.
pub fn pack_file(config: &Config, args: &Args) -> PathBuf {
    args.cards
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.cards.pack_file))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_load_config_default() {
        let temp_file = NamedTempFile::new().unwrap();
        let args = Args {
            config: temp_file.path().to_path_buf(),
            ..Default::default()
        };

        // Delete the file to test default creation
        drop(temp_file);

        let config = load_config(&args).await.unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:8080");
        assert!(args.config.exists());
        let _ = std::fs::remove_file(&args.config);
    }

    #[tokio::test]
    async fn test_load_config_existing() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
[server]
listen_addr = "0.0.0.0:9090"
outbound_queue_capacity = 16
connection_timeout_secs = 30
handshake_timeout_secs = 5

[lifecycle]
sweep_interval_secs = 2
max_lobby_age_secs = 600
max_in_progress_age_secs = 7200
empty_game_grace_secs = 5

[cards]
pack_file = "packs/base.json"

[logging]
level = "debug"
json_format = true
        "#;
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let args = Args {
            config: temp_file.path().to_path_buf(),
            ..Default::default()
        };

        let config = load_config(&args).await.unwrap();
        assert_eq!(config.server.listen_addr, "0.0.0.0:9090");
        assert_eq!(config.server.outbound_queue_capacity, 16);
        assert_eq!(config.cards.pack_file, "packs/base.json");
        assert!(config.logging.unwrap().json_format);
    }

    #[tokio::test]
    async fn test_load_config_rejects_garbage() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"[server\nlisten_addr = ").unwrap();
        let args = Args {
            config: temp_file.path().to_path_buf(),
            ..Default::default()
        };
        assert!(load_config(&args).await.is_err());
    }

    #[test]
    fn test_create_server_config() {
        let config = Config::default();
        let server_config = create_server_config(&config, &Args::default()).unwrap();

        assert_eq!(server_config.bind_address, SocketAddr::from(([127, 0, 0, 1], 8080)));
        assert_eq!(server_config.connection.outbound_capacity, 64);
        assert!(server_config.connection.idle_timeout.is_none());
        assert_eq!(server_config.eviction, EvictionPolicy::default());
    }

    #[test]
    fn test_create_server_config_with_overrides() {
        let mut config = Config::default();
        config.server.connection_timeout_secs = 45;
        let args = Args {
            listen: Some("0.0.0.0:9090".to_string()),
            cards: Some(PathBuf::from("other.json")),
            ..Default::default()
        };

        let server_config = create_server_config(&config, &args).unwrap();
        assert_eq!(server_config.bind_address.port(), 9090);
        assert_eq!(
            server_config.connection.idle_timeout,
            Some(Duration::from_secs(45))
        );
        assert_eq!(pack_file(&config, &args), PathBuf::from("other.json"));
        assert_eq!(pack_file(&config, &Args::default()), PathBuf::from("cards.json"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let args = Args {
            listen: Some("not an address".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            create_server_config(&Config::default(), &args),
            Err(ServerError::Config(_))
        ));

        let mut config = Config::default();
        config.server.outbound_queue_capacity = 0;
        assert!(create_server_config(&config, &Args::default()).is_err());
    }
}
